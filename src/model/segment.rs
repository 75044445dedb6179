// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/model/segment.rs - 亮区分割：灰度、二值化、膨胀
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{GrayImage, ImageBuffer, Luma};

use crate::frame::BgrFrame;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

// 0.299 / 0.587 / 0.114 的 14 位定点系数，三者之和为 1 << 14
const GRAY_SHIFT: u32 = 14;
const GRAY_R: u32 = 4899;
const GRAY_G: u32 = 9617;
const GRAY_B: u32 = 1868;

/// 亮度加权灰度转换，14 位定点整数运算：
/// `Y = (R * 4899 + G * 9617 + B * 1868 + 8192) >> 14`
pub fn grayscale(frame: &BgrFrame) -> GrayImage {
  ImageBuffer::from_fn(frame.width(), frame.height(), |x, y| {
    let [b, g, r] = frame.pixel(x, y);
    let luma = (r as u32 * GRAY_R + g as u32 * GRAY_G + b as u32 * GRAY_B
      + (1 << (GRAY_SHIFT - 1)))
      >> GRAY_SHIFT;
    Luma([luma.min(255) as u8])
  })
}

/// 固定阈值二值化：严格大于 `threshold` 的像素为前景
pub fn threshold_binary(gray: &GrayImage, threshold: u8) -> GrayImage {
  ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
    if gray.get_pixel(x, y)[0] > threshold {
      Luma([FOREGROUND])
    } else {
      Luma([BACKGROUND])
    }
  })
}

/// 以 `size`×`size` 全 1 结构元素膨胀。
///
/// 锚点位于 (size / 2, size / 2)，偶数尺寸时窗口覆盖偏移
/// `-size/2 ..= size - 1 - size/2`；图像外的像素不参与取最大值。
/// 方形结构元素可分离，先按行再按列各做一次一维最大值滤波。
#[must_use = "returns a new dilated image"]
pub fn dilate_square(mask: &GrayImage, size: u32) -> GrayImage {
  if size <= 1 {
    return mask.clone();
  }

  let (width, height) = mask.dimensions();
  let before = (size / 2) as i64;
  let after = (size - 1) as i64 - before;

  let rows = ImageBuffer::from_fn(width, height, |x, y| {
    let lo = (x as i64 - before).max(0) as u32;
    let hi = (x as i64 + after).min(width as i64 - 1) as u32;
    let max = (lo..=hi).map(|sx| mask.get_pixel(sx, y)[0]).max();
    Luma([max.unwrap_or(BACKGROUND)])
  });

  ImageBuffer::from_fn(width, height, |x, y| {
    let lo = (y as i64 - before).max(0) as u32;
    let hi = (y as i64 + after).min(height as i64 - 1) as u32;
    let max = (lo..=hi).map(|sy| rows.get_pixel(x, sy)[0]).max();
    Luma([max.unwrap_or(BACKGROUND)])
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn grayscale_uses_luminance_weights() {
    let mut frame = BgrFrame::with_shape(3, 1).unwrap();
    frame.put_pixel(0, 0, [0, 0, 255]); // 红
    frame.put_pixel(1, 0, [0, 255, 0]); // 绿
    frame.put_pixel(2, 0, [255, 0, 0]); // 蓝

    let gray = grayscale(&frame);
    assert_eq!(gray.get_pixel(0, 0)[0], 76);
    assert_eq!(gray.get_pixel(1, 0)[0], 150);
    assert_eq!(gray.get_pixel(2, 0)[0], 29);
  }

  #[test]
  fn grayscale_is_fixed_point() {
    let mut frame = BgrFrame::with_shape(3, 1).unwrap();
    // 浮点加权并四舍五入会得到 181
    frame.put_pixel(0, 0, [244, 254, 12]);
    frame.put_pixel(1, 0, [255, 255, 255]);
    frame.put_pixel(2, 0, [1, 1, 1]);

    let gray = grayscale(&frame);
    assert_eq!(gray.get_pixel(0, 0)[0], 180);
    assert_eq!(gray.get_pixel(1, 0)[0], 255);
    assert_eq!(gray.get_pixel(2, 0)[0], 1);
  }

  #[test]
  fn threshold_is_exclusive() {
    let gray = GrayImage::from_raw(4, 1, vec![179, 180, 181, 255]).unwrap();
    let binary = threshold_binary(&gray, 180);
    assert_eq!(binary.as_raw(), &vec![0, 0, 255, 255]);
  }

  #[test]
  fn dilate_uses_centered_anchor() {
    let mut mask = GrayImage::new(20, 20);
    mask.put_pixel(10, 10, Luma([FOREGROUND]));

    let dilated = dilate_square(&mask, 10);

    // 偏移 -5..=4，单点向左上扩展 4，向右下扩展 5
    assert_eq!(dilated.get_pixel(6, 6)[0], FOREGROUND);
    assert_eq!(dilated.get_pixel(15, 15)[0], FOREGROUND);
    assert_eq!(dilated.get_pixel(5, 10)[0], BACKGROUND);
    assert_eq!(dilated.get_pixel(16, 10)[0], BACKGROUND);
    assert_eq!(dilated.pixels().filter(|p| p[0] == FOREGROUND).count(), 100);
  }

  #[test]
  fn dilate_keeps_empty_mask_empty() {
    let mask = GrayImage::new(8, 8);
    let dilated = dilate_square(&mask, 10);
    assert!(dilated.pixels().all(|p| p[0] == BACKGROUND));
  }
}
