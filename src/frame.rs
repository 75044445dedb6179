// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/frame.rs - BGR 帧定义
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

use image::{ImageBuffer, Rgb, RgbImage};
use thiserror::Error;

const BGR_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("图像尺寸为空: {width}x{height}")]
  Empty { width: u32, height: u32 },
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 内部处理使用的帧，HWC 排布，通道顺序为 B, G, R。
///
/// 显示侧使用 [`RgbImage`]，两者之间只能通过显式转换互通。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrFrame {
  width: u32,
  height: u32,
  data: Box<[u8]>,
}

impl BgrFrame {
  pub fn with_shape(width: u32, height: u32) -> Result<Self, FrameError> {
    if width == 0 || height == 0 {
      return Err(FrameError::Empty { width, height });
    }
    let size = BGR_CHANNELS * (width as usize) * (height as usize);
    Ok(Self {
      width,
      height,
      data: vec![0u8; size].into_boxed_slice(),
    })
  }

  /// 由原始 BGR 字节构造帧，长度必须与尺寸一致
  pub fn try_from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
    if width == 0 || height == 0 {
      return Err(FrameError::Empty { width, height });
    }
    let expected = BGR_CHANNELS * (width as usize) * (height as usize);
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> usize {
    BGR_CHANNELS
  }

  fn index(&self, x: u32, y: u32) -> usize {
    ((y as usize) * (self.width as usize) + (x as usize)) * BGR_CHANNELS
  }

  /// 读取 (x, y) 处的 [b, g, r]
  pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
    let idx = self.index(x, y);
    [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
  }

  pub fn put_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3]) {
    let idx = self.index(x, y);
    self.data[idx..idx + BGR_CHANNELS].copy_from_slice(&bgr);
  }

  pub fn as_bgr(&self) -> &[u8] {
    &self.data
  }
}

impl AsMut<[u8]> for BgrFrame {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

pub trait ToRgbImage {
  fn to_rgb_image(&self) -> RgbImage;
}

impl ToRgbImage for BgrFrame {
  fn to_rgb_image(&self) -> RgbImage {
    // BGR -> RGB
    ImageBuffer::from_fn(self.width, self.height, |x, y| {
      let [b, g, r] = self.pixel(x, y);
      Rgb([r, g, b])
    })
  }
}

impl TryFrom<&RgbImage> for BgrFrame {
  type Error = FrameError;

  fn try_from(image: &RgbImage) -> Result<Self, Self::Error> {
    let (width, height) = image.dimensions();
    let mut frame = BgrFrame::with_shape(width, height)?;

    let slice = frame.as_mut();
    for (dst, src) in slice.chunks_exact_mut(BGR_CHANNELS).zip(image.pixels()) {
      let Rgb([r, g, b]) = *src;
      dst.copy_from_slice(&[b, g, r]);
    }
    Ok(frame)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rgb_round_trip_swaps_channels() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([10, 20, 30]));
    image.put_pixel(1, 0, Rgb([200, 0, 5]));

    let frame = BgrFrame::try_from(&image).unwrap();
    assert_eq!(frame.pixel(0, 0), [30, 20, 10]);
    assert_eq!(frame.pixel(1, 0), [5, 0, 200]);
    assert_eq!(frame.to_rgb_image(), image);
  }

  #[test]
  fn empty_image_is_rejected() {
    let image = RgbImage::new(0, 4);
    assert_eq!(
      BgrFrame::try_from(&image),
      Err(FrameError::Empty {
        width: 0,
        height: 4
      })
    );
  }

  #[test]
  fn raw_length_must_match_shape() {
    let err = BgrFrame::try_from_raw(2, 2, vec![0; 11]).unwrap_err();
    assert_eq!(
      err,
      FrameError::LengthMismatch {
        expected: 12,
        actual: 11
      }
    );
    assert!(BgrFrame::try_from_raw(2, 2, vec![0; 12]).is_ok());
  }
}
