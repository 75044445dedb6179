// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/model/contour.rs - 外轮廓提取与几何量
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

use image::{GrayImage, imageops};
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;

/// 轴对齐包围框，像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl BoundingBox {
  pub fn area(&self) -> u64 {
    self.width as u64 * self.height as u64
  }

  /// 四周各扩展 `padding` 像素，并裁剪到 `image_width`×`image_height` 内。
  ///
  /// 调用方保证 `self` 本身位于图像内，因此结果不会小于原框。
  pub fn pad_clamped(&self, padding: u32, image_width: u32, image_height: u32) -> BoundingBox {
    let x = self.x.saturating_sub(padding);
    let y = self.y.saturating_sub(padding);
    let width = self
      .width
      .saturating_add(padding.saturating_mul(2))
      .min(image_width.saturating_sub(x));
    let height = self
      .height
      .saturating_add(padding.saturating_mul(2))
      .min(image_height.saturating_sub(y));

    BoundingBox {
      x,
      y,
      width,
      height,
    }
  }

  pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
    self.x as u64 + self.width as u64 <= image_width as u64
      && self.y as u64 + self.height as u64 <= image_height as u64
  }
}

/// 二值图中一个连通前景区域的外边界，至少含一个点
#[derive(Debug, Clone)]
pub struct OuterContour {
  points: Vec<Point<i32>>,
  bounding_box: BoundingBox,
}

impl OuterContour {
  fn from_points(points: Vec<Point<i32>>) -> Option<Self> {
    let first = *points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
      min_x = min_x.min(p.x);
      min_y = min_y.min(p.y);
      max_x = max_x.max(p.x);
      max_y = max_y.max(p.y);
    }

    let bounding_box = BoundingBox {
      x: min_x.max(0) as u32,
      y: min_y.max(0) as u32,
      width: (max_x - min_x + 1) as u32,
      height: (max_y - min_y + 1) as u32,
    };
    Some(Self {
      points,
      bounding_box,
    })
  }

  pub fn points(&self) -> &[Point<i32>] {
    &self.points
  }

  /// 以边界像素中心为顶点的多边形面积（鞋带公式）
  pub fn area(&self) -> f64 {
    let n = self.points.len();
    if n < 3 {
      return 0.0;
    }
    let mut twice = 0i64;
    for i in 0..n {
      let p1 = self.points[i];
      let p2 = self.points[(i + 1) % n];
      twice += p1.x as i64 * p2.y as i64 - p2.x as i64 * p1.y as i64;
    }
    (twice as f64 * 0.5).abs()
  }

  /// 包住全部边界像素的最小框
  pub fn bounding_box(&self) -> BoundingBox {
    self.bounding_box
  }
}

/// 只保留最外层的外边界（不含孔洞及孔洞内的嵌套区域），按光栅扫描顺序排列。
///
/// `find_contours` 不会从第 0 列起始的区域开始追踪，这里先在四周补一圈背景，
/// 追踪完再把坐标移回原图。
pub fn external_contours(mask: &GrayImage) -> Vec<OuterContour> {
  let (width, height) = mask.dimensions();
  let mut bordered = GrayImage::new(width + 2, height + 2);
  imageops::replace(&mut bordered, mask, 1, 1);

  find_contours::<i32>(&bordered)
    .into_iter()
    .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    .filter_map(|c| {
      let points = c
        .points
        .into_iter()
        .map(|p| Point::new(p.x - 1, p.y - 1))
        .collect();
      OuterContour::from_points(points)
    })
    .collect()
}

/// 面积最大的轮廓；面积相同时保留先遇到的
pub fn largest_contour(contours: &[OuterContour]) -> Option<(&OuterContour, f64)> {
  let mut best: Option<(&OuterContour, f64)> = None;
  for contour in contours {
    let area = contour.area();
    match best {
      Some((_, best_area)) if area <= best_area => {}
      _ => best = Some((contour, area)),
    }
  }
  best
}
