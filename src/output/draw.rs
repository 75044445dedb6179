// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/output/draw.rs - 检测框可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::borrow::Cow;
use std::path::Path;

use image::RgbImage;
use serde_json::json;

use crate::{
  frame::{BgrFrame, ToRgbImage},
  model::{BoundingBox, DetectionResult},
};

const BOX_THICKNESS: u32 = 2;
const BOX_COLOR_BGR: [u8; 3] = [255, 0, 0]; // 蓝色

pub struct Draw {
  thickness: u32,
  color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      thickness: BOX_THICKNESS,
      color: BOX_COLOR_BGR,
    }
  }
}

impl Draw {
  pub fn with_thickness(mut self, thickness: u32) -> Self {
    self.thickness = thickness;
    self
  }

  /// 在帧的副本上绘制边框，原帧保持不变
  pub fn annotate(&self, frame: &BgrFrame, bbox: &BoundingBox) -> BgrFrame {
    let mut annotated = frame.clone();
    self.draw_bbox(&mut annotated, bbox);
    annotated
  }

  // 边框线经过 (x, y) 与 (x + width, y + height)，线宽以线为中心向两侧展开，
  // 偶数线宽时多出的一像素落在坐标较小的一侧；超出图像的部分忽略
  fn draw_bbox(&self, frame: &mut BgrFrame, bbox: &BoundingBox) {
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    let thickness = self.thickness as i64;
    if thickness == 0 {
      return;
    }

    let x_min = bbox.x as i64;
    let y_min = bbox.y as i64;
    let x_max = x_min + bbox.width as i64;
    let y_max = y_min + bbox.height as i64;
    let before = thickness / 2;
    let after = thickness - 1 - before;

    let mut plot = |x: i64, y: i64| {
      if (0..w).contains(&x) && (0..h).contains(&y) {
        frame.put_pixel(x as u32, y as u32, self.color);
      }
    };

    for d in -before..=after {
      // Top and bottom edges
      for x in (x_min - before)..=(x_max + after) {
        plot(x, y_min + d);
        plot(x, y_max + d);
      }

      // Left and right edges
      for y in (y_min - before)..=(y_max + after) {
        plot(x_min + d, y);
        plot(x_max + d, y);
      }
    }
  }
}

/// 检测结果的文本记录
pub struct Record;

impl Record {
  pub fn to_json(result: &DetectionResult) -> serde_json::Value {
    json!({
      "detection_status": result.status.as_str(),
      "glaucoma_risk": result.risk_label.as_str(),
      "confidence": result.confidence,
      "cup_to_disc_ratio": result.cup_to_disc_ratio,
      "bbox": result.bounding_box.map(|b| [b.x, b.y, b.width, b.height]),
    })
  }

  pub fn record(result: &DetectionResult, path: &Path) -> Result<(), std::io::Error> {
    let text = serde_json::to_string_pretty(&Self::to_json(result))?;
    std::fs::write(path.with_extension("json"), text)?;
    Ok(())
  }
}

/// 取结果中的标注图像，缺失时回退到原帧
pub fn annotated_or<'a>(result: &'a DetectionResult, fallback: &BgrFrame) -> Cow<'a, RgbImage> {
  match &result.annotated_image {
    Some(image) => Cow::Borrowed(image),
    None => Cow::Owned(fallback.to_rgb_image()),
  }
}
