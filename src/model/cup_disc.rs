// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/model/cup_disc.rs - 视杯区域检测与杯盘比估计
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{BgrFrame, ToRgbImage},
  model::{
    Model,
    contour::{self, BoundingBox},
    risk::{self, RiskLabel},
    segment,
  },
  output::draw::Draw,
};

const CUP_DISC_THRESHOLD: u8 = 180;
const CUP_DISC_KERNEL_SIZE: u32 = 10;
const CUP_DISC_PADDING: u32 = 100;
const CUP_DISC_OUTLINE_THICKNESS: u32 = 2;

#[derive(Error, Debug)]
pub enum CupDiscError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch { expected: String, actual: String },
  #[error("参数 {key} 取值无效: {value}")]
  InvalidParameter { key: String, value: String },
}

/// 分割与几何阶段的固定常数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CupDiscParams {
  pub threshold: u8,
  pub kernel_size: u32,
  pub padding: u32,
  pub outline_thickness: u32,
}

impl Default for CupDiscParams {
  fn default() -> Self {
    Self {
      threshold: CUP_DISC_THRESHOLD,
      kernel_size: CUP_DISC_KERNEL_SIZE,
      padding: CUP_DISC_PADDING,
      outline_thickness: CUP_DISC_OUTLINE_THICKNESS,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStatus {
  NoRegionDetected,
  RegionDetected,
}

impl DetectionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      DetectionStatus::NoRegionDetected => "No optic cup detected",
      DetectionStatus::RegionDetected => "Optic cup detected",
    }
  }
}

/// 单次检测的结果，每次调用重新构造
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
  pub status: DetectionStatus,
  pub risk_label: RiskLabel,
  /// 0.0 ~ 99.0
  pub confidence: f64,
  /// 0.0 ~ 1.0，未检出时为 None；不做舍入
  pub cup_to_disc_ratio: Option<f64>,
  /// 填充并裁剪后的框
  pub bounding_box: Option<BoundingBox>,
  /// 显示通道顺序（RGB）
  pub annotated_image: Option<RgbImage>,
}

impl DetectionResult {
  /// 未检出或处理失败时的统一结果
  pub fn unknown(image: Option<RgbImage>) -> Self {
    Self {
      status: DetectionStatus::NoRegionDetected,
      risk_label: RiskLabel::Unknown,
      confidence: 0.0,
      cup_to_disc_ratio: None,
      bounding_box: None,
      annotated_image: image,
    }
  }

  pub fn is_detected(&self) -> bool {
    self.status == DetectionStatus::RegionDetected
  }
}

pub struct CupDiscBuilder {
  params: CupDiscParams,
}

impl Default for CupDiscBuilder {
  fn default() -> Self {
    Self {
      params: CupDiscParams::default(),
    }
  }
}

impl FromUrlWithScheme for CupDiscBuilder {
  const SCHEME: &'static str = "cupdisc";
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CupDiscError> {
  value.parse().map_err(|_| CupDiscError::InvalidParameter {
    key: key.to_string(),
    value: value.to_string(),
  })
}

impl FromUrl for CupDiscBuilder {
  type Error = CupDiscError;

  /// `cupdisc://default?threshold=180&kernel=10&padding=100&thickness=2`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(CupDiscError::SchemeMismatch {
        expected: Self::SCHEME.to_string(),
        actual: url.scheme().to_string(),
      });
    }

    let mut builder = CupDiscBuilder::default();
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "threshold" => builder = builder.threshold(parse_param(&key, &value)?),
        "kernel" => builder = builder.kernel_size(parse_param(&key, &value)?),
        "padding" => builder = builder.padding(parse_param(&key, &value)?),
        "thickness" => builder = builder.outline_thickness(parse_param(&key, &value)?),
        _ => debug!("忽略未知参数: {}={}", key, value),
      }
    }
    Ok(builder)
  }
}

impl CupDiscBuilder {
  pub fn threshold(mut self, threshold: u8) -> Self {
    self.params.threshold = threshold;
    self
  }

  pub fn kernel_size(mut self, kernel_size: u32) -> Self {
    self.params.kernel_size = kernel_size;
    self
  }

  pub fn padding(mut self, padding: u32) -> Self {
    self.params.padding = padding;
    self
  }

  pub fn outline_thickness(mut self, thickness: u32) -> Self {
    self.params.outline_thickness = thickness;
    self
  }

  pub fn build(self) -> CupDiscModel {
    debug!("杯盘比模型参数: {:?}", self.params);
    CupDiscModel {
      draw: Draw::default().with_thickness(self.params.outline_thickness),
      params: self.params,
    }
  }
}

/// 阈值分割 + 最大外轮廓 + 填充框的杯盘比估计
pub struct CupDiscModel {
  params: CupDiscParams,
  draw: Draw,
}

impl Default for CupDiscModel {
  fn default() -> Self {
    CupDiscBuilder::default().build()
  }
}

impl CupDiscModel {
  pub fn params(&self) -> &CupDiscParams {
    &self.params
  }

  /// 在内部 BGR 帧上运行检测，不修改输入帧
  pub fn detect(&self, frame: &BgrFrame) -> DetectionResult {
    let (width, height) = (frame.width(), frame.height());

    let gray = segment::grayscale(frame);
    let binary = segment::threshold_binary(&gray, self.params.threshold);
    let mask = segment::dilate_square(&binary, self.params.kernel_size);

    let contours = contour::external_contours(&mask);
    debug!("找到 {} 个外轮廓", contours.len());

    let Some((largest, cup_area)) = contour::largest_contour(&contours) else {
      info!("未检测到视杯区域");
      return DetectionResult::unknown(Some(frame.to_rgb_image()));
    };

    let bbox = largest.bounding_box();
    let padded = {
      let padded = bbox.pad_clamped(self.params.padding, width, height);
      // 填充框不小于轮廓自身的框
      BoundingBox {
        width: padded.width.max(bbox.width),
        height: padded.height.max(bbox.height),
        ..padded
      }
    };
    debug!("轮廓框: {:?}, 填充后: {:?}", bbox, padded);

    let annotated = self.draw.annotate(frame, &padded);

    let disc_area = padded.area().max(1) as f64;
    let ratio = (cup_area / disc_area).min(1.0);
    let (risk_label, confidence) = risk::classify(ratio);

    info!(
      "检测到视杯区域: 杯面积 {:.1}, 盘面积 {:.0}, 杯盘比 {:.4}, 风险 {}, 置信度 {:.2}",
      cup_area, disc_area, ratio, risk_label, confidence
    );

    DetectionResult {
      status: DetectionStatus::RegionDetected,
      risk_label,
      confidence,
      cup_to_disc_ratio: Some(ratio),
      bounding_box: Some(padded),
      annotated_image: Some(annotated.to_rgb_image()),
    }
  }
}

impl Model for CupDiscModel {
  type Input = BgrFrame;
  type Output = DetectionResult;
  type Error = Infallible;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(self.detect(input))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;
  use imageproc::drawing::draw_filled_rect_mut;
  use imageproc::rect::Rect;

  fn detect(image: &RgbImage) -> DetectionResult {
    let frame = BgrFrame::try_from(image).unwrap();
    CupDiscModel::default().detect(&frame)
  }

  #[test]
  fn defaults_match_fixed_constants() {
    let params = CupDiscParams::default();
    assert_eq!(params.threshold, 180);
    assert_eq!(params.kernel_size, 10);
    assert_eq!(params.padding, 100);
    assert_eq!(params.outline_thickness, 2);
  }

  #[test]
  fn builder_from_url_reads_query() {
    let url = Url::parse("cupdisc://default?threshold=200&padding=50").unwrap();
    let model = CupDiscBuilder::from_url(&url).unwrap().build();
    assert_eq!(model.params().threshold, 200);
    assert_eq!(model.params().padding, 50);
    assert_eq!(model.params().kernel_size, 10);
  }

  #[test]
  fn builder_rejects_bad_scheme_and_values() {
    let url = Url::parse("yolo://default").unwrap();
    assert!(matches!(
      CupDiscBuilder::from_url(&url),
      Err(CupDiscError::SchemeMismatch { .. })
    ));

    let url = Url::parse("cupdisc://default?threshold=999").unwrap();
    assert!(matches!(
      CupDiscBuilder::from_url(&url),
      Err(CupDiscError::InvalidParameter { .. })
    ));
  }

  #[test]
  fn black_image_has_no_region() {
    let image = RgbImage::new(64, 48);
    let result = detect(&image);
    assert_eq!(result, DetectionResult::unknown(Some(image)));
  }

  #[test]
  fn dim_pixels_stay_below_threshold() {
    let image = RgbImage::from_pixel(32, 32, Rgb([180, 180, 180]));
    let result = detect(&image);
    assert!(!result.is_detected());
  }

  #[test]
  fn gray_exactly_at_threshold_is_background() {
    let mut image = RgbImage::new(100, 100);
    draw_filled_rect_mut(&mut image, Rect::at(40, 40).of_size(20, 20), Rgb([12, 254, 244]));
    let result = detect(&image);
    assert_eq!(result, DetectionResult::unknown(Some(image)));
  }

  #[test]
  fn region_on_left_edge_is_detected() {
    let mut image = RgbImage::new(200, 100);
    draw_filled_rect_mut(&mut image, Rect::at(0, 0).of_size(100, 100), Rgb([255, 255, 255]));
    let result = detect(&image);

    assert!(result.is_detected());
    // 膨胀后白色区域为 x 0..=104，填充后覆盖整幅图像
    assert_eq!(
      result.bounding_box,
      Some(BoundingBox {
        x: 0,
        y: 0,
        width: 200,
        height: 100
      })
    );
    // 104 * 99 / (200 * 100)
    let ratio = result.cup_to_disc_ratio.unwrap();
    assert!((ratio - 0.5148).abs() < 1e-9);
    assert_eq!(result.risk_label, RiskLabel::Moderate);
  }

  #[test]
  fn model_infer_matches_detect() {
    let image = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
    let frame = BgrFrame::try_from(&image).unwrap();
    let model = CupDiscModel::default();
    assert_eq!(model.infer(&frame), Ok(model.detect(&frame)));
  }

  #[test]
  fn full_white_image_is_high_risk() {
    let image = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
    let result = detect(&image);

    assert!(result.is_detected());
    assert_eq!(
      result.bounding_box,
      Some(BoundingBox {
        x: 0,
        y: 0,
        width: 50,
        height: 50
      })
    );
    // 49 * 49 / (50 * 50)
    let ratio = result.cup_to_disc_ratio.unwrap();
    assert!((ratio - 0.9604).abs() < 1e-9);
    assert_eq!(result.risk_label, RiskLabel::High);
    assert!((result.confidence - 98.02).abs() < 1e-6);
  }

  #[test]
  fn annotated_copy_is_display_ordered() {
    let mut image = RgbImage::new(300, 300);
    draw_filled_rect_mut(&mut image, Rect::at(140, 140).of_size(20, 20), Rgb([255, 255, 255]));
    let result = detect(&image);

    let bbox = result.bounding_box.unwrap();
    let annotated = result.annotated_image.unwrap();
    // 内部 BGR 蓝色边框，显示为 RGB 的 (0, 0, 255)
    assert_eq!(annotated.get_pixel(bbox.x, bbox.y), &Rgb([0, 0, 255]));
    // 输入不受影响
    assert_eq!(image.get_pixel(bbox.x, bbox.y), &Rgb([0, 0, 0]));
  }
}
