// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/detector.rs - 视杯 ROI 检测器
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

//! 有状态的检测器：载入一张图像，处理，取回标注图像。
//!
//! 每个请求（每张图像）使用独立的实例，实例之间不共享状态。
//! 所有失败都在此处转为返回值：载入失败返回 `false`，
//! 处理失败返回与“未检出”相同形状的结果。

use std::fmt::Display;
use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
  frame::{BgrFrame, FrameError, ToRgbImage},
  input::{decode_bytes, decode_path},
  model::{CupDiscModel, DetectionResult, Model},
};

#[derive(Error, Debug)]
pub enum LoadError {
  #[error("图像解码错误: {0}")]
  DecodeError(#[from] image::ImageError),
  #[error("图像无效: {0}")]
  InvalidImage(#[from] FrameError),
}

/// 待载入的图像
pub enum ImageSource {
  /// 已解码的图像，通道顺序为显示顺序
  Decoded(DynamicImage),
  Path(PathBuf),
  /// 上传的编码字节（PNG、JPEG 等）
  Bytes(Vec<u8>),
}

impl From<DynamicImage> for ImageSource {
  fn from(image: DynamicImage) -> Self {
    ImageSource::Decoded(image)
  }
}

impl From<RgbImage> for ImageSource {
  fn from(image: RgbImage) -> Self {
    ImageSource::Decoded(DynamicImage::ImageRgb8(image))
  }
}

impl From<PathBuf> for ImageSource {
  fn from(path: PathBuf) -> Self {
    ImageSource::Path(path)
  }
}

impl From<&Path> for ImageSource {
  fn from(path: &Path) -> Self {
    ImageSource::Path(path.to_path_buf())
  }
}

impl From<Vec<u8>> for ImageSource {
  fn from(bytes: Vec<u8>) -> Self {
    ImageSource::Bytes(bytes)
  }
}

impl ImageSource {
  /// 解码为显示顺序的 RGB 图像
  pub fn decode(self) -> Result<RgbImage, LoadError> {
    let image = match self {
      ImageSource::Decoded(image) => image.to_rgb8(),
      ImageSource::Path(path) => decode_path(path)?,
      ImageSource::Bytes(bytes) => decode_bytes(&bytes)?,
    };
    Ok(image)
  }
}

/// 检测器，`M` 为在 BGR 帧上运行的检测模型，默认是 [`CupDiscModel`]
pub struct RoiDetector<M = CupDiscModel> {
  model: M,
  image: Option<BgrFrame>,
  annotated: Option<RgbImage>,
}

impl Default for RoiDetector {
  fn default() -> Self {
    Self::with_model(CupDiscModel::default())
  }
}

impl RoiDetector {
  pub fn new() -> Self {
    Self::default()
  }
}

impl<M> RoiDetector<M>
where
  M: Model<Input = BgrFrame, Output = DetectionResult>,
  M::Error: Display,
{
  pub fn with_model(model: M) -> Self {
    Self {
      model,
      image: None,
      annotated: None,
    }
  }

  /// 载入图像并转换为内部 BGR 帧，替换之前载入的图像。
  ///
  /// 失败时清空已载入的图像，随后的 [`RoiDetector::process`] 返回 `None`。
  pub fn try_load(&mut self, source: impl Into<ImageSource>) -> Result<(), LoadError> {
    self.image = None;
    self.annotated = None;

    let rgb = source.into().decode()?;
    let frame = BgrFrame::try_from(&rgb)?;
    debug!("图像载入成功: {}x{}", frame.width(), frame.height());
    self.image = Some(frame);
    Ok(())
  }

  pub fn load(&mut self, source: impl Into<ImageSource>) -> bool {
    match self.try_load(source) {
      Ok(()) => true,
      Err(e) => {
        warn!("图像载入失败: {}", e);
        false
      }
    }
  }

  pub fn is_loaded(&self) -> bool {
    self.image.is_some()
  }

  /// 与 [`RoiDetector::process`] 相同，但保留内部错误
  pub fn try_process(&mut self) -> Option<Result<DetectionResult, M::Error>> {
    let frame = self.image.as_ref()?;
    let result = self.model.infer(frame);
    if let Ok(result) = &result
      && result.is_detected()
    {
      self.annotated = result.annotated_image.clone();
    }
    Some(result)
  }

  /// 处理已载入的图像；未载入时返回 `None`
  pub fn process(&mut self) -> Option<DetectionResult> {
    match self.try_process()? {
      Ok(result) => Some(result),
      Err(e) => {
        error!("视杯检测失败: {}", e);
        let original = self.image.as_ref().map(|f| f.to_rgb_image());
        Some(DetectionResult::unknown(original))
      }
    }
  }

  /// 最近一次检出时生成的标注图像（RGB）
  pub fn get_annotated_image(&self) -> Option<RgbImage> {
    self.annotated.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageFormat, Rgb};
  use imageproc::drawing::draw_filled_circle_mut;
  use std::io::Cursor;

  /// 总是失败的模型
  struct Broken;

  impl Model for Broken {
    type Input = BgrFrame;
    type Output = DetectionResult;
    type Error = String;

    fn infer(&self, _input: &BgrFrame) -> Result<DetectionResult, String> {
      Err("模型内部错误".to_string())
    }
  }

  fn disk_image() -> RgbImage {
    let mut image = RgbImage::new(200, 200);
    draw_filled_circle_mut(&mut image, (100, 100), 20, Rgb([250, 250, 250]));
    image
  }

  fn encode_png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
  }

  #[test]
  fn process_without_load_is_noop() {
    let mut detector = RoiDetector::new();
    assert!(detector.process().is_none());
    assert!(detector.get_annotated_image().is_none());
  }

  #[test]
  fn empty_bytes_are_rejected() {
    let mut detector = RoiDetector::new();
    assert!(!detector.load(Vec::<u8>::new()));
    assert!(!detector.is_loaded());
    assert!(detector.process().is_none());
  }

  #[test]
  fn garbage_bytes_are_rejected() {
    let mut detector = RoiDetector::new();
    assert!(!detector.load(b"not an image at all".to_vec()));
    assert!(detector.process().is_none());
  }

  #[test]
  fn missing_file_is_rejected() {
    let mut detector = RoiDetector::new();
    assert!(!detector.load(Path::new("/nonexistent/fundus.png")));
  }

  #[test]
  fn zero_sized_image_is_rejected() {
    let mut detector = RoiDetector::new();
    assert!(!detector.load(RgbImage::new(0, 0)));
  }

  #[test]
  fn encoded_upload_is_decoded() {
    let mut detector = RoiDetector::new();
    assert!(detector.load(encode_png(&disk_image())));
    let result = detector.process().unwrap();
    assert!(result.is_detected());
  }

  #[test]
  fn failed_load_discards_previous_image() {
    let mut detector = RoiDetector::new();
    assert!(detector.load(disk_image()));
    assert!(detector.process().is_some());
    assert!(detector.get_annotated_image().is_some());

    assert!(!detector.load(Vec::<u8>::new()));
    assert!(detector.process().is_none());
    assert!(detector.get_annotated_image().is_none());
  }

  #[test]
  fn annotated_image_only_after_detection() {
    let mut detector = RoiDetector::new();
    assert!(detector.load(RgbImage::new(32, 32)));
    let result = detector.process().unwrap();
    assert!(!result.is_detected());
    assert!(detector.get_annotated_image().is_none());

    assert!(detector.load(disk_image()));
    let result = detector.process().unwrap();
    assert_eq!(detector.get_annotated_image(), result.annotated_image);
  }

  #[test]
  fn model_failure_degrades_to_unknown() {
    let image = disk_image();
    let mut detector = RoiDetector::with_model(Broken);
    assert!(detector.load(image.clone()));

    assert!(matches!(detector.try_process(), Some(Err(_))));
    let result = detector.process().unwrap();
    assert_eq!(result, DetectionResult::unknown(Some(image)));
    assert!(detector.get_annotated_image().is_none());
  }
}
