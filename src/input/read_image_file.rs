// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::io::Cursor;
use std::path::Path;

use image::{ImageReader, ImageResult, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{BgrFrame, FrameError},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Invalid image: {0}")]
  InvalidImage(#[from] FrameError),
}

/// 读取并解码图像文件，格式按内容推断
pub fn decode_path(path: impl AsRef<Path>) -> ImageResult<RgbImage> {
  let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
  Ok(image.to_rgb8())
}

/// 解码上传的图像字节（PNG、JPEG 等）
pub fn decode_bytes(bytes: &[u8]) -> ImageResult<RgbImage> {
  let image = ImageReader::new(Cursor::new(bytes))
    .with_guessed_format()?
    .decode()?;
  Ok(image.to_rgb8())
}

/// 单张图像输入，迭代一次后耗尽
pub struct ImageFileInput {
  frame: Option<BgrFrame>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url.path();
    info!("读取图像文件: {}", path);
    Self::from_rgb(&decode_path(path)?)
  }
}

impl ImageFileInput {
  /// 由上传的编码字节构造
  pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageFileInputError> {
    Self::from_rgb(&decode_bytes(bytes)?)
  }

  fn from_rgb(image: &RgbImage) -> Result<Self, ImageFileInputError> {
    let frame = BgrFrame::try_from(image)?;
    Ok(ImageFileInput { frame: Some(frame) })
  }
}

impl Iterator for ImageFileInput {
  type Item = BgrFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}
