// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{Datelike, Utc};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::BgrFrame,
  model::DetectionResult,
  output::{
    Render,
    draw::{Record, annotated_or},
  },
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 按日期分目录保存标注图像和 JSON 记录。
///
/// `folder:///data/records` 只记录检出结果，`folder:///data/records?always`
/// 同时记录未检出的结果。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      frame_counter: AtomicU16::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render<BgrFrame, DetectionResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &BgrFrame, result: &DetectionResult) -> Result<(), Self::Error> {
    if !self.always && !result.is_detected() {
      debug!("未检出视杯区域，跳过记录");
      return Ok(());
    }

    let path = self.frame_path()?;
    annotated_or(result, frame).save(&path)?;
    Record::record(result, &path)?;
    info!("记录已保存: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::ToRgbImage;

  fn files_under(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(d) = stack.pop() {
      if let Ok(entries) = std::fs::read_dir(&d) {
        for entry in entries.flatten() {
          let path = entry.path();
          if path.is_dir() {
            stack.push(path);
          } else {
            files.push(path);
          }
        }
      }
    }
    files
  }

  #[test]
  fn skips_no_region_unless_always() {
    let dir = std::env::temp_dir().join(format!("khaire-record-{}", std::process::id()));
    let frame = BgrFrame::with_shape(8, 8).unwrap();
    let result = DetectionResult::unknown(Some(frame.to_rgb_image()));

    let url = url::Url::parse(&format!("folder://{}", dir.display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame, &result).unwrap();
    assert!(files_under(&dir).is_empty());

    let url = url::Url::parse(&format!("folder://{}?always", dir.display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame, &result).unwrap();

    let mut extensions: Vec<_> = files_under(&dir)
      .iter()
      .filter_map(|p| p.extension().map(|e| e.to_string_lossy().into_owned()))
      .collect();
    extensions.sort();
    assert_eq!(extensions, vec!["json", "png"]);

    std::fs::remove_dir_all(dir).unwrap();
  }
}
