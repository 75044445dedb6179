// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/report.rs - 青光眼结果汇总
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

use std::fmt::Display;

use image::RgbImage;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::{
  detector::{ImageSource, RoiDetector},
  frame::BgrFrame,
  model::{DetectionResult, Model, RiskLabel},
};

const FAILED_TO_PROCESS: &str = "Failed to process image";
const ERROR_IN_PROCESSING: &str = "Error in processing";

/// 展示层使用的青光眼结果
#[derive(Debug, Clone, PartialEq)]
pub struct GlaucomaFinding {
  pub status: RiskLabel,
  pub confidence: f64,
  /// 保留两位小数
  pub cup_to_disc_ratio: Option<f64>,
  pub detection_status: &'static str,
  pub processed_image: Option<RgbImage>,
}

fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

impl From<DetectionResult> for GlaucomaFinding {
  fn from(result: DetectionResult) -> Self {
    Self {
      status: result.risk_label,
      confidence: result.confidence,
      cup_to_disc_ratio: result.cup_to_disc_ratio.map(round2),
      detection_status: result.status.as_str(),
      processed_image: result.annotated_image,
    }
  }
}

impl GlaucomaFinding {
  fn degraded(detection_status: &'static str) -> Self {
    Self {
      status: RiskLabel::Unknown,
      confidence: 0.0,
      cup_to_disc_ratio: None,
      detection_status,
      processed_image: None,
    }
  }

  pub fn to_json(&self) -> Value {
    json!({
      "status": self.status.as_str(),
      "confidence": self.confidence,
      "cup_to_disc_ratio": self.cup_to_disc_ratio,
      "detection_status": self.detection_status,
      "processed_image": self.processed_image.as_ref().map(|image| json!({
        "width": image.width(),
        "height": image.height(),
      })),
    })
  }
}

/// 单次请求的分析：新建检测器，载入，处理，汇总。
pub fn analyze(source: impl Into<ImageSource>) -> GlaucomaFinding {
  analyze_with(RoiDetector::new(), source)
}

/// 与 [`analyze`] 相同，使用调用方提供的检测器
pub fn analyze_with<M>(
  mut detector: RoiDetector<M>,
  source: impl Into<ImageSource>,
) -> GlaucomaFinding
where
  M: Model<Input = BgrFrame, Output = DetectionResult>,
  M::Error: Display,
{
  if let Err(e) = detector.try_load(source) {
    warn!("图像载入失败: {}", e);
    return GlaucomaFinding::degraded(FAILED_TO_PROCESS);
  }

  match detector.try_process() {
    Some(Ok(result)) => GlaucomaFinding::from(result),
    Some(Err(e)) => {
      error!("视杯检测失败: {}", e);
      GlaucomaFinding::degraded(ERROR_IN_PROCESSING)
    }
    None => GlaucomaFinding::degraded(FAILED_TO_PROCESS),
  }
}
