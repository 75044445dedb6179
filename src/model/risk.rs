// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/model/risk.rs - 杯盘比风险分级
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

use std::fmt;

const HIGH_RATIO: f64 = 0.7;
const MODERATE_RATIO: f64 = 0.5;
pub const CONFIDENCE_CAP: f64 = 99.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskLabel {
  Low,
  Moderate,
  High,
  Unknown,
}

impl RiskLabel {
  pub fn as_str(&self) -> &'static str {
    match self {
      RiskLabel::Low => "Low",
      RiskLabel::Moderate => "Moderate",
      RiskLabel::High => "High",
      RiskLabel::Unknown => "Unknown",
    }
  }
}

impl fmt::Display for RiskLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 由杯盘比得到风险等级与置信度（上限 99）
///
/// | 条件 | 等级 | 置信度 |
/// |---|---|---|
/// | ratio > 0.7 | High | 85 + (ratio - 0.7) * 50 |
/// | 0.5 < ratio <= 0.7 | Moderate | 60 + (ratio - 0.5) * 125 |
/// | ratio <= 0.5 | Low | max(40 + ratio * 40, 25) |
pub fn classify(ratio: f64) -> (RiskLabel, f64) {
  let (label, confidence) = if ratio > HIGH_RATIO {
    (RiskLabel::High, 85.0 + (ratio - HIGH_RATIO) * 50.0)
  } else if ratio > MODERATE_RATIO {
    (RiskLabel::Moderate, 60.0 + (ratio - MODERATE_RATIO) * 125.0)
  } else {
    (RiskLabel::Low, (40.0 + ratio * 40.0).max(25.0))
  };

  (label, confidence.min(CONFIDENCE_CAP))
}
