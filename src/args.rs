// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Parser;
use url::Url;

/// Khaire 视杯检测参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测参数
  /// 例如: cupdisc://default?threshold=180&kernel=10&padding=100&thickness=2
  #[arg(long, default_value = "cupdisc://default", value_name = "MODEL")]
  pub model: Url,

  /// 输入眼底图像
  /// 例如: image:///data/fundus.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// 支持:
  /// - 标注图像: image:///data/out.png
  /// - 按日期记录: folder:///data/records 或 folder:///data/records?always
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
}
