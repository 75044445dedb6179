// 该文件是 Khaire （视网膜健康筛查） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use khaire::{
  FromUrl,
  input::InputWrapper,
  model::CupDiscBuilder,
  output::OutputWrapper,
  report::GlaucomaFinding,
  task::{OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("检测参数: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let model = CupDiscBuilder::from_url(&args.model)?.build();
  let output = OutputWrapper::from_url(&args.output)?;

  let result = OneShotTask.run_task(input, model, output)?;
  let finding = GlaucomaFinding::from(result);

  println!("{}", serde_json::to_string_pretty(&finding.to_json())?);

  Ok(())
}
