// 该文件是 VSegments 项目的一部分。
// src/main.rs - 命令行主程序
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

mod args;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{Level, info};

use vsegments::{
  input::ImageFileInput,
  output::{Draw, DrawStyle, Palette, Record, Render, SaveImageFileOutput, compact_lines},
  task::{DetectTask, SegmentTask, Task},
  transport::GeminiTransport,
};

use args::Args;

fn init_logging(args: &Args) {
  let level = if args.verbose {
    Level::DEBUG
  } else if args.quiet {
    Level::ERROR
  } else {
    Level::WARN
  };
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_max_level(level)
    .init();
}

fn main() -> Result<()> {
  let args = Args::parse();
  init_logging(&args);

  // 先检查输入文件，再做其他事情
  let input = ImageFileInput::open(&args.file)?;
  let palette = match args.palette.as_deref() {
    Some(list) => Palette::from_hex_list(list)?,
    None => Palette::default(),
  };

  let transport = GeminiTransport::builder()
    .api_key(args.api_key.clone())
    .model(args.model.as_str())
    .endpoint(args.endpoint.as_str())
    .timeout(args.timeout.map(Duration::from_secs))
    .build()?;

  let chatty = !args.quiet && !args.compact;

  let result = if args.segment {
    if chatty {
      println!("正在分割: {}", args.file.display());
    }
    SegmentTask::default()
      .with_prompt(args.prompt.clone())
      .with_temperature(args.temperature)
      .with_max_size(args.max_size)
      .run_task(&input, &transport)?
  } else {
    if chatty {
      println!("正在检测: {}", args.file.display());
    }
    DetectTask::default()
      .with_prompt(args.prompt.clone())
      .with_custom_instructions(args.instructions.clone())
      .with_max_objects(args.max_objects)
      .with_temperature(args.temperature)
      .with_max_size(args.max_size)
      .run_task(&input, &transport)?
  };

  if args.compact {
    for line in compact_lines(&result, input.width(), input.height()) {
      println!("{}", line);
    }
  } else if !args.quiet {
    println!();
    println!("检测到 {} 个对象:", result.count());
    for (i, bbox) in result.boxes().iter().enumerate() {
      println!("  {}. {}", i + 1, bbox.label_str());
    }
  }

  if args.raw
    && !args.compact
    && let Some(raw) = result.raw_response()
  {
    println!();
    println!("模型原始响应:");
    println!("{}", raw);
  }

  if let Some(path) = &args.json {
    let record = Record {
      model: args.model.clone(),
      temperature: args.temperature,
    };
    record.record(&result, path)?;
    if chatty {
      println!();
      println!("JSON 结果已保存到: {}", path.display());
    }
  }

  if let Some(path) = &args.output
    && !args.compact
  {
    if !args.quiet {
      println!();
      println!("正在绘制结果...");
    }
    let style = DrawStyle {
      line_width: args.line_width,
      font_size: args.font_size,
      alpha: args.alpha.clamp(0.0, 1.0),
      ..DrawStyle::default()
    };
    let output = SaveImageFileOutput::new(path, Draw::new(palette, style)?);
    let frame = input.display_image(args.display_max_size);
    info!("绘制底图尺寸: {}x{}", frame.width(), frame.height());
    output.render_result(&frame, &result)?;
    if !args.quiet {
      println!("结果已保存到: {}", path.display());
    }
  }

  if chatty {
    println!();
    println!("完成!");
  }

  Ok(())
}
