// 该文件是 VSegments 项目的一部分。
// src/args.rs - 命令行参数
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

use std::path::PathBuf;

use clap::Parser;

use vsegments::{
  task::{DEFAULT_DISPLAY_MAX_SIZE, DEFAULT_MAX_OBJECTS, DEFAULT_MAX_SIZE, DEFAULT_TEMPERATURE},
  transport::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL},
};

/// 使用 Google Gemini 进行检测框与分割掩码识别
#[derive(Parser, Debug)]
#[command(name = "vsegments", author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像文件路径
  #[arg(short = 'f', long, value_name = "IMAGE")]
  pub file: PathBuf,

  /// 执行分割而不是检测框识别
  #[arg(long)]
  pub segment: bool,

  /// Google API 密钥
  #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true, value_name = "KEY")]
  pub api_key: Option<String>,

  /// 模型名称
  #[arg(short = 'm', long, default_value = DEFAULT_MODEL, value_name = "MODEL")]
  pub model: String,

  /// 采样温度 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_TEMPERATURE, value_name = "TEMP")]
  pub temperature: f32,

  /// 最多检测的对象数
  #[arg(long, default_value_t = DEFAULT_MAX_OBJECTS, value_name = "N")]
  pub max_objects: usize,

  /// 自定义提示词
  #[arg(short = 'p', long, value_name = "TEXT")]
  pub prompt: Option<String>,

  /// 附加的系统指令（仅检测模式）
  #[arg(long, value_name = "TEXT")]
  pub instructions: Option<String>,

  /// 可视化结果保存路径（PNG）
  #[arg(short = 'o', long, value_name = "FILE")]
  pub output: Option<PathBuf>,

  /// JSON 结果导出路径
  #[arg(long, value_name = "FILE")]
  pub json: Option<PathBuf>,

  /// 打印模型的原始响应
  #[arg(long)]
  pub raw: bool,

  /// 边框线宽
  #[arg(long, default_value_t = 4, value_name = "N")]
  pub line_width: u32,

  /// 标签字号
  #[arg(long, default_value_t = 14.0, value_name = "N")]
  pub font_size: f32,

  /// 掩码不透明度 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.7, value_name = "A")]
  pub alpha: f32,

  /// 发送给模型的图像最大边长，0 表示不缩放
  #[arg(long, default_value_t = DEFAULT_MAX_SIZE, value_name = "N")]
  pub max_size: u32,

  /// 可视化底图的最大边长，0 表示不缩放
  #[arg(long, default_value_t = DEFAULT_DISPLAY_MAX_SIZE, value_name = "N")]
  pub display_max_size: u32,

  /// 自定义调色板，逗号分隔的十六进制颜色，如 "#FF0000,#00FF00"
  #[arg(long, value_name = "COLORS")]
  pub palette: Option<String>,

  /// 模型服务地址
  #[arg(long, default_value = DEFAULT_ENDPOINT, value_name = "URL")]
  pub endpoint: String,

  /// 请求超时时间（秒）
  #[arg(long, value_name = "SECONDS")]
  pub timeout: Option<u64>,

  /// 只输出错误信息
  #[arg(short = 'q', long, conflicts_with = "verbose")]
  pub quiet: bool,

  /// 输出调试日志
  #[arg(short = 'v', long)]
  pub verbose: bool,

  /// 紧凑输出：每行 "序号. 标签 [x1 y1 x2 y2]"
  #[arg(long)]
  pub compact: bool,
}
