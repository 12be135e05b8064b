// 该文件是 VSegments 项目的一部分。
// src/task.rs - 检测与分割任务
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

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::{
  decode::{DecodeError, decode_boxes, decode_masks},
  input::{ImageFileInput, InputError},
  model::SegmentationResult,
  output::OutputError,
  transport::{GenerateRequest, Transport, TransportError},
};

pub const DEFAULT_DETECT_PROMPT: &str = "Detect the 2d bounding boxes";
pub const DEFAULT_SEGMENT_PROMPT: &str = "Give the segmentation masks for the objects. Output a JSON list of segmentation masks where each entry contains the 2D bounding box in the key \"box_2d\", the segmentation mask in key \"mask\", and the text label in the key \"label\". Use descriptive labels.";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_MAX_OBJECTS: usize = 25;
/// 发送给模型的图像最大边长
pub const DEFAULT_MAX_SIZE: u32 = 1024;
/// 绘制结果时底图的最大边长
pub const DEFAULT_DISPLAY_MAX_SIZE: u32 = 2048;

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("输入错误: {0}")]
  Input(#[from] InputError),
  #[error("模型调用错误: {0}")]
  Transport(#[from] TransportError),
  #[error("响应解码错误: {0}")]
  Decode(#[from] DecodeError),
  #[error("输出错误: {0}")]
  Output(#[from] OutputError),
}

pub trait Task {
  fn run_task<T: Transport>(
    &self,
    input: &ImageFileInput,
    transport: &T,
  ) -> Result<SegmentationResult, TaskError>;

  /// 先确认文件存在再发起请求
  fn run_on_file<T: Transport>(
    &self,
    path: impl AsRef<Path>,
    transport: &T,
  ) -> Result<SegmentationResult, TaskError> {
    let input = ImageFileInput::open(path)?;
    self.run_task(&input, transport)
  }
}

/// 检测框任务
#[derive(Debug, Clone)]
pub struct DetectTask {
  prompt: String,
  custom_instructions: Option<String>,
  max_objects: usize,
  temperature: f32,
  max_size: u32,
}

impl Default for DetectTask {
  fn default() -> Self {
    Self {
      prompt: DEFAULT_DETECT_PROMPT.to_string(),
      custom_instructions: None,
      max_objects: DEFAULT_MAX_OBJECTS,
      temperature: DEFAULT_TEMPERATURE,
      max_size: DEFAULT_MAX_SIZE,
    }
  }
}

impl DetectTask {
  pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
    if let Some(prompt) = prompt {
      self.prompt = prompt;
    }
    self
  }

  pub fn with_custom_instructions(mut self, instructions: Option<String>) -> Self {
    self.custom_instructions = instructions;
    self
  }

  pub fn with_max_objects(mut self, max_objects: usize) -> Self {
    self.max_objects = max_objects;
    self
  }

  pub fn with_temperature(mut self, temperature: f32) -> Self {
    self.temperature = temperature;
    self
  }

  pub fn with_max_size(mut self, max_size: u32) -> Self {
    self.max_size = max_size;
    self
  }

  /// 默认系统指令，附加的指令另起一行
  pub fn system_instructions(&self) -> String {
    let mut instructions = format!(
      "Return bounding boxes as a JSON array with labels. Never return masks or code fencing. Limit to {} objects.\n\
       If an object is present multiple times, name them according to their unique characteristic (colors, size, position, unique characteristics, etc..).",
      self.max_objects
    );
    if let Some(custom) = self.custom_instructions.as_deref().filter(|c| !c.is_empty()) {
      instructions.push('\n');
      instructions.push_str(custom);
    }
    instructions
  }
}

impl Task for DetectTask {
  fn run_task<T: Transport>(
    &self,
    input: &ImageFileInput,
    transport: &T,
  ) -> Result<SegmentationResult, TaskError> {
    info!("开始检测: {}", input.path().display());
    let (image, mime_type) = input.request_payload(self.max_size)?;
    let instructions = self.system_instructions();

    let text = transport.generate(&GenerateRequest {
      image: &image,
      mime_type,
      prompt: &self.prompt,
      system_instructions: Some(instructions.as_str()),
      temperature: self.temperature,
    })?;

    let boxes = decode_boxes(&text)?;
    info!("检测到 {} 个对象", boxes.len());
    Ok(SegmentationResult::new(boxes, None, Some(text)))
  }
}

/// 分割任务，结果总是带有掩码列表（可能为空）
#[derive(Debug, Clone)]
pub struct SegmentTask {
  prompt: String,
  temperature: f32,
  max_size: u32,
}

impl Default for SegmentTask {
  fn default() -> Self {
    Self {
      prompt: DEFAULT_SEGMENT_PROMPT.to_string(),
      temperature: DEFAULT_TEMPERATURE,
      max_size: DEFAULT_MAX_SIZE,
    }
  }
}

impl SegmentTask {
  pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
    if let Some(prompt) = prompt {
      self.prompt = prompt;
    }
    self
  }

  pub fn with_temperature(mut self, temperature: f32) -> Self {
    self.temperature = temperature;
    self
  }

  pub fn with_max_size(mut self, max_size: u32) -> Self {
    self.max_size = max_size;
    self
  }
}

impl Task for SegmentTask {
  fn run_task<T: Transport>(
    &self,
    input: &ImageFileInput,
    transport: &T,
  ) -> Result<SegmentationResult, TaskError> {
    info!("开始分割: {}", input.path().display());
    let (image, mime_type) = input.request_payload(self.max_size)?;

    let text = transport.generate(&GenerateRequest {
      image: &image,
      mime_type,
      prompt: &self.prompt,
      system_instructions: None,
      temperature: self.temperature,
    })?;

    // 掩码按原图尺寸解码
    let boxes = decode_boxes(&text)?;
    let masks = decode_masks(&text, input.height(), input.width())?;
    info!("分割得到 {} 个对象，{} 个掩码", boxes.len(), masks.len());
    Ok(SegmentationResult::new(boxes, Some(masks), Some(text)))
  }
}
