// 该文件是 VSegments 项目的一部分。
// src/output/record.rs - 结果记录（JSON 导出与紧凑文本）
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

use serde::Serialize;
use serde_json::{Number, Value};
use tracing::info;

use crate::{model::SegmentationResult, output::OutputError};

#[derive(Serialize)]
struct RecordBox<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  label: Option<&'a str>,
  box_2d: [Value; 4],
}

#[derive(Serialize)]
struct RecordDocument<'a> {
  boxes: Vec<RecordBox<'a>>,
  model: &'a str,
  temperature: f32,
  /// 只记录掩码数量，不导出掩码数据
  #[serde(skip_serializing_if = "Option::is_none")]
  masks: Option<usize>,
}

/// JSON 导出，检测框按 `[y1, x1, y2, x2]` 写回 `box_2d`
pub struct Record {
  pub model: String,
  pub temperature: f32,
}

impl Record {
  pub fn to_json(&self, result: &SegmentationResult) -> Result<String, OutputError> {
    let document = RecordDocument {
      boxes: result
        .boxes()
        .iter()
        .map(|bbox| RecordBox {
          label: bbox.label.as_deref(),
          box_2d: bbox.to_yxyx().map(number),
        })
        .collect(),
      model: &self.model,
      temperature: self.temperature,
      masks: result.masks().map(<[_]>::len),
    };
    Ok(serde_json::to_string_pretty(&document)?)
  }

  pub fn record(&self, result: &SegmentationResult, path: &Path) -> Result<(), OutputError> {
    std::fs::write(path, self.to_json(result)?)?;
    info!("JSON 结果已保存到: {}", path.display());
    Ok(())
  }
}

// 整数坐标按整数输出
fn number(value: f64) -> Value {
  if value.fract() == 0.0 && value.abs() < (i64::MAX as f64) {
    Value::Number(Number::from(value as i64))
  } else {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
  }
}

/// 紧凑格式：每个对象一行 `<序号>. <标签> [<x1> <y1> <x2> <y2>]`，使用像素坐标
pub fn compact_lines(result: &SegmentationResult, width: u32, height: u32) -> Vec<String> {
  result
    .boxes()
    .iter()
    .enumerate()
    .map(|(i, bbox)| {
      let [x1, y1, x2, y2] = bbox.to_absolute(width, height);
      format!("{}. {} [{} {} {} {}]", i + 1, bbox.label_str(), x1, y1, x2, y2)
    })
    .collect()
}
