// 该文件是 VSegments 项目的一部分。
// src/decode.rs - 模型响应解码
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

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

mod geometry;
mod mask;

pub use self::geometry::decode_boxes;
pub use self::mask::{decode_masks, strip_data_uri};

/// 检测框字段名，值为 `[y1, x1, y2, x2]`
pub const BOX_KEY: &str = "box_2d";
/// 掩码字段名，值为（可带 data URI 前缀的）base64 PNG
pub const MASK_KEY: &str = "mask";
/// 标签字段名
pub const LABEL_KEY: &str = "label";

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("模型响应不是合法的 JSON: {source}; 响应内容: {raw}")]
  MalformedResponse {
    raw: String,
    #[source]
    source: serde_json::Error,
  },
  #[error("模型响应的顶层不是 JSON 数组; 响应内容: {raw}")]
  NotAnArray { raw: String },
  #[error("第 {index} 个对象的掩码不是合法的 base64: {source}")]
  MaskPayload {
    index: usize,
    #[source]
    source: base64::DecodeError,
  },
  #[error("第 {index} 个对象的掩码图像无法解码: {source}")]
  MaskImage {
    index: usize,
    #[source]
    source: image::ImageError,
  },
}

impl DecodeError {
  /// 响应整体无法解析（区别于“模型没有返回任何对象”）
  pub fn is_malformed(&self) -> bool {
    matches!(
      self,
      DecodeError::MalformedResponse { .. } | DecodeError::NotAnArray { .. }
    )
  }

  /// 引发错误的原始文本
  pub fn raw(&self) -> Option<&str> {
    match self {
      DecodeError::MalformedResponse { raw, .. } | DecodeError::NotAnArray { raw } => Some(raw),
      _ => None,
    }
  }
}

/// 从模型输出中取出 JSON 文本
///
/// 逐行扫描，遇到内容恰为 ```` ```json ```` 的行后，取其后的全部内容并截断到第一个
/// ```` ``` ````；没有围栏时取整个输入。结果去除首尾空白。本函数从不失败。
pub fn extract_json(text: &str) -> &str {
  let mut offset = 0;
  for line in text.split('\n') {
    let next = offset + line.len() + 1;
    if line.trim() == FENCE_OPEN {
      let rest = text.get(next..).unwrap_or_default();
      let body = rest.split(FENCE_CLOSE).next().unwrap_or_default();
      return body.trim();
    }
    offset = next;
  }
  text.trim()
}

/// 解析出顶层 JSON 数组
pub(crate) fn parse_array(text: &str) -> Result<Vec<Value>, DecodeError> {
  let json = extract_json(text);
  let value: Value =
    serde_json::from_str(json).map_err(|source| DecodeError::MalformedResponse {
      raw: json.to_string(),
      source,
    })?;

  match value {
    Value::Array(items) => {
      debug!("响应中包含 {} 个条目", items.len());
      Ok(items)
    }
    _ => Err(DecodeError::NotAnArray {
      raw: json.to_string(),
    }),
  }
}

/// 数组中一个带检测框的条目，字段在此处一次性校验
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Entry<'a> {
  pub index: usize,
  pub label: Option<String>,
  pub yxyx: [f64; 4],
  pub mask: Option<&'a str>,
}

impl<'a> Entry<'a> {
  /// 缺少检测框或检测框不是 4 个数字时返回 `None`，调用方静默跳过
  pub fn from_value(index: usize, value: &'a Value) -> Option<Self> {
    let object = value.as_object()?;

    let coords = object.get(BOX_KEY)?.as_array()?;
    if coords.len() != 4 {
      return None;
    }
    let mut yxyx = [0.0; 4];
    for (slot, coord) in yxyx.iter_mut().zip(coords) {
      *slot = coord.as_f64()?;
    }

    let label = match object.get(LABEL_KEY) {
      None | Some(Value::Null) => None,
      Some(Value::String(label)) => Some(label.clone()),
      Some(other) => Some(other.to_string()),
    };

    let mask = object
      .get(MASK_KEY)
      .and_then(Value::as_str)
      .filter(|m| !m.trim().is_empty());

    Some(Entry {
      index,
      label,
      yxyx,
      mask,
    })
  }
}

/// 依次取出所有带检测框的条目，保持数组顺序
pub(crate) fn entries(items: &[Value]) -> impl Iterator<Item = Entry<'_>> {
  items.iter().enumerate().filter_map(|(index, value)| {
    let entry = Entry::from_value(index, value);
    if entry.is_none() {
      debug!("跳过第 {} 个条目: 缺少 {} 字段", index, BOX_KEY);
    }
    entry
  })
}
