// 该文件是 VSegments 项目的一部分。
// src/decode/geometry.rs - 检测框解码
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

use tracing::debug;

use crate::{
  decode::{DecodeError, entries, parse_array},
  model::BoundingBox,
};

/// 将模型响应解码为检测框列表
///
/// 缺少检测框字段的条目被静默跳过；顶层不是 JSON 数组时返回
/// [`DecodeError::MalformedResponse`] 或 [`DecodeError::NotAnArray`]。
pub fn decode_boxes(text: &str) -> Result<Vec<BoundingBox>, DecodeError> {
  let items = parse_array(text)?;
  let boxes: Vec<BoundingBox> = entries(&items)
    .map(|entry| BoundingBox::from_yxyx(entry.label, entry.yxyx))
    .collect();
  debug!("解码得到 {} 个检测框", boxes.len());
  Ok(boxes)
}
