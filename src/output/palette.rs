// 该文件是 VSegments 项目的一部分。
// src/output/palette.rs - 调色板
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

use image::Rgb;

use crate::output::OutputError;

const DEFAULT_COLORS: [[u8; 3]; 30] = [
  [0xFF, 0x00, 0x00],
  [0x00, 0xFF, 0x00],
  [0x00, 0x00, 0xFF],
  [0xFF, 0xFF, 0x00],
  [0xFF, 0x00, 0xFF],
  [0x00, 0xFF, 0xFF],
  [0xFF, 0xA5, 0x00],
  [0x80, 0x00, 0x80],
  [0xFF, 0xC0, 0xCB],
  [0xA5, 0x2A, 0x2A],
  [0x80, 0x80, 0x80],
  [0xF5, 0xF5, 0xDC],
  [0x40, 0xE0, 0xD0],
  [0xFF, 0x7F, 0x50],
  [0xE6, 0xE6, 0xFA],
  [0xEE, 0x82, 0xEE],
  [0xFF, 0xD7, 0x00],
  [0xC0, 0xC0, 0xC0],
  [0x00, 0x00, 0x80],
  [0x80, 0x00, 0x00],
  [0x00, 0x80, 0x80],
  [0x80, 0x80, 0x00],
  [0xFF, 0x63, 0x47],
  [0x4B, 0x00, 0x82],
  [0xDC, 0x14, 0x3C],
  [0x00, 0xCE, 0xD1],
  [0x93, 0x70, 0xDB],
  [0xFF, 0x14, 0x93],
  [0x7F, 0xFF, 0x00],
  [0xD2, 0x69, 0x1E],
];

/// 按对象序号循环取色的调色板，与标签文本无关
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
  colors: Box<[Rgb<u8>]>,
}

impl Default for Palette {
  fn default() -> Self {
    Self {
      colors: DEFAULT_COLORS.iter().copied().map(Rgb).collect(),
    }
  }
}

impl Palette {
  pub fn new(colors: Vec<Rgb<u8>>) -> Result<Self, OutputError> {
    if colors.is_empty() {
      return Err(OutputError::Palette("调色板不能为空".to_string()));
    }
    Ok(Self {
      colors: colors.into_boxed_slice(),
    })
  }

  /// 解析以逗号分隔的 `#RRGGBB` 列表
  pub fn from_hex_list(list: &str) -> Result<Self, OutputError> {
    let colors = list
      .split(',')
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(parse_hex)
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(colors)
  }

  /// 第 `index` 个对象的颜色
  pub fn color(&self, index: usize) -> Rgb<u8> {
    self.colors[index % self.colors.len()]
  }

  pub fn len(&self) -> usize {
    self.colors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.colors.is_empty()
  }
}

fn parse_hex(text: &str) -> Result<Rgb<u8>, OutputError> {
  let hex = text.strip_prefix('#').unwrap_or(text);
  if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
    return Err(OutputError::Palette(format!("无效的颜色: {}", text)));
  }
  let value = u32::from_str_radix(hex, 16)
    .map_err(|e| OutputError::Palette(format!("无效的颜色 {}: {}", text, e)))?;
  Ok(Rgb([
    ((value >> 16) & 0xFF) as u8,
    ((value >> 8) & 0xFF) as u8,
    (value & 0xFF) as u8,
  ]))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_palette_cycles() {
    let palette = Palette::default();
    assert_eq!(palette.len(), 30);
    assert_eq!(palette.color(0), Rgb([255, 0, 0]));
    assert_eq!(palette.color(2), Rgb([0, 0, 255]));
    assert_eq!(palette.color(30), palette.color(0));
    assert_eq!(palette.color(61), palette.color(1));
  }

  #[test]
  fn test_from_hex_list() {
    let palette = Palette::from_hex_list("#102030, a0b0c0 ,").unwrap();
    assert_eq!(palette.len(), 2);
    assert_eq!(palette.color(0), Rgb([0x10, 0x20, 0x30]));
    assert_eq!(palette.color(3), Rgb([0xa0, 0xb0, 0xc0]));
  }

  #[test]
  fn test_from_hex_list_rejects_bad_input() {
    assert!(Palette::from_hex_list("").is_err());
    assert!(Palette::from_hex_list("#12345").is_err());
    assert!(Palette::from_hex_list("#12345g").is_err());
  }
}
