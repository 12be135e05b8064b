// 该文件是 VSegments 项目的一部分。
// src/decode/mask.rs - 分割掩码解码
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

use base64::{Engine, engine::general_purpose::STANDARD};
use std::ops::Range;

use image::{DynamicImage, GrayImage, Luma};
use rayon::prelude::*;
use tracing::debug;

use crate::{
  decode::{DecodeError, Entry, entries, parse_array},
  model::{SegmentationMask, to_pixel},
};

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

// 掩码缩放到检测框尺寸时使用三角（双线性）滤波
const TRIANGLE_SUPPORT: f64 = 1.0;

/// 去掉 `data:<mime>;base64,` 前缀，没有前缀时原样返回
pub fn strip_data_uri(payload: &str) -> &str {
  let payload = payload.trim();
  if let Some(rest) = payload.strip_prefix(DATA_URI_PREFIX)
    && let Some(pos) = rest.find(BASE64_MARKER)
  {
    return &rest[pos + BASE64_MARKER.len()..];
  }
  payload
}

/// 将模型响应解码为整幅图像尺寸的分割掩码
///
/// 只处理同时带有检测框与掩码字段的条目。每个掩码的解码与缩放相互独立，
/// 并行执行，结果按数组顺序返回。
pub fn decode_masks(
  text: &str,
  height: u32,
  width: u32,
) -> Result<Vec<SegmentationMask>, DecodeError> {
  let items = parse_array(text)?;
  let pending: Vec<(Entry<'_>, &str)> = entries(&items)
    .filter_map(|entry| {
      let payload = entry.mask?;
      Some((entry, payload))
    })
    .collect();

  debug!(
    "开始解码 {} 个掩码，图像尺寸 {}x{}",
    pending.len(),
    width,
    height
  );
  let now = std::time::Instant::now();

  let masks = pending
    .into_par_iter()
    .map(|(entry, payload)| decode_one(entry, payload, height, width))
    .collect::<Result<Vec<_>, _>>()?;

  debug!("掩码解码完成，耗时: {:.2?}", now.elapsed());
  Ok(masks)
}

fn decode_one(
  entry: Entry<'_>,
  payload: &str,
  height: u32,
  width: u32,
) -> Result<SegmentationMask, DecodeError> {
  let [y1, x1, y2, x2] = entry.yxyx;
  let y0 = to_pixel(y1, height);
  let x0 = to_pixel(x1, width);
  let y1 = to_pixel(y2, height);
  let x1 = to_pixel(x2, width);

  let bytes = STANDARD
    .decode(strip_data_uri(payload))
    .map_err(|source| DecodeError::MaskPayload {
      index: entry.index,
      source,
    })?;
  let raster = image::load_from_memory(&bytes).map_err(|source| DecodeError::MaskImage {
    index: entry.index,
    source,
  })?;

  let mut mask = vec![0u8; (width as usize) * (height as usize)];

  // 检测框先与图像求交，只采样可见部分
  let (left, top) = (x0 as i64, y0 as i64);
  let (bw, bh) = (x1 as i64 - left, y1 as i64 - top);
  let cols = left.max(0)..(x1 as i64).min(width as i64);
  let rows = top.max(0)..(y1 as i64).min(height as i64);
  let visible = !cols.is_empty() && !rows.is_empty();
  if bw > 0 && bh > 0 && visible && raster.width() > 0 && raster.height() > 0 {
    let alpha = alpha_channel(&raster);
    let xs = axis_taps(alpha.width(), bw, cols.start - left..cols.end - left);
    let ys = axis_taps(alpha.height(), bh, rows.start - top..rows.end - top);
    for (y, (sy, wy)) in rows.zip(&ys) {
      let line = &mut mask[(y as usize) * (width as usize)..][..width as usize];
      for (x, (sx, wx)) in cols.clone().zip(&xs) {
        line[x as usize] = sample(&alpha, *sx, wx, *sy, wy);
      }
    }
  } else {
    debug!(
      "第 {} 个对象的检测框在图像内为空: {}x{}",
      entry.index, bw, bh
    );
  }

  Ok(SegmentationMask {
    y0,
    x0,
    y1,
    x1,
    width,
    height,
    mask: mask.into_boxed_slice(),
    label: entry.label,
  })
}

fn alpha_channel(raster: &DynamicImage) -> GrayImage {
  let rgba = raster.to_rgba8();
  GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
    Luma([rgba.get_pixel(x, y)[3]])
  })
}

fn triangle(x: f64) -> f64 {
  (1.0 - x.abs()).max(0.0)
}

/// 把长度为 `source` 的源轴按三角滤波缩放到 `footprint`，只计算 `window` 内的输出像素
///
/// 每项为源区间起点与归一化后的权重。
fn axis_taps(source: u32, footprint: i64, window: Range<i64>) -> Vec<(u32, Vec<f64>)> {
  let last = source as i64;
  let ratio = source as f64 / footprint as f64;
  let scale = ratio.max(1.0);
  let support = TRIANGLE_SUPPORT * scale;

  window
    .map(|out| {
      let center = (out as f64 + 0.5) * ratio;
      let start = ((center - support).floor() as i64).clamp(0, last - 1);
      let end = ((center + support).ceil() as i64).clamp(start + 1, last);
      let center = center - 0.5;

      let mut weights: Vec<f64> = (start..end)
        .map(|i| triangle((i as f64 - center) / scale))
        .collect();
      let sum: f64 = weights.iter().sum();
      if sum > 0.0 {
        weights.iter_mut().for_each(|w| *w /= sum);
      }
      (start as u32, weights)
    })
    .collect()
}

fn sample(alpha: &GrayImage, sx: u32, wx: &[f64], sy: u32, wy: &[f64]) -> u8 {
  let mut value = 0.0;
  for (j, ky) in wy.iter().enumerate() {
    for (i, kx) in wx.iter().enumerate() {
      value += ky * kx * alpha.get_pixel(sx + i as u32, sy + j as u32)[0] as f64;
    }
  }
  value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageFormat, Rgba, RgbaImage};
  use std::io::Cursor;

  // 来自线上响应的 1x1 PNG
  const TINY_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

  fn png_data_uri(width: u32, height: u32, alpha: impl Fn(u32, u32) -> u8) -> String {
    let image = RgbaImage::from_fn(width, height, |x, y| Rgba([255, 255, 255, alpha(x, y)]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(image)
      .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
      .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
  }

  fn entry(label: &str, yxyx: [u32; 4], mask: Option<&str>) -> String {
    let mut value = serde_json::json!({ "label": label, "box_2d": yxyx });
    if let Some(mask) = mask {
      value["mask"] = serde_json::Value::String(mask.to_string());
    }
    value.to_string()
  }

  fn footprint_only(mask: &SegmentationMask) {
    for y in 0..mask.height {
      for x in 0..mask.width {
        let inside = (x as i32) >= mask.x0
          && (x as i32) < mask.x1
          && (y as i32) >= mask.y0
          && (y as i32) < mask.y1;
        if !inside {
          assert_eq!(mask.value_at(x, y), 0, "({}, {}) 在检测框外", x, y);
        }
      }
    }
  }

  #[test]
  fn test_strip_data_uri() {
    assert_eq!(strip_data_uri("data:image/png;base64,AAAA"), "AAAA");
    assert_eq!(strip_data_uri("data:image/webp;base64,BBBB"), "BBBB");
    assert_eq!(strip_data_uri("  CCCC\n"), "CCCC");
    assert_eq!(strip_data_uri("data:nothing"), "data:nothing");
  }

  #[test]
  fn test_opaque_mask_fills_footprint() {
    let png = png_data_uri(4, 4, |_, _| 255);
    let text = format!("[{}]", entry("ball", [100, 100, 200, 200], Some(&png)));
    let masks = decode_masks(&text, 100, 100).unwrap();

    assert_eq!(masks.len(), 1);
    let mask = &masks[0];
    assert_eq!(mask.corners(), [10, 10, 20, 20]);
    assert_eq!(mask.mask.len(), 100 * 100);
    assert_eq!(mask.label.as_deref(), Some("ball"));
    assert_eq!(mask.mask.iter().filter(|v| **v > 0).count(), 100);
    assert!(mask.value_at(15, 15) >= 250);
    footprint_only(mask);
  }

  #[test]
  fn test_mask_uses_alpha_channel() {
    // 左半透明，右半不透明
    let png = png_data_uri(2, 1, |x, _| if x == 0 { 0 } else { 255 });
    let text = format!("[{}]", entry("half", [0, 0, 1000, 1000], Some(&png)));
    let mask = &decode_masks(&text, 2, 4).unwrap()[0];
    assert_eq!(mask.value_at(0, 0), 0);
    assert_eq!(mask.value_at(3, 1), 255);
  }

  #[test]
  fn test_non_square_image_uses_each_axis() {
    let png = png_data_uri(3, 3, |_, _| 200);
    let text = format!("[{}]", entry("wide", [250, 250, 750, 750], Some(&png)));
    let mask = &decode_masks(&text, 600, 800).unwrap()[0];
    assert_eq!(mask.corners(), [200, 150, 600, 450]);
    assert_eq!((mask.width, mask.height), (800, 600));
    footprint_only(mask);
  }

  #[test]
  fn test_box_without_mask_is_skipped() {
    let text = format!("[{}]", entry("plain", [0, 0, 500, 500], None));
    assert!(decode_masks(&text, 10, 10).unwrap().is_empty());
  }

  #[test]
  fn test_mask_without_box_is_skipped() {
    let png = png_data_uri(1, 1, |_, _| 255);
    let text = format!(r#"[{{"label": "orphan", "mask": "{}"}}]"#, png);
    assert!(decode_masks(&text, 10, 10).unwrap().is_empty());
  }

  #[test]
  fn test_box_past_edges_is_clipped() {
    let png = png_data_uri(2, 2, |_, _| 255);
    let text = format!("[{}]", entry("edge", [900, 900, 1100, 1100], Some(&png)));
    let mask = &decode_masks(&text, 50, 50).unwrap()[0];
    // 检测框本身不被截断
    assert_eq!(mask.corners(), [45, 45, 55, 55]);
    assert_eq!(mask.mask.iter().filter(|v| **v > 0).count(), 25);
  }

  #[test]
  fn test_empty_footprint_yields_empty_mask() {
    let png = png_data_uri(2, 2, |_, _| 255);
    let text = format!(
      "[{}, {}]",
      entry("flat", [100, 100, 100, 200], Some(&png)),
      entry("inverted", [500, 500, 100, 100], Some(&png))
    );
    let masks = decode_masks(&text, 20, 20).unwrap();
    assert_eq!(masks.len(), 2);
    assert!(masks.iter().all(|m| m.mask.iter().all(|v| *v == 0)));
  }

  #[test]
  fn test_order_follows_array() {
    let png = png_data_uri(1, 1, |_, _| 255);
    let labels = ["a", "b", "c", "d", "e", "f", "g", "h"];
    let items: Vec<String> = labels
      .iter()
      .enumerate()
      .map(|(i, label)| {
        let y = (i as u32) * 100;
        entry(label, [y, 0, y + 100, 1000], Some(&png))
      })
      .collect();
    let text = format!("[{}]", items.join(","));

    let masks = decode_masks(&text, 40, 40).unwrap();
    let decoded: Vec<&str> = masks.iter().map(|m| m.label_str()).collect();
    assert_eq!(decoded, labels);
  }

  #[test]
  fn test_tiny_png_fixture() {
    let text = format!("[{}]", entry("object1", [100, 100, 200, 200], Some(TINY_PNG)));
    let mask = &decode_masks(&text, 100, 100).unwrap()[0];
    assert_eq!(mask.corners(), [10, 10, 20, 20]);
    footprint_only(mask);
  }

  #[test]
  fn test_invalid_base64_fails() {
    let text = format!(
      "[{}, {}]",
      entry("plain", [0, 0, 10, 10], None),
      entry("broken", [0, 0, 10, 10], Some("data:image/png;base64,@@@@"))
    );
    let err = decode_masks(&text, 10, 10).unwrap_err();
    assert!(matches!(err, DecodeError::MaskPayload { index: 1, .. }));
    assert!(!err.is_malformed());
  }

  #[test]
  fn test_invalid_image_fails() {
    let payload = format!("data:image/png;base64,{}", STANDARD.encode(b"not a png"));
    let text = format!("[{}]", entry("broken", [0, 0, 10, 10], Some(&payload)));
    let err = decode_masks(&text, 10, 10).unwrap_err();
    assert!(matches!(err, DecodeError::MaskImage { index: 0, .. }));
  }

  #[test]
  fn test_malformed_response() {
    let err = decode_masks("```json\n{oops\n```", 10, 10).unwrap_err();
    assert!(err.is_malformed());
  }

  #[test]
  fn test_empty_mask_field_is_skipped() {
    let text = format!(
      "[{}, {}]",
      entry("blank", [0, 0, 500, 500], Some("")),
      entry("spaces", [0, 0, 500, 500], Some("  "))
    );
    assert!(decode_masks(&text, 10, 10).unwrap().is_empty());
    assert_eq!(crate::decode::decode_boxes(&text).unwrap().len(), 2);
  }

  #[test]
  fn test_huge_box_is_clipped_to_image() {
    let png = png_data_uri(1, 1, |_, _| 255);
    let text = format!(
      r#"[{{"label": "wide", "box_2d": [0, -1e12, 1000, 1e12], "mask": "{}"}}]"#,
      png
    );
    let mask = &decode_masks(&text, 10, 10).unwrap()[0];
    assert_eq!(mask.corners(), [i32::MIN, 0, i32::MAX, 10]);
    assert_eq!(mask.mask.len(), 100);
    assert!(mask.mask.iter().all(|v| *v == 255));
  }

  #[test]
  fn test_partly_visible_box_matches_full_resample() {
    // 左半透明，右半不透明；检测框左半落在图像之外
    let png = png_data_uri(2, 1, |x, _| if x == 0 { 0 } else { 255 });
    let text = format!(
      r#"[{{"label": "shifted", "box_2d": [0, -1000, 1000, 1000], "mask": "{}"}}]"#,
      png
    );
    let mask = &decode_masks(&text, 20, 20).unwrap()[0];
    assert_eq!(mask.corners(), [-20, 0, 20, 20]);

    let source = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
    let full = image::imageops::resize(&source, 40, 20, image::imageops::FilterType::Triangle);
    for y in 0..20 {
      for x in 0..20 {
        let expected = full.get_pixel(x + 20, y)[0] as i32;
        let actual = mask.value_at(x, y) as i32;
        assert!((expected - actual).abs() <= 1, "({}, {}): {} != {}", x, y, actual, expected);
      }
    }
    assert_eq!(mask.value_at(19, 10), 255);
  }
}
