// 该文件是 VSegments 项目的一部分。
// src/output/draw.rs - 检测框与分割掩码可视化
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

use std::borrow::Cow;

use ab_glyph::{FontArc, PxScale};
use image::{GrayImage, Rgb, Rgba, RgbaImage, imageops::FilterType};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_text_mut},
  rect::Rect,
};
use tracing::{debug, warn};

use crate::{
  model::{BoundingBox, SegmentationMask, SegmentationResult},
  output::{OutputError, palette::Palette},
};

// 文本渲染常量
const LABEL_OFFSET_X: i32 = 8;
const LABEL_GAP_Y: i32 = 6;
const MAX_LINE_WIDTH: u32 = 1 << 12;

/// 绘制参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
  /// 边框线宽（像素）
  pub line_width: u32,
  /// 标签字号（像素）
  pub font_size: f32,
  /// 掩码的整体不透明度，`[0, 1]`
  pub alpha: f32,
  pub show_labels: bool,
}

impl Default for DrawStyle {
  fn default() -> Self {
    Self {
      line_width: 4,
      font_size: 14.0,
      alpha: 0.7,
      show_labels: true,
    }
  }
}

pub struct Draw {
  font: FontArc,
  palette: Palette,
  style: DrawStyle,
}

impl Draw {
  /// 使用内置字体
  pub fn new(palette: Palette, style: DrawStyle) -> Result<Self, OutputError> {
    let font_data: &'static [u8] = include_bytes!("../../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data)?;
    Ok(Self::with_font(font, palette, style))
  }

  pub fn with_font(font: FontArc, palette: Palette, style: DrawStyle) -> Self {
    Self {
      font,
      palette,
      style,
    }
  }

  pub fn palette(&self) -> &Palette {
    &self.palette
  }

  pub fn style(&self) -> &DrawStyle {
    &self.style
  }

  /// 有掩码时按分割模式绘制，否则只绘制检测框
  pub fn draw_result(&self, image: &RgbaImage, result: &SegmentationResult) -> RgbaImage {
    match result.masks() {
      Some(masks) => self.draw_masks(image, masks),
      None => self.draw_boxes(image, result.boxes()),
    }
  }

  /// 绘制检测框，返回新图像
  pub fn draw_boxes(&self, image: &RgbaImage, boxes: &[BoundingBox]) -> RgbaImage {
    let mut canvas = image.clone();
    self.draw_boxes_mut(&mut canvas, boxes);
    canvas
  }

  /// 坐标总是按当前图像尺寸重新换算
  pub fn draw_boxes_mut(&self, image: &mut RgbaImage, boxes: &[BoundingBox]) {
    let (width, height) = image.dimensions();
    for (i, bbox) in boxes.iter().enumerate() {
      let color = self.palette.color(i);
      let [x1, y1, x2, y2] = bbox.to_absolute(width, height);
      let (left, top, right, bottom) = normalize(x1, y1, x2, y2);
      self.stroke_rect(image, left, top, right, bottom, color);

      // 检测模式下标签位于框内左上角
      if let Some(label) = self.visible_label(bbox.label.as_deref()) {
        self.draw_label(
          image,
          label,
          left.saturating_add(LABEL_OFFSET_X),
          top.saturating_add(LABEL_GAP_Y),
          color,
        );
      }
    }
  }

  /// 叠加分割掩码，再在上面绘制检测框与标签，返回新图像
  pub fn draw_masks(&self, image: &RgbaImage, masks: &[SegmentationMask]) -> RgbaImage {
    let mut canvas = image.clone();
    self.draw_masks_mut(&mut canvas, masks);
    canvas
  }

  pub fn draw_masks_mut(&self, image: &mut RgbaImage, masks: &[SegmentationMask]) {
    let (width, height) = image.dimensions();
    let alpha = self.style.alpha.clamp(0.0, 1.0) as f64;

    let fitted: Vec<Option<Cow<'_, SegmentationMask>>> = masks
      .iter()
      .map(|mask| fit_mask(mask, width, height))
      .collect();

    // 先叠加全部掩码，边框与标签随后绘制在最上层
    for (i, mask) in fitted.iter().enumerate() {
      if let Some(mask) = mask {
        overlay_mask(image, &mask.mask, self.palette.color(i), alpha);
      }
    }

    for (i, mask) in fitted.iter().enumerate() {
      let Some(mask) = mask else { continue };
      let color = self.palette.color(i);
      let (left, top, right, bottom) = normalize(mask.x0, mask.y0, mask.x1, mask.y1);
      self.stroke_rect(image, left, top, right, bottom, color);

      // 分割模式下标签位于框的上方
      if let Some(label) = self.visible_label(mask.label.as_deref()) {
        let y = top.saturating_sub(LABEL_GAP_Y + self.style.font_size.round() as i32);
        self.draw_label(image, label, left.saturating_add(LABEL_OFFSET_X), y, color);
      }
    }
  }

  fn visible_label<'l>(&self, label: Option<&'l str>) -> Option<&'l str> {
    label.filter(|l| self.style.show_labels && !l.is_empty())
  }

  // 描边以路径为中心，线宽为 `line_width`
  fn stroke_rect(
    &self,
    image: &mut RgbaImage,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: Rgb<u8>,
  ) {
    let line = self.style.line_width.min(MAX_LINE_WIDTH) as i32;
    if line == 0 {
      return;
    }
    let half = line / 2;
    let paint = opaque(color);
    let span_w = right.saturating_sub(left).saturating_add(line) as u32;
    let span_h = bottom.saturating_sub(top).saturating_add(line) as u32;
    let (outer_x, outer_y) = (left.saturating_sub(half), top.saturating_sub(half));

    let bands = [
      Rect::at(outer_x, outer_y).of_size(span_w, line as u32),
      Rect::at(outer_x, bottom.saturating_sub(half)).of_size(span_w, line as u32),
      Rect::at(outer_x, outer_y).of_size(line as u32, span_h),
      Rect::at(right.saturating_sub(half), outer_y).of_size(line as u32, span_h),
    ];
    for band in bands {
      draw_filled_rect_mut(image, band, paint);
    }
  }

  fn draw_label(&self, image: &mut RgbaImage, label: &str, x: i32, y: i32, color: Rgb<u8>) {
    let scale = PxScale::from(self.style.font_size);
    draw_text_mut(image, opaque(color), x, y, scale, &self.font, label);
  }
}

fn opaque(color: Rgb<u8>) -> Rgba<u8> {
  Rgba([color[0], color[1], color[2], 255])
}

fn normalize(x1: i32, y1: i32, x2: i32, y2: i32) -> (i32, i32, i32, i32) {
  (x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
}

/// 逐像素混合：`out = round(src * (1 - w) + color * w)`，`w = mask / 255 * alpha`
///
/// 只修改 RGB，alpha 通道保持不变。
fn overlay_mask(image: &mut RgbaImage, mask: &[u8], color: Rgb<u8>, alpha: f64) {
  for (pixel, &value) in image.pixels_mut().zip(mask.iter()) {
    if value == 0 {
      continue;
    }
    let weight = value as f64 / 255.0 * alpha;
    for c in 0..3 {
      let blended = pixel[c] as f64 * (1.0 - weight) + color[c] as f64 * weight;
      pixel[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
  }
}

/// 掩码与目标图像尺寸不同时，按最近邻缩放掩码并同比例缩放角点
fn fit_mask(mask: &SegmentationMask, width: u32, height: u32) -> Option<Cow<'_, SegmentationMask>> {
  if mask.mask.len() != (mask.width as usize) * (mask.height as usize) {
    warn!(
      "掩码数据长度 {} 与尺寸 {}x{} 不符，跳过",
      mask.mask.len(),
      mask.width,
      mask.height
    );
    return None;
  }
  if (mask.width, mask.height) == (width, height) {
    return Some(Cow::Borrowed(mask));
  }
  if mask.width == 0 || mask.height == 0 {
    return None;
  }

  debug!(
    "缩放掩码 {}x{} -> {}x{}",
    mask.width, mask.height, width, height
  );
  let gray = GrayImage::from_raw(mask.width, mask.height, mask.mask.to_vec())?;
  let resized = image::imageops::resize(&gray, width, height, FilterType::Nearest);

  let sx = width as f64 / mask.width as f64;
  let sy = height as f64 / mask.height as f64;
  let scale = |v: i32, s: f64| (v as f64 * s + 0.5).floor() as i32;

  Some(Cow::Owned(SegmentationMask {
    y0: scale(mask.y0, sy),
    x0: scale(mask.x0, sx),
    y1: scale(mask.y1, sy),
    x1: scale(mask.x1, sx),
    width,
    height,
    mask: resized.into_raw().into_boxed_slice(),
    label: mask.label.clone(),
  }))
}
