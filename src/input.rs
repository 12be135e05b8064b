// 该文件是 VSegments 项目的一部分。
// src/input.rs - 图像输入
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

use std::path::{Path, PathBuf};

use thiserror::Error;

mod read_image_file;
pub use self::read_image_file::ImageFileInput;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("找不到图像文件: {}", .0.display())]
  AssetNotFound(PathBuf),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 根据扩展名推断 MIME 类型，未知扩展名按 JPEG 处理
pub fn mime_type(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase);
  match ext.as_deref() {
    Some("png") => "image/png",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    _ => "image/jpeg",
  }
}

/// 等比缩小到两边都不超过 `max_size`，从不放大；`max_size` 为 0 表示不限制
pub fn fit_dimensions(width: u32, height: u32, max_size: u32) -> (u32, u32) {
  if max_size == 0 || (width <= max_size && height <= max_size) {
    return (width, height);
  }
  let scale = f64::min(
    max_size as f64 / width as f64,
    max_size as f64 / height as f64,
  );
  let fit = |v: u32| ((v as f64 * scale).round() as u32).clamp(1, max_size);
  (fit(width), fit(height))
}
