// 该文件是 VSegments 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::{
  borrow::Cow,
  io::Cursor,
  path::{Path, PathBuf},
};

use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage, imageops::FilterType};
use tracing::{debug, error};

use crate::input::{InputError, fit_dimensions, mime_type};

// 缩小图像时使用的插值方式
const DOWNSCALE_FILTER: FilterType = FilterType::Triangle;

/// 已读入内存的图像文件，保留原始字节用于请求
pub struct ImageFileInput {
  path: PathBuf,
  bytes: Vec<u8>,
  image: DynamicImage,
}

impl ImageFileInput {
  /// 文件不存在时立即返回 [`InputError::AssetNotFound`]
  pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
    let path = path.as_ref();
    if !path.is_file() {
      error!("找不到图像文件: {}", path.display());
      return Err(InputError::AssetNotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let image = ImageReader::new(Cursor::new(&bytes))
      .with_guessed_format()?
      .decode()?;
    debug!(
      "读取图像 {}: {}x{}, {} 字节",
      path.display(),
      image.width(),
      image.height(),
      bytes.len()
    );

    Ok(ImageFileInput {
      path: path.to_path_buf(),
      bytes,
      image,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn mime_type(&self) -> &'static str {
    mime_type(&self.path)
  }

  /// 发送给模型的图像数据与 MIME 类型
  ///
  /// 图像超过 `max_size` 时缩小后重新编码为 PNG，否则直接使用原始文件字节。
  pub fn request_payload(&self, max_size: u32) -> Result<(Cow<'_, [u8]>, &'static str), InputError> {
    let (width, height) = fit_dimensions(self.width(), self.height(), max_size);
    if (width, height) == (self.width(), self.height()) {
      return Ok((Cow::Borrowed(&self.bytes), self.mime_type()));
    }

    debug!(
      "请求图像缩小: {}x{} -> {}x{}",
      self.width(),
      self.height(),
      width,
      height
    );
    let resized = self.image.resize_exact(width, height, DOWNSCALE_FILTER);
    let mut encoded = Vec::new();
    resized.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;
    Ok((Cow::Owned(encoded), "image/png"))
  }

  /// 用于绘制的 RGBA 图像，两边都不超过 `max_size`
  pub fn display_image(&self, max_size: u32) -> RgbaImage {
    let (width, height) = fit_dimensions(self.width(), self.height(), max_size);
    if (width, height) == (self.width(), self.height()) {
      return self.image.to_rgba8();
    }
    self
      .image
      .resize_exact(width, height, DOWNSCALE_FILTER)
      .to_rgba8()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn write_png(name: &str, width: u32, height: u32) -> PathBuf {
    let path = std::env::temp_dir().join(format!("vsegments-{}-{}.png", name, std::process::id()));
    RgbImage::from_pixel(width, height, Rgb([10, 20, 30]))
      .save(&path)
      .unwrap();
    path
  }

  #[test]
  fn test_missing_file() {
    let err = ImageFileInput::open("/definitely/not/here.png").err().unwrap();
    assert!(matches!(err, InputError::AssetNotFound(_)));
  }

  #[test]
  fn test_small_image_sends_original_bytes() {
    let path = write_png("small", 40, 30);
    let input = ImageFileInput::open(&path).unwrap();
    let (bytes, mime) = input.request_payload(1024).unwrap();
    assert_eq!(mime, "image/png");
    assert_eq!(bytes.as_ref(), std::fs::read(&path).unwrap().as_slice());
    std::fs::remove_file(&path).unwrap();
  }

  #[test]
  fn test_large_image_is_downscaled() {
    let path = write_png("large", 200, 100);
    let input = ImageFileInput::open(&path).unwrap();
    assert_eq!((input.width(), input.height()), (200, 100));

    let (bytes, mime) = input.request_payload(50).unwrap();
    assert_eq!(mime, "image/png");
    let sent = image::load_from_memory(&bytes).unwrap();
    assert_eq!((sent.width(), sent.height()), (50, 25));

    let display = input.display_image(100);
    assert_eq!(display.dimensions(), (100, 50));
    assert_eq!(input.display_image(2048).dimensions(), (200, 100));
    std::fs::remove_file(&path).unwrap();
  }
}
