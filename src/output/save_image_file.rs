// 该文件是 VSegments 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use image::{ImageFormat, RgbaImage};
use tracing::info;

use crate::{
  model::SegmentationResult,
  output::{OutputError, Render, draw::Draw},
};

/// 将结果绘制到图像上并以 PNG 格式写入文件
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>, draw: Draw) -> Self {
    Self {
      path: path.into(),
      draw,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn save_image(&self, image: &RgbaImage) -> Result<(), OutputError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save_with_format(&self.path, ImageFormat::Png)?;

    info!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<RgbaImage, SegmentationResult> for SaveImageFileOutput {
  type Error = OutputError;

  fn render_result(&self, frame: &RgbaImage, result: &SegmentationResult) -> Result<(), Self::Error> {
    let image = self.draw.draw_result(frame, result);
    self.save_image(&image)
  }
}
