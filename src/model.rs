// 该文件是 VSegments 项目的一部分。
// src/model.rs - 检测与分割结果的数据模型
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

/// 归一化坐标的取值上限，模型输出的坐标位于 `[0, 1000]`
pub const NORMALIZED_SCALE: f64 = 1000.0;

/// 将归一化坐标换算为像素坐标，与 `Math.round` 一致（半数向正无穷取整）
pub fn to_pixel(normalized: f64, dimension: u32) -> i32 {
  (normalized / NORMALIZED_SCALE * dimension as f64 + 0.5).floor() as i32
}

/// 带标签的检测框，坐标为归一化坐标，字段顺序沿用模型输出的 y 在前约定
///
/// 不要求 `y1 < y2` 或 `x1 < x2`，模型可能给出退化或颠倒的框。
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
  pub label: Option<String>,
  pub y1: f64,
  pub x1: f64,
  pub y2: f64,
  pub x2: f64,
}

impl BoundingBox {
  pub fn new(label: Option<String>, y1: f64, x1: f64, y2: f64, x2: f64) -> Self {
    Self {
      label,
      y1,
      x1,
      y2,
      x2,
    }
  }

  /// 由模型输出的 `[y1, x1, y2, x2]` 数组构造
  pub fn from_yxyx(label: Option<String>, yxyx: [f64; 4]) -> Self {
    Self::new(label, yxyx[0], yxyx[1], yxyx[2], yxyx[3])
  }

  /// 按目标图像尺寸换算为像素坐标，返回 `[x1, y1, x2, y2]`
  pub fn to_absolute(&self, width: u32, height: u32) -> [i32; 4] {
    [
      to_pixel(self.x1, width),
      to_pixel(self.y1, height),
      to_pixel(self.x2, width),
      to_pixel(self.y2, height),
    ]
  }

  /// 导出时使用的 `[y1, x1, y2, x2]` 顺序
  pub fn to_yxyx(&self) -> [f64; 4] {
    [self.y1, self.x1, self.y2, self.x2]
  }

  pub fn label_str(&self) -> &str {
    self.label.as_deref().unwrap_or_default()
  }
}

/// 单个对象的分割掩码
///
/// `mask` 覆盖整幅图像（`width * height`，行优先，每像素一字节），
/// 对象框以外的字节恒为零。角点为像素坐标。
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
  pub y0: i32,
  pub x0: i32,
  pub y1: i32,
  pub x1: i32,
  pub width: u32,
  pub height: u32,
  pub mask: Box<[u8]>,
  pub label: Option<String>,
}

impl SegmentationMask {
  /// 读取 `(x, y)` 处的不透明度，越界时为零
  pub fn value_at(&self, x: u32, y: u32) -> u8 {
    if x >= self.width || y >= self.height {
      return 0;
    }
    self.mask[(y as usize) * (self.width as usize) + (x as usize)]
  }

  /// 框角点，`[x0, y0, x1, y1]`
  pub fn corners(&self) -> [i32; 4] {
    [self.x0, self.y0, self.x1, self.y1]
  }

  pub fn label_str(&self) -> &str {
    self.label.as_deref().unwrap_or_default()
  }
}

/// 一次检测或分割调用的结果，构造后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationResult {
  boxes: Box<[BoundingBox]>,
  masks: Option<Box<[SegmentationMask]>>,
  raw_response: Option<String>,
}

impl SegmentationResult {
  pub fn new(
    boxes: Vec<BoundingBox>,
    masks: Option<Vec<SegmentationMask>>,
    raw_response: Option<String>,
  ) -> Self {
    Self {
      boxes: boxes.into_boxed_slice(),
      masks: masks.map(Vec::into_boxed_slice),
      raw_response,
    }
  }

  pub fn boxes(&self) -> &[BoundingBox] {
    &self.boxes
  }

  /// 仅在执行分割时存在
  pub fn masks(&self) -> Option<&[SegmentationMask]> {
    self.masks.as_deref()
  }

  pub fn raw_response(&self) -> Option<&str> {
    self.raw_response.as_deref()
  }

  /// 检测到的对象数量
  pub fn count(&self) -> usize {
    self.boxes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.boxes.is_empty()
  }
}
