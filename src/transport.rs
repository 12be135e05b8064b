// 该文件是 VSegments 项目的一部分。
// src/transport.rs - 生成式模型调用接口
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

use thiserror::Error;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "gemini")]
pub use self::gemini::{GeminiTransport, GeminiTransportBuilder};

/// 一次生成请求：一张图像加一段提示词
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
  pub image: &'a [u8],
  pub mime_type: &'a str,
  pub prompt: &'a str,
  pub system_instructions: Option<&'a str>,
  pub temperature: f32,
}

/// 给定图像与提示词，返回模型的文本输出
///
/// 实现方不做重试，由调用方根据 [`TransportError::is_retryable`] 决定。
pub trait Transport {
  fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
  fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, TransportError> {
    (**self).generate(request)
  }
}

#[derive(Error, Debug)]
pub enum TransportError {
  #[error("模型服务端错误 ({status})，可能是暂时性问题，请稍后重试或检查 API 密钥与图像: {message}")]
  Server { status: u16, message: String },
  #[error("模型请求失败 ({status}): {message}")]
  Status { status: u16, message: String },
  #[error("网络错误: {0}")]
  Network(String),
  #[error("无法解析模型响应: {0}")]
  InvalidResponse(String),
  #[error("模型响应中没有文本内容")]
  EmptyResponse,
  #[error("必须提供 API 密钥或设置 GOOGLE_API_KEY 环境变量")]
  MissingApiKey,
  #[error("无效的服务地址: {0}")]
  Endpoint(#[from] url::ParseError),
}

impl TransportError {
  /// 服务端错误（HTTP 5xx），调用方可以重试
  pub fn is_retryable(&self) -> bool {
    matches!(self, TransportError::Server { .. })
  }

  /// 按 HTTP 状态码归类
  pub fn from_status(status: u16, message: String) -> Self {
    if (500..600).contains(&status) {
      TransportError::Server { status, message }
    } else {
      TransportError::Status { status, message }
    }
  }
}
