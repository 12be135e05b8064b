// 该文件是 VSegments 项目的一部分。
// src/transport/gemini.rs - Google Gemini REST 接口
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

use std::time::{Duration, Instant};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::transport::{GenerateRequest, Transport, TransportError};

pub const DEFAULT_MODEL: &str = "gemini-flash-latest";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/";

const API_KEY_HEADER: &str = "x-goog-api-key";
const USER_ROLE: &str = "user";
const SAFETY_SETTINGS: [SafetySetting; 1] = [SafetySetting {
  category: "HARM_CATEGORY_DANGEROUS_CONTENT",
  threshold: "BLOCK_ONLY_HIGH",
}];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
  contents: [Content<'a>; 1],
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<SystemInstruction<'a>>,
  generation_config: GenerationConfig,
  safety_settings: [SafetySetting; 1],
}

#[derive(Serialize)]
struct Content<'a> {
  role: &'a str,
  parts: [Part<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
  Text {
    text: &'a str,
  },
  InlineData {
    #[serde(rename = "inlineData")]
    inline_data: InlineData<'a>,
  },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
  mime_type: &'a str,
  data: String,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
  parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
  text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
  temperature: f32,
}

#[derive(Serialize)]
struct SafetySetting {
  category: &'static str,
  threshold: &'static str,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
  text: Option<String>,
  #[serde(default)]
  thought: bool,
}

impl<'a> GenerateContentRequest<'a> {
  fn from_request(request: &GenerateRequest<'a>) -> Self {
    GenerateContentRequest {
      contents: [Content {
        role: USER_ROLE,
        parts: [
          Part::Text {
            text: request.prompt,
          },
          Part::InlineData {
            inline_data: InlineData {
              mime_type: request.mime_type,
              data: STANDARD.encode(request.image),
            },
          },
        ],
      }],
      system_instruction: request.system_instructions.map(|text| SystemInstruction {
        parts: [TextPart { text }],
      }),
      generation_config: GenerationConfig {
        temperature: request.temperature,
      },
      safety_settings: SAFETY_SETTINGS,
    }
  }
}

impl GenerateContentResponse {
  /// 第一个候选结果中所有非思考文本的拼接
  fn into_text(self) -> Result<String, TransportError> {
    let text: String = self
      .candidates
      .into_iter()
      .next()
      .and_then(|candidate| candidate.content)
      .map(|content| {
        content
          .parts
          .into_iter()
          .filter(|part| !part.thought)
          .filter_map(|part| part.text)
          .collect()
      })
      .unwrap_or_default();

    if text.is_empty() {
      return Err(TransportError::EmptyResponse);
    }
    Ok(text)
  }
}

pub struct GeminiTransportBuilder {
  api_key: Option<String>,
  model: String,
  endpoint: String,
  timeout: Option<Duration>,
}

impl Default for GeminiTransportBuilder {
  fn default() -> Self {
    Self {
      api_key: None,
      model: DEFAULT_MODEL.to_string(),
      endpoint: DEFAULT_ENDPOINT.to_string(),
      timeout: None,
    }
  }
}

impl GeminiTransportBuilder {
  pub fn api_key(mut self, api_key: Option<String>) -> Self {
    self.api_key = api_key;
    self
  }

  pub fn model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }

  pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
    self.endpoint = endpoint.into();
    self
  }

  pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn build(self) -> Result<GeminiTransport, TransportError> {
    let api_key = self
      .api_key
      .filter(|key| !key.trim().is_empty())
      .ok_or(TransportError::MissingApiKey)?;

    let mut endpoint = Url::parse(&self.endpoint)?;
    if !endpoint.path().ends_with('/') {
      let path = format!("{}/", endpoint.path());
      endpoint.set_path(&path);
    }
    let url = endpoint.join(&format!("models/{}:generateContent", self.model))?;
    debug!("模型接口地址: {}", url);

    let mut agent = ureq::AgentBuilder::new();
    if let Some(timeout) = self.timeout {
      agent = agent.timeout(timeout);
    }

    Ok(GeminiTransport {
      agent: agent.build(),
      api_key,
      model: self.model,
      url,
    })
  }
}

pub struct GeminiTransport {
  agent: ureq::Agent,
  api_key: String,
  model: String,
  url: Url,
}

impl GeminiTransport {
  pub fn builder() -> GeminiTransportBuilder {
    GeminiTransportBuilder::default()
  }

  pub fn model(&self) -> &str {
    &self.model
  }

  pub fn url(&self) -> &Url {
    &self.url
  }
}

impl Transport for GeminiTransport {
  fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, TransportError> {
    let body = GenerateContentRequest::from_request(request);

    info!(
      "请求模型 {}: 图像 {} 字节 ({})",
      self.model,
      request.image.len(),
      request.mime_type
    );
    let now = Instant::now();

    let response = match self
      .agent
      .post(self.url.as_str())
      .set(API_KEY_HEADER, &self.api_key)
      .send_json(&body)
    {
      Ok(response) => response,
      Err(ureq::Error::Status(status, response)) => {
        let message = response.into_string().unwrap_or_default();
        warn!("模型请求失败，状态码 {}: {}", status, message);
        return Err(TransportError::from_status(status, message));
      }
      Err(ureq::Error::Transport(transport)) => {
        warn!("模型请求网络错误: {}", transport);
        return Err(TransportError::Network(transport.to_string()));
      }
    };

    let parsed: GenerateContentResponse = response
      .into_json()
      .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
    info!("模型响应完成，耗时: {:.2?}", now.elapsed());

    parsed.into_text()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::{Value, json};

  fn request(system_instructions: Option<&str>) -> GenerateRequest<'_> {
    GenerateRequest {
      image: b"abc",
      mime_type: "image/png",
      prompt: "Detect the 2d bounding boxes",
      system_instructions,
      temperature: 0.5,
    }
  }

  #[test]
  fn test_request_body_shape() {
    let body = serde_json::to_value(GenerateContentRequest::from_request(&request(Some("be brief"))))
      .unwrap();
    assert_eq!(
      body,
      json!({
        "contents": [{
          "role": "user",
          "parts": [
            {"text": "Detect the 2d bounding boxes"},
            {"inlineData": {"mimeType": "image/png", "data": "YWJj"}}
          ]
        }],
        "systemInstruction": {"parts": [{"text": "be brief"}]},
        "generationConfig": {"temperature": 0.5},
        "safetySettings": [
          {"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_ONLY_HIGH"}
        ]
      })
    );
  }

  #[test]
  fn test_request_without_system_instructions() {
    let body: Value =
      serde_json::to_value(GenerateContentRequest::from_request(&request(None))).unwrap();
    assert!(body.get("systemInstruction").is_none());
  }

  #[test]
  fn test_response_text_joins_parts() {
    let response: GenerateContentResponse = serde_json::from_value(json!({
      "candidates": [
        {"content": {"parts": [
          {"text": "thinking...", "thought": true},
          {"text": "```json\n["},
          {"text": "]\n```"}
        ]}},
        {"content": {"parts": [{"text": "ignored"}]}}
      ]
    }))
    .unwrap();
    assert_eq!(response.into_text().unwrap(), "```json\n[]\n```");
  }

  #[test]
  fn test_response_without_text() {
    let response: GenerateContentResponse =
      serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
    assert!(matches!(response.into_text(), Err(TransportError::EmptyResponse)));

    let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
    assert!(matches!(response.into_text(), Err(TransportError::EmptyResponse)));
  }

  #[test]
  fn test_builder_requires_api_key() {
    assert!(matches!(
      GeminiTransport::builder().build(),
      Err(TransportError::MissingApiKey)
    ));
    assert!(matches!(
      GeminiTransport::builder().api_key(Some("  ".into())).build(),
      Err(TransportError::MissingApiKey)
    ));
  }

  #[test]
  fn test_builder_url() {
    let transport = GeminiTransport::builder()
      .api_key(Some("key".into()))
      .model("gemini-test")
      .endpoint("http://localhost:8080/v1beta")
      .build()
      .unwrap();
    assert_eq!(
      transport.url().as_str(),
      "http://localhost:8080/v1beta/models/gemini-test:generateContent"
    );
    assert_eq!(transport.model(), "gemini-test");
  }

  #[test]
  fn test_builder_rejects_bad_endpoint() {
    let result = GeminiTransport::builder()
      .api_key(Some("key".into()))
      .endpoint("not a url")
      .build();
    assert!(matches!(result, Err(TransportError::Endpoint(_))));
  }
}
