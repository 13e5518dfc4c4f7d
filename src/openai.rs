//! Minimal OpenAI-compatible chat.completions client.
//!
//! We only request plain text; the generation adapter does its own (defensive) JSON
//! extraction from the reply. Calls are instrumented and log model name, latency and
//! response size (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::GenerationError;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  ///   OPENAI_BASE_URL : default "https://api.openai.com/v1"
  ///   OPENAI_MODEL    : default "gpt-4o-mini"
  pub fn from_env(timeout: Duration) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    match Self::new(api_key, base_url, model, timeout) {
      Ok(oa) => Some(oa),
      Err(e) => {
        error!(target: "etea_backend", error = %e, "Failed to build HTTP client; generation disabled");
        None
      }
    }
  }

  pub fn new(
    api_key: impl Into<String>,
    base_url: impl Into<String>,
    model: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      api_key: api_key.into(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
      model: model.into(),
    })
  }

  /// Plain-text chat completion with one system and one user message.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  pub async fn chat_plain(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatRequest {
      model: &self.model,
      messages: [
        ChatMessage { role: "system", content: system },
        ChatMessage { role: "user", content: user },
      ],
      temperature,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "etea-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| GenerationError::Upstream(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(GenerationError::Upstream(format!("HTTP {}: {}", status, msg)));
    }

    let body: ChatResponse = res.json().await
      .map_err(|e| GenerationError::Upstream(format!("unreadable completion body: {e}")))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    info!(elapsed = ?start.elapsed(), reply_len = text.len(), "Model response received");
    Ok(text)
  }
}

// Wire shapes. Only the fields we read are modeled.

#[derive(Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: [ChatMessage<'a>; 2],
  temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role: &'static str,
  content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
  #[serde(default)]
  usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
  message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
  #[serde(default)]
  content: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Usage {
  prompt_tokens: Option<u32>,
  completion_tokens: Option<u32>,
  total_tokens: Option<u32>,
}

/// `{"error": {"message": ...}}` as sent by OpenAI-compatible servers.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct Envelope {
    error: Detail,
  }
  #[derive(Deserialize)]
  struct Detail {
    message: String,
  }
  serde_json::from_str::<Envelope>(body).ok().map(|e| e.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_error_message() {
    let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Incorrect API key provided"));
    assert_eq!(extract_openai_error("<html>bad gateway</html>"), None);
  }

  #[test]
  fn request_shape() {
    let req = ChatRequest {
      model: "m",
      messages: [ChatMessage { role: "system", content: "s" }, ChatMessage { role: "user", content: "u" }],
      temperature: 0.5,
    };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["messages"][1]["role"], "user");
    assert_eq!(v["temperature"], 0.5);
  }

  #[test]
  fn reply_without_content_is_tolerated() {
    let r: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
    assert!(r.choices[0].message.content.is_none());
    assert!(r.usage.is_none());
  }

  #[test]
  fn base_url_trailing_slash_is_trimmed() {
    let oa = OpenAI::new("k", "http://localhost:1/v1/", "m", Duration::from_secs(1)).unwrap();
    assert_eq!(oa.base_url, "http://localhost:1/v1");
  }
}
