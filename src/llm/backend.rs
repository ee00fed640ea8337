//! Wire format and transport for the upstream completion service

use crate::llm::config::CompletionConfig;
use crate::{ParleyError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Single-turn chat completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl CompletionRequest {
    /// Build a request for one assistant turn answering `message`
    pub fn single_turn(config: &CompletionConfig, message: &str) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![ChatTurn {
                role: "user".to_string(),
                content: message.to_string(),
            }],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }
}

/// Raw answer from the upstream service, before classification
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

impl UpstreamReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Response body of a chat completion call.
///
/// `error` is kept loose: OpenAI sends an object, some hosted inference
/// services send a bare string such as "Model is currently loading".
#[derive(Debug, Deserialize)]
pub struct CompletionBody {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<Value>,
}

impl CompletionBody {
    /// The first choice's content, if it is a string
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_ref())
            .and_then(Value::as_str)
    }

    /// `error.type` or `error.code` equals `rate_limit_exceeded`
    pub fn is_rate_limited(&self) -> bool {
        match &self.error {
            Some(Value::Object(err)) => ["type", "code"].iter().any(|key| {
                err.get(*key).and_then(Value::as_str) == Some("rate_limit_exceeded")
            }),
            _ => false,
        }
    }

    /// The service reports that the model is still being loaded
    pub fn is_loading(&self) -> bool {
        let message = match &self.error {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Object(err)) => err.get("message").and_then(Value::as_str),
            _ => None,
        };
        message
            .map(|m| m.to_ascii_lowercase().contains("loading"))
            .unwrap_or(false)
    }
}

/// Transport seam for the completion service.
///
/// An `Err` means the call never produced an HTTP answer.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn send(&self, request: &CompletionRequest) -> Result<UpstreamReply>;
}

/// `reqwest`-backed transport for OpenAI-compatible endpoints
#[derive(Debug, Clone)]
pub struct HttpCompletionBackend {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpCompletionBackend {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ParleyError::HttpClientError(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn send(&self, request: &CompletionRequest) -> Result<UpstreamReply> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("Completion service answered {} ({} bytes)", status, body.len());

        Ok(UpstreamReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> CompletionBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_single_turn_request_shape() {
        let config = CompletionConfig::default();
        let request = CompletionRequest::single_turn(&config, "hello there");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello there");
        assert_eq!(json["max_tokens"], 512);
    }

    #[test]
    fn test_content_extraction() {
        let body = parse(json!({"choices": [{"message": {"content": "  hi  "}}]}));
        assert_eq!(body.content(), Some("  hi  "));

        let body = parse(json!({"choices": [{"message": {"content": null}}]}));
        assert_eq!(body.content(), None);

        let body = parse(json!({"choices": []}));
        assert_eq!(body.content(), None);
    }

    #[test]
    fn test_rate_limit_detection() {
        let body = parse(json!({"error": {"type": "rate_limit_exceeded", "message": "slow down"}}));
        assert!(body.is_rate_limited());

        let body = parse(json!({"error": {"code": "rate_limit_exceeded", "type": "requests"}}));
        assert!(body.is_rate_limited());

        let body = parse(json!({"error": {"type": "invalid_request_error"}}));
        assert!(!body.is_rate_limited());
    }

    #[test]
    fn test_loading_detection() {
        let body = parse(json!({"error": "Model gpt2 is currently loading", "estimated_time": 20.0}));
        assert!(body.is_loading());
        assert!(!body.is_rate_limited());

        let body = parse(json!({"error": {"message": "Model is Loading"}}));
        assert!(body.is_loading());
    }
}
