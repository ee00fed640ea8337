//! Backends the widget session talks to
//!
//! The session only needs "send this text, get a reply" and "speak this
//! text, get audio". Both can be served in-process by the orchestrator and
//! proxy, or remotely through the `/chat` and `/speech` endpoints.

use crate::llm::prompts::{NETWORK_ERROR_MESSAGE, TRANSPORT_FAILURE_MESSAGE};
use crate::llm::CompletionOrchestrator;
use crate::speech::{
    SpeechSynthesisProxy, SynthesisFailure, SynthesizedAudio, DEFAULT_AUDIO_CONTENT_TYPE,
};
use crate::{ParleyError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// What the chat backend answered for one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Reply(String),
    /// Already phrased for the user
    Error(String),
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, message: &str) -> ChatReply;
}

#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn speak(&self, text: &str) -> std::result::Result<SynthesizedAudio, SynthesisFailure>;
}

#[async_trait]
impl ChatBackend for CompletionOrchestrator {
    async fn chat(&self, message: &str) -> ChatReply {
        let outcome = self.complete(message).await;
        if outcome.is_success() {
            ChatReply::Reply(outcome.user_message().to_string())
        } else {
            ChatReply::Error(outcome.user_message().to_string())
        }
    }
}

#[async_trait]
impl SpeechBackend for SpeechSynthesisProxy {
    async fn speak(&self, text: &str) -> std::result::Result<SynthesizedAudio, SynthesisFailure> {
        self.synthesize(text).await
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SpeechRequestBody {
    pub text: String,
}

/// `{response}` on success, `{error}` otherwise
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatResponseBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponseBody {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            error: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            response: None,
            error: Some(text.into()),
        }
    }
}

/// Widget-side client for a running parley server
#[derive(Debug, Clone)]
pub struct HttpWidgetClient {
    client: Client,
    base_url: String,
}

impl HttpWidgetClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ParleyError::HttpClientError(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl ChatBackend for HttpWidgetClient {
    async fn chat(&self, message: &str) -> ChatReply {
        let request = ChatRequestBody {
            message: message.to_string(),
        };

        let response = match self.client.post(self.url("chat")).json(&request).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Chat endpoint unreachable: {}", e);
                return ChatReply::Error(NETWORK_ERROR_MESSAGE.to_string());
            }
        };

        let status = response.status();
        let body = match response.json::<ChatResponseBody>().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Chat endpoint returned {} with an unreadable body: {}", status, e);
                return ChatReply::Error(NETWORK_ERROR_MESSAGE.to_string());
            }
        };

        match (status.is_success(), body.response, body.error) {
            (true, Some(reply), _) => ChatReply::Reply(reply),
            (_, _, Some(error)) => ChatReply::Error(error),
            _ => ChatReply::Error(TRANSPORT_FAILURE_MESSAGE.to_string()),
        }
    }
}

#[async_trait]
impl SpeechBackend for HttpWidgetClient {
    async fn speak(&self, text: &str) -> std::result::Result<SynthesizedAudio, SynthesisFailure> {
        let request = SpeechRequestBody {
            text: text.to_string(),
        };

        let response = self
            .client
            .post(self.url("speech"))
            .json(&request)
            .send()
            .await
            .map_err(|e| SynthesisFailure::new(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_AUDIO_CONTENT_TYPE)
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| SynthesisFailure::new(e.to_string()).with_status(status.as_u16()))?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ChatResponseBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("Speech endpoint returned {}", status));
            return Err(SynthesisFailure::new(detail).with_status(status.as_u16()));
        }

        debug!("Received {} bytes of {}", body.len(), content_type);
        Ok(SynthesizedAudio::new(body, content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_body_skips_empty_fields() {
        let json = serde_json::to_value(ChatResponseBody::reply("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"response": "hello"}));

        let json = serde_json::to_value(ChatResponseBody::error("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "nope"}));
    }

    #[test]
    fn test_client_url_joining() {
        let client = HttpWidgetClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.url("chat"), "http://localhost:3000/chat");
    }

    #[tokio::test]
    async fn test_unreachable_server_yields_network_error() {
        // Reserve a port, then free it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpWidgetClient::new(format!("http://{}", addr)).unwrap();
        assert_eq!(
            client.chat("hello").await,
            ChatReply::Error(NETWORK_ERROR_MESSAGE.to_string())
        );
    }
}
