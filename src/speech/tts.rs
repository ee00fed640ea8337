//! Text-to-speech proxy for the ElevenLabs synthesis API
//!
//! Turns text into one raw audio payload. Failures come back as a
//! `SynthesisFailure` value and are never retried.

use crate::speech::voices::{VoiceInfo, VoiceSelector};
use crate::{ParleyError, Result};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_SYNTHESIS_URL: &str = "https://api.elevenlabs.io/v1";

/// "Rachel"
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

const FALLBACK_FAILURE_DETAIL: &str = "Speech synthesis failed";

/// Configuration for the synthesis proxy
#[derive(Clone, Debug)]
pub struct TTSConfig {
    /// API base URL without trailing slash
    pub base_url: String,

    /// Value of the `xi-api-key` header
    pub api_key: String,

    /// Voice used for every request
    pub voice_id: String,

    /// Synthesis model
    pub model_id: String,

    /// Voice stability (0.0 - 1.0)
    pub stability: f32,

    /// Similarity boost (0.0 - 1.0)
    pub similarity_boost: f32,

    /// Ranked voice preferences, resolved against the provider's voice list at startup
    pub voice_preferences: Vec<String>,

    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SYNTHESIS_URL.to_string(),
            api_key: String::new(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            voice_preferences: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl TTSConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_voice_preferences(mut self, preferences: Vec<String>) -> Self {
        self.voice_preferences = preferences;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Raw audio returned by the synthesis service, untouched
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesizedAudio {
    pub bytes: Bytes,
    pub content_type: String,
}

impl SynthesizedAudio {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The voice provider rejected or failed the request
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("speech synthesis failed: {detail}")]
pub struct SynthesisFailure {
    pub detail: String,
    /// HTTP status if the provider answered at all
    pub status: Option<u16>,
}

impl SynthesisFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Deserialize)]
struct VoiceListing {
    #[serde(default)]
    voices: Vec<VoiceInfo>,
}

/// Pull the provider's explanation out of an error body.
///
/// Accepts `{"detail": {"message": ..}}` and `{"detail": ".."}`.
pub fn extract_failure_detail(body: &[u8]) -> String {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return FALLBACK_FAILURE_DETAIL.to_string(),
    };

    match value.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::Object(detail)) => detail
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(FALLBACK_FAILURE_DETAIL)
            .to_string(),
        _ => FALLBACK_FAILURE_DETAIL.to_string(),
    }
}

/// Proxy in front of the voice synthesis service
#[derive(Debug, Clone)]
pub struct SpeechSynthesisProxy {
    config: TTSConfig,
    client: Client,
}

impl SpeechSynthesisProxy {
    pub fn new(config: TTSConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ParleyError::HttpClientError(format!("Failed to build client: {}", e)))?;

        info!(
            "Speech synthesis proxy using {} (voice {})",
            config.base_url, config.voice_id
        );

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &TTSConfig {
        &self.config
    }

    pub fn voice_id(&self) -> &str {
        &self.config.voice_id
    }

    /// Switch the voice used for subsequent requests
    pub fn set_voice(&mut self, voice_id: impl Into<String>) {
        self.config.voice_id = voice_id.into();
    }

    /// Synthesize `text` into one audio payload. Exactly one upstream call.
    pub async fn synthesize(
        &self,
        text: &str,
    ) -> std::result::Result<SynthesizedAudio, SynthesisFailure> {
        let url = self
            .config
            .endpoint(&format!("text-to-speech/{}", self.config.voice_id));
        let request = SynthesisRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        };

        debug!("Synthesizing {} chars", text.chars().count());

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Synthesis request failed: {}", e);
                SynthesisFailure::new(e.to_string())
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_AUDIO_CONTENT_TYPE)
            .to_string();

        let body = response.bytes().await.map_err(|e| {
            warn!("Failed to read synthesis response: {}", e);
            SynthesisFailure::new(e.to_string()).with_status(status.as_u16())
        })?;

        if !status.is_success() {
            let detail = extract_failure_detail(&body);
            warn!("Synthesis service returned {}: {}", status, detail);
            return Err(SynthesisFailure::new(detail).with_status(status.as_u16()));
        }

        debug!("Synthesized {} bytes of {}", body.len(), content_type);
        Ok(SynthesizedAudio::new(body, content_type))
    }

    /// List the voices available to this account
    pub async fn list_voices(&self) -> std::result::Result<Vec<VoiceInfo>, SynthesisFailure> {
        let response = self
            .client
            .get(self.config.endpoint("voices"))
            .header("xi-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| SynthesisFailure::new(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SynthesisFailure::new(e.to_string()).with_status(status.as_u16()))?;

        if !status.is_success() {
            return Err(SynthesisFailure::new(extract_failure_detail(&body))
                .with_status(status.as_u16()));
        }

        serde_json::from_slice::<VoiceListing>(&body)
            .map(|listing| listing.voices)
            .map_err(|e| SynthesisFailure::new(format!("Invalid voice listing: {}", e)))
    }

    /// Pick a voice from the provider's list using `selector` and switch to it.
    ///
    /// Keeps the configured voice when nothing matches or the listing fails.
    pub async fn resolve_voice(&mut self, selector: &VoiceSelector) -> Option<VoiceInfo> {
        let voices = match self.list_voices().await {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Could not list voices, keeping {}: {}", self.config.voice_id, e);
                return None;
            }
        };

        let chosen = selector.select(&voices).cloned();
        match &chosen {
            Some(voice) => {
                info!("Selected voice {} ({})", voice.name, voice.voice_id);
                self.set_voice(voice.voice_id.clone());
            }
            None => warn!(
                "No voice matched preferences, keeping {}",
                self.config.voice_id
            ),
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tts_config_default() {
        let config = TTSConfig::default();
        assert_eq!(config.voice_id, DEFAULT_VOICE_ID);
        assert_eq!(config.model_id, "eleven_monolingual_v1");
        assert!((config.stability - 0.5).abs() < f32::EPSILON);
        assert!((config.similarity_boost - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = TTSConfig::new("key").with_base_url("http://localhost:9000/v1/");
        assert_eq!(
            config.endpoint("text-to-speech/abc"),
            "http://localhost:9000/v1/text-to-speech/abc"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let request = SynthesisRequest {
            text: "Hello",
            model_id: "eleven_monolingual_v1",
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["text"], "Hello");
        assert_eq!(json["voice_settings"]["stability"], 0.5);
        assert_eq!(json["voice_settings"]["similarity_boost"], 0.75);
    }

    #[test]
    fn test_extract_nested_detail() {
        let body = br#"{"detail": {"status": "voice_not_found", "message": "bad voice id"}}"#;
        assert_eq!(extract_failure_detail(body), "bad voice id");
    }

    #[test]
    fn test_extract_string_detail() {
        let body = br#"{"detail": "Unauthorized"}"#;
        assert_eq!(extract_failure_detail(body), "Unauthorized");
    }

    #[test]
    fn test_extract_detail_fallback() {
        assert_eq!(extract_failure_detail(b"not json"), FALLBACK_FAILURE_DETAIL);
        assert_eq!(extract_failure_detail(br#"{"error": "x"}"#), FALLBACK_FAILURE_DETAIL);
    }

    #[test]
    fn test_set_voice() {
        let mut proxy = SpeechSynthesisProxy::new(TTSConfig::new("key")).unwrap();
        proxy.set_voice("voice-2");
        assert_eq!(proxy.voice_id(), "voice-2");
    }
}
