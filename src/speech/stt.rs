//! One-shot voice capture
//!
//! The host's speech recognition engine is consumed through the
//! `SpeechRecognizer` capability; this module only decides what a single
//! capture attempt means.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Capture settings handed to the recognizer
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// BCP-47 language tag
    pub language: String,

    /// Keep listening after the first utterance
    pub continuous: bool,

    /// Report partial transcripts while the user speaks
    pub interim_results: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            continuous: false,
            interim_results: false,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("speech recognition is not supported in this environment")]
    Unsupported,

    #[error("no speech was detected")]
    NoSpeechDetected,

    #[error("speech recognition failed: {0}")]
    Recognition(String),
}

/// Host speech recognition engine.
///
/// `recognize_once` resolves when the engine ends the utterance: with the
/// final transcript, or with an error.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize_once(&self, config: &CaptureConfig) -> Result<String, CaptureError>;
}

/// Wraps an optional recognizer. `None` means the host has no recognition capability.
#[derive(Clone, Default)]
pub struct VoiceInputAdapter {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    config: CaptureConfig,
}

impl VoiceInputAdapter {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            recognizer: Some(recognizer),
            config: CaptureConfig::default(),
        }
    }

    /// An adapter for hosts without speech recognition
    pub fn unsupported() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Synchronous capability check, run before anything else happens
    pub fn ensure_supported(&self) -> Result<(), CaptureError> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(CaptureError::Unsupported)
        }
    }

    /// Capture one utterance and return its final transcript
    pub async fn capture(&self) -> Result<String, CaptureError> {
        let recognizer = match &self.recognizer {
            Some(r) => r,
            None => {
                info!("Voice capture requested but recognition is unsupported");
                return Err(CaptureError::Unsupported);
            }
        };

        // Single utterance, final results only
        let config = CaptureConfig {
            continuous: false,
            interim_results: false,
            ..self.config.clone()
        };

        debug!("Starting voice capture ({})", config.language);
        let transcript = recognizer.recognize_once(&config).await.map_err(|e| {
            warn!("Voice capture ended without a transcript: {}", e);
            e
        })?;

        let transcript = transcript.trim();
        if transcript.is_empty() {
            debug!("Voice capture produced an empty transcript");
            return Err(CaptureError::NoSpeechDetected);
        }

        Ok(transcript.to_string())
    }
}

impl std::fmt::Debug for VoiceInputAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceInputAdapter")
            .field("supported", &self.is_supported())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct FixedRecognizer {
        result: Result<String, CaptureError>,
        seen: Mutex<Option<CaptureConfig>>,
    }

    #[async_trait]
    impl SpeechRecognizer for FixedRecognizer {
        async fn recognize_once(&self, config: &CaptureConfig) -> Result<String, CaptureError> {
            *self.seen.lock() = Some(config.clone());
            self.result.clone()
        }
    }

    fn recognizer(result: Result<String, CaptureError>) -> Arc<FixedRecognizer> {
        Arc::new(FixedRecognizer {
            result,
            seen: Mutex::new(None),
        })
    }

    #[tokio::test]
    async fn test_unsupported_capture() {
        let adapter = VoiceInputAdapter::unsupported();
        assert!(!adapter.is_supported());
        assert_eq!(adapter.ensure_supported(), Err(CaptureError::Unsupported));
        assert_eq!(adapter.capture().await, Err(CaptureError::Unsupported));
    }

    #[tokio::test]
    async fn test_capture_trims_transcript() {
        let fake = recognizer(Ok("  what time is it \n".to_string()));
        let adapter = VoiceInputAdapter::new(fake.clone()).with_language("en-GB");

        assert_eq!(adapter.capture().await, Ok("what time is it".to_string()));

        let seen = fake.seen.lock().clone().unwrap();
        assert_eq!(seen.language, "en-GB");
        assert!(!seen.continuous);
        assert!(!seen.interim_results);
    }

    #[tokio::test]
    async fn test_blank_transcript_is_no_speech() {
        let adapter = VoiceInputAdapter::new(recognizer(Ok("   ".to_string())));
        assert_eq!(adapter.capture().await, Err(CaptureError::NoSpeechDetected));
    }

    #[tokio::test]
    async fn test_recognizer_error_passes_through() {
        let adapter = VoiceInputAdapter::new(recognizer(Err(CaptureError::Recognition(
            "audio-capture".to_string(),
        ))));
        assert_eq!(
            adapter.capture().await,
            Err(CaptureError::Recognition("audio-capture".to_string()))
        );
    }
}
