//! Completion service configuration

use std::time::Duration;

/// Default OpenAI-compatible chat completions endpoint
pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Configuration for the completion orchestrator
#[derive(Clone, Debug)]
pub struct CompletionConfig {
    /// Full URL of the chat completions endpoint
    pub api_url: String,

    /// Bearer credential. Not validated locally; a bad key surfaces as an upstream failure.
    pub api_key: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Maximum tokens in the assistant turn
    pub max_tokens: u32,

    /// Sampling temperature, held constant across retries
    pub temperature: f32,

    /// Nucleus sampling cutoff, held constant across retries
    pub top_p: f32,

    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Pause between a rate-limited attempt and the next one
    pub backoff: Duration,

    /// Replies shorter than this many UTF-16 units (after trimming) become the clarification prompt
    pub min_reply_len: usize,

    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_COMPLETION_URL.to_string(),
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.95,
            max_attempts: 3,
            backoff: Duration::from_millis(1000),
            min_reply_len: 5,
            timeout: Duration::from_secs(60),
        }
    }
}

impl CompletionConfig {
    /// Create a configuration with the given credential and defaults for everything else
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Point the orchestrator at a different endpoint
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the retry budget (clamped to at least one attempt)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the backoff between rate-limited attempts
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}
