//! Completion orchestrator: one user message in, exactly one classified outcome out
//!
//! Retries rate-limited (and still-loading) attempts with a fixed backoff,
//! normalizes usable replies and folds every failure into a `CompletionOutcome`.

use crate::llm::backend::{
    CompletionBackend, CompletionBody, CompletionRequest, HttpCompletionBackend, UpstreamReply,
};
use crate::llm::config::CompletionConfig;
use crate::llm::outcome::{CompletionOutcome, RetryState};
use crate::llm::prompts::CLARIFICATION_PROMPT;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Classification of a single upstream answer
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttemptResult {
    Content(String),
    RateLimited,
    WarmingUp,
    Malformed,
    Failed,
}

fn classify(reply: &UpstreamReply) -> AttemptResult {
    let body = serde_json::from_str::<CompletionBody>(&reply.body).ok();

    let rate_limited = reply.status == 429 || body.as_ref().is_some_and(|b| b.is_rate_limited());
    if rate_limited {
        return AttemptResult::RateLimited;
    }

    let loading = reply.status == 503 || body.as_ref().is_some_and(|b| b.is_loading());
    if loading {
        return AttemptResult::WarmingUp;
    }

    if !reply.is_success() {
        return AttemptResult::Failed;
    }

    match body.as_ref().and_then(|b| b.content()) {
        Some(content) => AttemptResult::Content(content.to_string()),
        None => AttemptResult::Malformed,
    }
}

/// Trim a completion and replace empty or too-short replies with the clarification prompt.
///
/// Length is measured in UTF-16 code units, the unit browser widgets count in.
pub fn normalize_reply(raw: &str, min_len: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.encode_utf16().count() < min_len {
        CLARIFICATION_PROMPT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sends user messages to the completion service
pub struct CompletionOrchestrator {
    config: CompletionConfig,
    backend: Arc<dyn CompletionBackend>,
}

impl CompletionOrchestrator {
    /// Create an orchestrator talking HTTP to `config.api_url`
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let backend = HttpCompletionBackend::new(&config)?;
        info!("Completion orchestrator using {}", config.api_url);
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Create an orchestrator over an arbitrary transport
    pub fn with_backend(config: CompletionConfig, backend: Arc<dyn CompletionBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Complete `message`, retrying rate-limited attempts.
    ///
    /// Never fails: every path ends in exactly one `CompletionOutcome`.
    pub async fn complete(&self, message: &str) -> CompletionOutcome {
        let request = CompletionRequest::single_turn(&self.config, message);
        let mut retry = RetryState::new(self.config.max_attempts, self.config.backoff);

        loop {
            let attempt = retry.begin_attempt();
            debug!("Completion attempt {} of {}", attempt, retry.max_attempts);

            let reply = match self.backend.send(&request).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!("Completion request failed: {}", e);
                    return CompletionOutcome::TransportFailure;
                }
            };

            let exhausted_outcome = match classify(&reply) {
                AttemptResult::Content(raw) => {
                    return CompletionOutcome::Success {
                        text: normalize_reply(&raw, self.config.min_reply_len),
                    };
                }
                AttemptResult::Malformed => {
                    warn!("Completion service returned an unexpected body: {}", reply.body);
                    return CompletionOutcome::MalformedResponse;
                }
                AttemptResult::Failed => {
                    warn!(
                        "Completion service returned status {}: {}",
                        reply.status, reply.body
                    );
                    return CompletionOutcome::TransportFailure;
                }
                AttemptResult::RateLimited => CompletionOutcome::RateLimited,
                AttemptResult::WarmingUp => CompletionOutcome::WarmingUp,
            };

            if !retry.can_retry() {
                warn!(
                    "Giving up after {} attempts ({})",
                    retry.attempt,
                    exhausted_outcome.kind()
                );
                return exhausted_outcome;
            }

            warn!(
                "Attempt {} of {} {}, retrying in {}ms",
                attempt,
                retry.max_attempts,
                exhausted_outcome.kind(),
                retry.backoff.as_millis()
            );
            tokio::time::sleep(retry.backoff).await;
        }
    }
}
