//! Terminal outcomes of a completion call and the retry bookkeeping behind them

use crate::llm::prompts::{
    MALFORMED_RESPONSE_MESSAGE, RATE_LIMITED_MESSAGE, TRANSPORT_FAILURE_MESSAGE,
    WARMING_UP_MESSAGE,
};
use std::time::Duration;

/// Exactly one of these is produced per `CompletionOrchestrator::complete` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// A usable reply, already trimmed and normalized
    Success { text: String },

    /// Every attempt was answered with a rate-limit signal
    RateLimited,

    /// The service kept reporting that the model is still loading
    WarmingUp,

    /// The service answered, but with neither a completion nor a rate-limit signal
    MalformedResponse,

    /// The call itself failed
    TransportFailure,
}

impl CompletionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompletionOutcome::Success { .. })
    }

    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionOutcome::Success { .. } => "success",
            CompletionOutcome::RateLimited => "rate_limited",
            CompletionOutcome::WarmingUp => "warming_up",
            CompletionOutcome::MalformedResponse => "malformed_response",
            CompletionOutcome::TransportFailure => "transport_failure",
        }
    }

    /// The text shown to the user for this outcome.
    ///
    /// One phrase per variant; successes show the reply itself.
    pub fn user_message(&self) -> &str {
        match self {
            CompletionOutcome::Success { text } => text,
            CompletionOutcome::RateLimited => RATE_LIMITED_MESSAGE,
            CompletionOutcome::WarmingUp => WARMING_UP_MESSAGE,
            CompletionOutcome::MalformedResponse => MALFORMED_RESPONSE_MESSAGE,
            CompletionOutcome::TransportFailure => TRANSPORT_FAILURE_MESSAGE,
        }
    }
}

/// Retry bookkeeping for a single completion call. Never outlives the call.
#[derive(Debug, Clone)]
pub struct RetryState {
    pub attempt: u32,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryState {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Mark the start of another attempt
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Whether another attempt fits in the budget
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_distinct() {
        let outcomes = [
            CompletionOutcome::RateLimited,
            CompletionOutcome::WarmingUp,
            CompletionOutcome::MalformedResponse,
            CompletionOutcome::TransportFailure,
        ];
        let phrases: std::collections::HashSet<_> =
            outcomes.iter().map(|o| o.user_message()).collect();
        assert_eq!(phrases.len(), outcomes.len());

        assert!(CompletionOutcome::RateLimited.user_message().contains("thinking too much"));
        assert!(CompletionOutcome::WarmingUp.user_message().contains("warming up"));
        assert!(CompletionOutcome::MalformedResponse
            .user_message()
            .contains("didn't quite catch that"));
    }

    #[test]
    fn test_success_shows_reply() {
        let outcome = CompletionOutcome::Success {
            text: "Paris is the capital.".to_string(),
        };
        assert!(outcome.is_success());
        assert_eq!(outcome.user_message(), "Paris is the capital.");
        assert_eq!(outcome.kind(), "success");
    }

    #[test]
    fn test_retry_state_budget() {
        let mut retry = RetryState::new(3, Duration::from_millis(1000));
        assert_eq!(retry.begin_attempt(), 1);
        assert!(retry.can_retry());
        retry.begin_attempt();
        assert!(retry.can_retry());
        retry.begin_attempt();
        assert!(!retry.can_retry());
    }
}
