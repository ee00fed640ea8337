//! Fixed user-facing strings for the chat pipeline

/// Substituted for empty or too-short completions
pub const CLARIFICATION_PROMPT: &str =
    "I understand. Could you please provide more details or rephrase that?";

pub const RATE_LIMITED_MESSAGE: &str =
    "I've been thinking too much! Please wait a moment before trying again.";

pub const WARMING_UP_MESSAGE: &str = "I'm still warming up. Please try again in a few seconds.";

pub const MALFORMED_RESPONSE_MESSAGE: &str =
    "I didn't quite catch that. Could you rephrase your question?";

pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "Sorry, I'm having trouble connecting to my brain right now. Please try again later.";

/// Shown when the client cannot reach the chat endpoint at all
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error. Please check your connection and try again.";

/// Returned by the speech endpoint; provider detail stays in the logs
pub const SYNTHESIS_FAILURE_MESSAGE: &str = "Voice synthesis failed. Please try again.";
