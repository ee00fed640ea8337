//! Completion pipeline: request shaping, retry and outcome classification

pub mod backend;
pub mod config;
pub mod orchestrator;
pub mod outcome;
pub mod prompts;

pub use backend::{CompletionBackend, CompletionRequest, HttpCompletionBackend, UpstreamReply};
pub use config::CompletionConfig;
pub use orchestrator::{normalize_reply, CompletionOrchestrator};
pub use outcome::{CompletionOutcome, RetryState};
