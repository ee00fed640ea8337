//! Shared state for the HTTP handlers

use crate::llm::CompletionOrchestrator;
use crate::speech::SpeechSynthesisProxy;
use std::sync::Arc;

/// Cheap to clone; every handler gets its own copy
#[derive(Clone)]
pub struct AppState {
    pub completion: Arc<CompletionOrchestrator>,
    pub synthesis: Arc<SpeechSynthesisProxy>,
}

impl AppState {
    pub fn new(completion: CompletionOrchestrator, synthesis: SpeechSynthesisProxy) -> Self {
        Self {
            completion: Arc::new(completion),
            synthesis: Arc::new(synthesis),
        }
    }
}
