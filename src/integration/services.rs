//! Wiring of the server-side components

use crate::integration::config::AppConfig;
use crate::llm::CompletionOrchestrator;
use crate::server::AppState;
use crate::speech::{SpeechSynthesisProxy, VoiceSelector};
use crate::Result;
use tracing::info;

/// Builder for the state shared by the HTTP handlers
pub struct ServicesBuilder {
    config: AppConfig,
}

impl ServicesBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Build the orchestrator and the proxy
    pub async fn build(self) -> Result<AppState> {
        self.config.validate()?;

        let completion = CompletionOrchestrator::new(self.config.completion.clone())?;
        let mut synthesis = SpeechSynthesisProxy::new(self.config.synthesis.clone())?;

        let selector = VoiceSelector::from_strings(&self.config.synthesis.voice_preferences);
        if !selector.is_empty() {
            synthesis.resolve_voice(&selector).await;
        }

        info!(
            "Services ready (model {}, voice {})",
            completion.config().model,
            synthesis.voice_id()
        );

        Ok(AppState::new(completion, synthesis))
    }
}
