//! Configuration for the integration layer
//!
//! Provides centralized configuration for all components. Credentials are
//! read once at startup and injected into the components that need them.

use crate::llm::config::CompletionConfig;
use crate::speech::tts::TTSConfig;
use crate::{ParleyError, Result};
use std::net::SocketAddr;
use tokio::net::lookup_host;

pub const ENV_COMPLETION_KEY: &str = "OPENAI_API_KEY";
pub const ENV_SYNTHESIS_KEY: &str = "ELEVEN_LABS_API_KEY";

/// Bind address for the HTTP server
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Resolve the bind address. Accepts IP literals (v4 or bare v6) and host names.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let mut addrs = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                ParleyError::ConfigError(format!("Invalid bind host {}: {}", self.host, e))
            })?;

        addrs.next().ok_or_else(|| {
            ParleyError::ConfigError(format!("Bind host {} resolved to nothing", self.host))
        })
    }
}

/// Configuration for the complete service
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Completion service configuration
    pub completion: CompletionConfig,

    /// Speech synthesis configuration
    pub synthesis: TTSConfig,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Missing credentials are left empty; the upstream call reports them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup(ENV_COMPLETION_KEY) {
            config.completion.api_key = key;
        }
        if let Some(url) = lookup("PARLEY_COMPLETION_URL") {
            config.completion.api_url = url;
        }
        if let Some(model) = lookup("PARLEY_COMPLETION_MODEL") {
            config.completion.model = model;
        }

        if let Some(key) = lookup(ENV_SYNTHESIS_KEY) {
            config.synthesis.api_key = key;
        }
        if let Some(url) = lookup("PARLEY_SYNTHESIS_URL") {
            config.synthesis.base_url = url;
        }
        if let Some(voice) = lookup("PARLEY_VOICE_ID") {
            config.synthesis.voice_id = voice;
        }
        if let Some(prefs) = lookup("PARLEY_VOICE_PREFERENCES") {
            config.synthesis.voice_preferences = prefs
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(host) = lookup("PARLEY_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("PARLEY_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ParleyError::ConfigError(format!("Invalid PARLEY_PORT: {}", port)))?;
        }

        Ok(config)
    }

    /// Override the bind address
    pub fn with_bind(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }

    /// Set the completion configuration
    pub fn with_completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    /// Set the synthesis configuration
    pub fn with_synthesis(mut self, synthesis: TTSConfig) -> Self {
        self.synthesis = synthesis;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(ParleyError::ConfigError("Bind host is required".to_string()));
        }

        if self.completion.api_url.is_empty() {
            return Err(ParleyError::ConfigError(
                "Completion URL is required".to_string(),
            ));
        }
        if self.completion.max_attempts == 0 {
            return Err(ParleyError::ConfigError(
                "At least one completion attempt is required".to_string(),
            ));
        }
        if self.synthesis.base_url.is_empty() {
            return Err(ParleyError::ConfigError(
                "Synthesis URL is required".to_string(),
            ));
        }
        if self.synthesis.voice_id.is_empty() {
            return Err(ParleyError::ConfigError("Voice id is required".to_string()));
        }

        Ok(())
    }
}
