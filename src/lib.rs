pub mod integration;
pub mod llm;
pub mod messages;
pub mod server;
pub mod speech;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP client error: {0}")]
    HttpClientError(String),

    #[error("Playback error: {0}")]
    PlaybackError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

impl From<std::io::Error> for ParleyError {
    fn from(e: std::io::Error) -> Self {
        ParleyError::IOError(e.to_string())
    }
}

impl From<reqwest::Error> for ParleyError {
    fn from(e: reqwest::Error) -> Self {
        ParleyError::HttpClientError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: ParleyError = std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken").into();
        assert!(matches!(err, ParleyError::IOError(_)));
        assert_eq!(err.to_string(), "IO error: taken");
    }

    #[test]
    fn test_error_display() {
        let err = ParleyError::ConfigError("Invalid PARLEY_PORT: eighty".into());
        assert_eq!(err.to_string(), "Configuration error: Invalid PARLEY_PORT: eighty");
    }
}
