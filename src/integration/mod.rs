//! Integration layer for the server binary
//!
//! Reads configuration once and assembles the shared handler state.

pub mod config;
pub mod services;

pub use config::{AppConfig, ServerConfig};
pub use services::ServicesBuilder;
