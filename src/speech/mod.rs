//! Speech modules for voice input and output
//!
//! This module provides:
//! - One-shot voice capture over a host recognition capability
//! - Text-to-speech through the ElevenLabs synthesis API
//! - Ranked voice selection

pub mod stt;
pub mod tts;
pub mod voices;

// Re-export commonly used types
pub use stt::{CaptureConfig, CaptureError, SpeechRecognizer, VoiceInputAdapter};
pub use tts::{
    extract_failure_detail, SpeechSynthesisProxy, SynthesisFailure, SynthesizedAudio, TTSConfig,
    DEFAULT_AUDIO_CONTENT_TYPE, DEFAULT_VOICE_ID,
};
pub use voices::{VoiceInfo, VoicePreference, VoiceSelector};
