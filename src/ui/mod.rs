//! Widget-side session core
//!
//! Everything a chat widget needs below its rendering layer: the session
//! state machine, the backends it calls and the playback it owns.

pub mod client;
pub mod playback;
pub mod state;

pub use client::{
    ChatBackend, ChatReply, ChatRequestBody, ChatResponseBody, HttpWidgetClient, SpeechBackend,
    SpeechRequestBody,
};
pub use playback::{
    AudioPlayer, AudioResource, PlaybackEnd, PlaybackSession, PlaybackStatus, StartedPlayback,
};
pub use state::{PlayOutcome, RecordOutcome, SendOutcome, SessionState, SessionStateMachine};
