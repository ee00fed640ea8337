//! Audio playback sessions
//!
//! The host's audio output is consumed through `AudioPlayer`. Each started
//! playback yields an `AudioResource` (the playable handle) plus a one-shot
//! receiver that resolves when the output reaches end-of-stream or fails.

use crate::speech::SynthesizedAudio;
use crate::Result;
use tokio::sync::oneshot;
use tracing::debug;

/// How a playback ended on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEnd {
    Completed,
    Failed(String),
}

/// Live handle to a playable audio resource.
///
/// Dropping the end-of-stream sender without sending counts as a stop.
pub trait AudioResource: Send {
    /// Halt output immediately and revoke the handle
    fn release(self: Box<Self>);
}

/// A playback the host audio output has started
pub struct StartedPlayback {
    pub resource: Box<dyn AudioResource>,
    pub ended: oneshot::Receiver<PlaybackEnd>,
}

/// Host audio output capability
pub trait AudioPlayer: Send + Sync {
    fn start(&self, audio: SynthesizedAudio) -> Result<StartedPlayback>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
}

/// The single playback owned by a session.
///
/// The resource is released exactly once: explicitly, or on drop. Releasing
/// also fires the stop signal so whoever awaits the playback wakes up even if
/// the audio output never reports an end.
pub struct PlaybackSession {
    id: u64,
    message_text: String,
    status: PlaybackStatus,
    resource: Option<Box<dyn AudioResource>>,
    stop_signal: Option<oneshot::Sender<()>>,
}

impl PlaybackSession {
    /// Returns the session and a receiver that resolves when it is released
    pub fn new(
        id: u64,
        message_text: impl Into<String>,
        resource: Box<dyn AudioResource>,
    ) -> (Self, oneshot::Receiver<()>) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let session = Self {
            id,
            message_text: message_text.into(),
            status: PlaybackStatus::Playing,
            resource: Some(resource),
            stop_signal: Some(stop_tx),
        };
        (session, stop_rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn message_text(&self) -> &str {
        &self.message_text
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn release(&mut self) {
        if let Some(resource) = self.resource.take() {
            debug!("Releasing playback {}", self.id);
            resource.release();
        }
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        self.status = PlaybackStatus::Idle;
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("message_text", &self.message_text)
            .field("status", &self.status)
            .field("holds_resource", &self.resource.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingResource {
        releases: Arc<AtomicUsize>,
    }

    impl AudioResource for CountingResource {
        fn release(self: Box<Self>) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn session(releases: &Arc<AtomicUsize>) -> (PlaybackSession, oneshot::Receiver<()>) {
        PlaybackSession::new(
            7,
            "Hello there",
            Box::new(CountingResource {
                releases: Arc::clone(releases),
            }),
        )
    }

    #[test]
    fn test_release_is_idempotent() {
        let releases = Arc::new(AtomicUsize::new(0));
        let (mut playback, mut stopped) = session(&releases);
        assert_eq!(playback.status(), PlaybackStatus::Playing);
        assert!(stopped.try_recv().is_err());

        playback.release();
        assert!(stopped.try_recv().is_ok());
        playback.release();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(playback.status(), PlaybackStatus::Idle);

        drop(playback);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_resource() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let (playback, _stopped) = session(&releases);
            assert_eq!(playback.id(), 7);
            assert_eq!(playback.message_text(), "Hello there");
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
