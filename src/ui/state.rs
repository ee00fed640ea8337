//! Widget session state machine
//!
//! Owns the transcript, the input buffer and the single playback session,
//! and keeps voice capture, the outbound chat request and audio playback
//! mutually exclusive:
//!
//! ```text
//! Idle -> Recording     -> Idle   (voice capture)
//! Idle -> AwaitingReply -> Idle   (send message)
//! Idle -> Speaking      -> Idle   (playback)
//! ```
//!
//! All methods take `&self`; the state lock is never held across an await,
//! so overlapping calls from the same event loop see each other's state.

use crate::messages::{Message, Transcript, GREETING};
use crate::speech::{CaptureError, SynthesisFailure, VoiceInputAdapter};
use crate::ui::client::{ChatBackend, ChatReply, HttpWidgetClient, SpeechBackend};
use crate::ui::playback::{AudioPlayer, PlaybackEnd, PlaybackSession};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    AwaitingReply,
    Speaking,
}

/// Result of `send_message`
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The bot reply that was appended (error-flagged on failure)
    Replied(Message),
    /// Blank input, or a request was already in flight
    Ignored,
}

/// Result of `start_recording`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Transcript placed in the input buffer
    Captured(String),
    Failed(CaptureError),
    /// Busy recording or awaiting a reply
    Ignored,
}

/// Terminal result of one `play` call
#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    /// Audio reached end-of-stream
    Finished,
    /// Stopped by a toggle, a replacement or another state change
    Stopped,
    /// Synthesis failed; nothing was played
    SynthesisFailed(SynthesisFailure),
    /// The audio output could not play the payload
    PlaybackFailed(String),
    /// The session left Idle while synthesis was in flight; audio discarded
    Superseded,
    /// Another synthesis is outstanding, or the session is busy
    Ignored,
}

struct SessionInner {
    state: SessionState,
    input: String,
    playback: Option<PlaybackSession>,
    /// Ticket of the outstanding synthesis request, if any
    pending_synthesis: Option<u64>,
    next_ticket: u64,
}

impl SessionInner {
    /// Release the current playback, if any, and leave Speaking
    fn stop_playback(&mut self) -> bool {
        let stopped = match self.playback.take() {
            Some(mut playback) => {
                playback.release();
                true
            }
            None => false,
        };
        if self.state == SessionState::Speaking {
            self.state = SessionState::Idle;
        }
        stopped
    }
}

/// What an in-flight operation has claimed on the session
#[derive(Debug, Clone, Copy)]
enum Claim {
    /// Recording or AwaitingReply
    State(SessionState),
    /// Synthesis ticket, and later the playback with the same id
    Playback(u64),
}

/// Hands a claim back if the owning future is dropped before finishing.
///
/// Every reset is conditional, so dropping after a normal finish is a no-op.
/// Must be declared before any lock guard in the same scope.
struct ClaimGuard<'a> {
    inner: &'a Mutex<SessionInner>,
    claim: Claim,
}

impl<'a> ClaimGuard<'a> {
    fn new(inner: &'a Mutex<SessionInner>, claim: Claim) -> Self {
        Self { inner, claim }
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        match self.claim {
            Claim::State(state) => {
                if inner.state == state {
                    debug!("Abandoned while {:?}, back to Idle", state);
                    inner.state = SessionState::Idle;
                }
            }
            Claim::Playback(ticket) => {
                if inner.pending_synthesis == Some(ticket) {
                    debug!("Synthesis {} abandoned", ticket);
                    inner.pending_synthesis = None;
                }
                if inner.playback.as_ref().is_some_and(|p| p.id() == ticket) {
                    inner.stop_playback();
                }
            }
        }
    }
}

/// Client-side session for one widget instance
pub struct SessionStateMachine {
    transcript: Transcript,
    inner: Mutex<SessionInner>,
    chat: Arc<dyn ChatBackend>,
    speech: Arc<dyn SpeechBackend>,
    player: Arc<dyn AudioPlayer>,
    voice: VoiceInputAdapter,
}

impl SessionStateMachine {
    pub fn new(
        chat: Arc<dyn ChatBackend>,
        speech: Arc<dyn SpeechBackend>,
        player: Arc<dyn AudioPlayer>,
        voice: VoiceInputAdapter,
    ) -> Self {
        Self {
            transcript: Transcript::with_greeting(GREETING),
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                input: String::new(),
                playback: None,
                pending_synthesis: None,
                next_ticket: 0,
            }),
            chat,
            speech,
            player,
            voice,
        }
    }

    /// Session talking to a parley server at `base_url`
    pub fn connect(
        base_url: &str,
        player: Arc<dyn AudioPlayer>,
        voice: VoiceInputAdapter,
    ) -> Result<Self> {
        let client = Arc::new(HttpWidgetClient::new(base_url)?);
        Ok(Self::new(client.clone(), client, player, voice))
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> Vec<Message> {
        self.transcript.get_all()
    }

    pub fn input(&self) -> String {
        self.inner.lock().input.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.inner.lock().input = text.into();
    }

    pub fn is_synthesizing(&self) -> bool {
        self.inner.lock().pending_synthesis.is_some()
    }

    /// Text of the message currently being spoken
    pub fn playing_text(&self) -> Option<String> {
        self.inner
            .lock()
            .playback
            .as_ref()
            .map(|p| p.message_text().to_string())
    }

    /// Capture one utterance into the input buffer. Never sends it.
    pub async fn start_recording(&self) -> RecordOutcome {
        // Checked before any transition so an unsupported host never enters Recording
        if let Err(e) = self.voice.ensure_supported() {
            info!("Voice input unavailable: {}", e);
            return RecordOutcome::Failed(e);
        }

        {
            let mut inner = self.inner.lock();
            match inner.state {
                SessionState::Idle => {}
                SessionState::Speaking => {
                    inner.stop_playback();
                }
                SessionState::Recording | SessionState::AwaitingReply => {
                    debug!("Ignoring record request while {:?}", inner.state);
                    return RecordOutcome::Ignored;
                }
            }
            inner.state = SessionState::Recording;
        }
        let _claim = ClaimGuard::new(&self.inner, Claim::State(SessionState::Recording));
        debug!("Recording started");

        let result = self.voice.capture().await;

        let mut inner = self.inner.lock();
        inner.state = SessionState::Idle;
        match result {
            Ok(text) => {
                debug!("Recording captured {} chars", text.len());
                inner.input = text.clone();
                RecordOutcome::Captured(text)
            }
            Err(e) => RecordOutcome::Failed(e),
        }
    }

    /// Send the input buffer and clear it
    pub async fn submit_input(&self) -> SendOutcome {
        let text = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::AwaitingReply || inner.input.trim().is_empty() {
                return SendOutcome::Ignored;
            }
            std::mem::take(&mut inner.input)
        };
        self.send_message(&text).await
    }

    /// Send `text` and append the reply.
    ///
    /// At most one request is in flight; a call while awaiting a reply is a no-op.
    /// Blank text is ignored; anything else is sent and recorded as typed.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        {
            let mut inner = self.inner.lock();
            match inner.state {
                SessionState::Idle => {}
                SessionState::Speaking => {
                    inner.stop_playback();
                }
                SessionState::Recording | SessionState::AwaitingReply => {
                    debug!("Ignoring send while {:?}", inner.state);
                    return SendOutcome::Ignored;
                }
            }
            self.transcript.append(Message::user(text));
            inner.state = SessionState::AwaitingReply;
        }
        let _claim = ClaimGuard::new(&self.inner, Claim::State(SessionState::AwaitingReply));
        debug!("Message sent, awaiting reply");

        let message = match self.chat.chat(text).await {
            ChatReply::Reply(reply) => Message::bot(reply),
            ChatReply::Error(error) => {
                warn!("Chat failed: {}", error);
                Message::bot_error(error)
            }
        };

        let mut inner = self.inner.lock();
        self.transcript.append(message.clone());
        inner.state = SessionState::Idle;
        SendOutcome::Replied(message)
    }

    /// Speak `text`, or stop it if it is already being spoken.
    ///
    /// Resolves once this playback is over, with how it ended.
    pub async fn play(&self, text: &str) -> PlayOutcome {
        let ticket = {
            let mut inner = self.inner.lock();
            if inner.pending_synthesis.is_some() {
                debug!("Synthesis already in flight, ignoring play");
                return PlayOutcome::Ignored;
            }
            match inner.state {
                SessionState::Idle => {}
                SessionState::Speaking => {
                    let same_message = inner
                        .playback
                        .as_ref()
                        .is_some_and(|p| p.message_text() == text);
                    inner.stop_playback();
                    if same_message {
                        debug!("Playback toggled off");
                        return PlayOutcome::Stopped;
                    }
                }
                SessionState::Recording | SessionState::AwaitingReply => {
                    debug!("Ignoring play while {:?}", inner.state);
                    return PlayOutcome::Ignored;
                }
            }
            inner.next_ticket += 1;
            let ticket = inner.next_ticket;
            inner.pending_synthesis = Some(ticket);
            ticket
        };
        let _claim = ClaimGuard::new(&self.inner, Claim::Playback(ticket));

        let synthesized = self.speech.speak(text).await;

        let (ended, stopped) = {
            let mut inner = self.inner.lock();
            if inner.pending_synthesis == Some(ticket) {
                inner.pending_synthesis = None;
            }

            let audio = match synthesized {
                Ok(audio) => audio,
                Err(failure) => {
                    warn!("Synthesis failed: {}", failure);
                    return PlayOutcome::SynthesisFailed(failure);
                }
            };

            if inner.state != SessionState::Idle {
                debug!("Session is {:?}, discarding synthesized audio", inner.state);
                return PlayOutcome::Superseded;
            }

            // The previous resource goes before a new one exists
            inner.stop_playback();

            let started = match self.player.start(audio) {
                Ok(started) => started,
                Err(e) => {
                    warn!("Audio output refused payload: {}", e);
                    return PlayOutcome::PlaybackFailed(e.to_string());
                }
            };

            let (playback, stopped) = PlaybackSession::new(ticket, text, started.resource);
            inner.playback = Some(playback);
            inner.state = SessionState::Speaking;
            debug!("Playback {} started", ticket);
            (started.ended, stopped)
        };

        let end = tokio::select! {
            end = ended => end.ok(),
            _ = stopped => None,
        };

        let mut inner = self.inner.lock();
        let still_current = inner.playback.as_ref().is_some_and(|p| p.id() == ticket);
        if still_current {
            inner.stop_playback();
        }

        match end {
            Some(PlaybackEnd::Completed) => PlayOutcome::Finished,
            Some(PlaybackEnd::Failed(detail)) => {
                warn!("Playback {} failed: {}", ticket, detail);
                PlayOutcome::PlaybackFailed(detail)
            }
            // Released under us, or the output dropped its end signal
            None => PlayOutcome::Stopped,
        }
    }

    /// Stop playback immediately. Returns whether anything was playing.
    pub fn stop_playback(&self) -> bool {
        self.inner.lock().stop_playback()
    }
}

impl std::fmt::Debug for SessionStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SessionStateMachine")
            .field("state", &inner.state)
            .field("messages", &self.transcript.len())
            .field("playback", &inner.playback)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::SynthesizedAudio;
    use crate::ui::playback::StartedPlayback;
    use crate::ParleyError;
    use async_trait::async_trait;

    struct EchoChat;

    #[async_trait]
    impl ChatBackend for EchoChat {
        async fn chat(&self, message: &str) -> ChatReply {
            ChatReply::Reply(format!("You said: {}", message))
        }
    }

    struct NoSpeech;

    #[async_trait]
    impl SpeechBackend for NoSpeech {
        async fn speak(
            &self,
            _text: &str,
        ) -> std::result::Result<SynthesizedAudio, SynthesisFailure> {
            Err(SynthesisFailure::new("offline"))
        }
    }

    struct NoAudio;

    impl AudioPlayer for NoAudio {
        fn start(&self, _audio: SynthesizedAudio) -> Result<StartedPlayback> {
            Err(ParleyError::PlaybackError("no output device".into()))
        }
    }

    fn session() -> SessionStateMachine {
        SessionStateMachine::new(
            Arc::new(EchoChat),
            Arc::new(NoSpeech),
            Arc::new(NoAudio),
            VoiceInputAdapter::unsupported(),
        )
    }

    #[test]
    fn test_new_session_starts_idle_with_greeting() {
        let session = session();
        assert_eq!(session.state(), SessionState::Idle);
        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, GREETING);
        assert!(!messages[0].is_user());
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let session = session();
        assert_eq!(session.send_message("   ").await, SendOutcome::Ignored);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_send_appends_user_and_bot() {
        let session = session();
        let outcome = session.send_message("ping").await;

        match outcome {
            SendOutcome::Replied(reply) => {
                assert_eq!(reply.text, "You said: ping");
                assert!(!reply.is_error);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let texts: Vec<_> = session.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec![GREETING, "ping", "You said: ping"]);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_message_recorded_as_typed() {
        let session = session();
        session.send_message("  spaced out ").await;
        let messages = session.messages();
        assert_eq!(messages[1].text, "  spaced out ");
        assert_eq!(messages[2].text, "You said:   spaced out ");
    }

    #[tokio::test]
    async fn test_submit_input_clears_buffer() {
        let session = session();
        session.set_input("hello");
        assert!(matches!(session.submit_input().await, SendOutcome::Replied(_)));
        assert_eq!(session.input(), "");
        assert_eq!(session.submit_input().await, SendOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_unsupported_recording_stays_idle() {
        let session = session();
        assert_eq!(
            session.start_recording().await,
            RecordOutcome::Failed(CaptureError::Unsupported)
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_synthesis_failure_stays_idle() {
        let session = session();
        let outcome = session.play("Hello! How can I help?").await;
        assert_eq!(
            outcome,
            PlayOutcome::SynthesisFailed(SynthesisFailure::new("offline"))
        );
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.playing_text().is_none());
        assert!(!session.is_synthesizing());
    }

    #[tokio::test]
    async fn test_stop_without_playback() {
        let session = session();
        assert!(!session.stop_playback());
        assert_eq!(session.state(), SessionState::Idle);
    }
}
