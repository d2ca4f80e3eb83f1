//! Typed session event bus
//!
//! The pipeline and its consumers (practice screen, progress dashboard)
//! communicate through one explicit contract instead of ad hoc global
//! callbacks: components publish [`SessionEvent`]s, consumers subscribe on
//! mount and unsubscribe by dropping the receiver.

use tokio::sync::broadcast;

/// Events emitted by the streaming and voice-turn sessions.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The current in-progress hypothesis changed (live "ghost" text).
    PartialTranscript(String),
    /// A segment of text was committed.
    CommittedTranscript(String),
    /// A streaming session finished with this non-empty full text.
    TranscriptCompleted(String),
    /// A recorded turn was transcribed (before the chat exchange).
    TurnTranscribed(String),
    /// The conversational reply for a turn is ready.
    ReplyReady {
        text: String,
        audio_url: Option<String>,
    },
    PlaybackStarted,
    PlaybackFinished,
    /// A pipeline error. `user_facing` marks messages safe to render
    /// verbatim.
    Error { message: String, user_facing: bool },
}

/// Broadcast bus for [`SessionEvent`]s.
///
/// Publishing never fails: with no live subscribers the event is simply
/// discarded. Slow subscribers may observe `Lagged` and miss events, which
/// is acceptable for UI state that is always derivable from the next event.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        // SendError just means nobody is listening right now.
        let _ = self.tx.send(event);
    }

    /// Publish an error event, tagging whether it is safe to render.
    pub fn publish_error(&self, error: &crate::error::SpeechError) {
        self.publish(SessionEvent::Error {
            message: error.to_string(),
            user_facing: error.is_user_facing(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
