use thiserror::Error;

/// Errors surfaced by the speech pipeline.
///
/// Every variant is caught at a component boundary and delivered as a
/// `Result` value or a `SessionEvent::Error` -- never as a panic. The
/// user-facing variants (`DeviceUnavailable`, `NoSpeechDetected`) carry
/// display text suitable for direct rendering.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Microphone permission denied or no input device present.
    /// Recoverable: the user may retry after granting access.
    #[error("Microphone unavailable. Please check that a microphone is connected and access is allowed.")]
    DeviceUnavailable,

    /// Transport-level failure on the streaming channel (connect refused,
    /// mid-session drop). Forces session teardown; recoverable by starting
    /// a fresh session.
    #[error("Streaming channel error: {0}")]
    Channel(String),

    /// The recognizer returned an empty transcript for a recorded turn.
    #[error("No speech detected. Please try recording again.")]
    NoSpeechDetected,

    /// Non-success status from a batch recognition endpoint. Carries the
    /// status code and response body for diagnostics.
    #[error("Recognition failed with status {status}: {body}")]
    RecognitionFailed { status: u16, body: String },

    /// The reply audio failed to play. Logged and surfaced; never blocks
    /// a subsequent recording.
    #[error("Audio playback failed: {0}")]
    Playback(String),
}

impl SpeechError {
    /// Whether the error should be shown to the user verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            SpeechError::DeviceUnavailable
                | SpeechError::NoSpeechDetected
                | SpeechError::RecognitionFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SpeechError>;
