use serde::{Deserialize, Serialize};

/// Inbound message from the streaming recognizer.
///
/// Wire shape: `{"type":"partial"|"final"|"error","text"?,"message"?}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Provisional hypothesis for the utterance still being spoken.
    /// Each partial replaces the previous one wholesale.
    Partial { text: String },
    /// Committed text for a completed utterance segment.
    Final { text: String },
    /// Recognizer-side error; the channel itself stays open.
    Error { message: String },
}

/// Outbound control message sent on the streaming channel.
///
/// Audio frames travel as raw binary; only control commands are textual.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Ask the recognizer to commit any pending hypothesis and flush.
    Finalize,
}
