use super::messages::ServerMessage;

/// Incremental transcript state for one streaming session.
///
/// `partial` holds the recognizer's current in-progress hypothesis and is
/// replaced wholesale by each partial message. `final_text` holds committed
/// text, append-only within a session, space-joined and trimmed. The moment
/// a final message commits, the partial is cleared -- the final text is the
/// recognizer-confirmed version of the hypothesis it supersedes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptState {
    /// Best-effort in-progress recognition of the current utterance.
    pub partial: String,
    /// Concatenated committed text.
    pub final_text: String,
}

impl TranscriptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one inbound message in arrival order.
    ///
    /// Returns `true` when the message committed final text (used by the
    /// session to end the finalize grace wait early). Error messages do not
    /// touch transcript state.
    pub fn apply(&mut self, message: &ServerMessage) -> bool {
        match message {
            ServerMessage::Partial { text } => {
                self.partial = text.clone();
                false
            }
            ServerMessage::Final { text } => {
                self.final_text = join_trimmed(&self.final_text, text);
                self.partial.clear();
                true
            }
            ServerMessage::Error { .. } => false,
        }
    }

    /// Derived full text: committed text followed by the pending partial,
    /// space-joined and trimmed. Never stored independently.
    pub fn full_text(&self) -> String {
        join_trimmed(&self.final_text, &self.partial)
    }

    pub fn is_empty(&self) -> bool {
        self.partial.is_empty() && self.final_text.is_empty()
    }
}

fn join_trimmed(left: &str, right: &str) -> String {
    format!("{} {}", left, right).trim().to_string()
}
