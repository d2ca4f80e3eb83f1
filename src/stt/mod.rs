//! Streaming transcription transport and state
//!
//! This module provides:
//! - Wire message types shared with the remote recognizer
//! - The duplex channel client (binary frames out, JSON results in)
//! - Partial/final transcript state tracking

pub mod channel;
pub mod messages;
pub mod transcript;

pub use channel::{SttChannel, SttSink, SttSource};
pub use messages::{ControlMessage, ServerMessage};
pub use transcript::TranscriptState;
