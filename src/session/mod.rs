//! Session controllers
//!
//! Two ways to get speech into text:
//! - `StreamingSession`: continuous capture with live partial/final results
//!   over the duplex channel
//! - `VoiceTurn`: record one utterance, recognize it in a single batch
//!   request, then run the conversational exchange and play the reply

mod streaming;
mod turn;

pub use streaming::{ChannelState, StreamingConfig, StreamingSession};
pub use turn::{TurnConfig, TurnOutcome, VoiceTurn};
