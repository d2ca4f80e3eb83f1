pub mod client;

pub use client::{ChatReply, SpeechClient};
