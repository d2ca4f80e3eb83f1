pub mod audio;
pub mod batch;
pub mod config;
pub mod error;
pub mod events;
pub mod playback;
pub mod session;
pub mod stt;

pub use audio::{
    encode_wav, float_to_pcm16, AudioBackend, AudioFrame, CaptureConfig, CaptureSession,
    CaptureState, MicrophoneBackend,
};
pub use batch::{ChatReply, SpeechClient};
pub use config::Config;
pub use error::SpeechError;
pub use events::{EventBus, SessionEvent};
pub use playback::{PlaybackController, Player};
pub use session::{
    ChannelState, StreamingConfig, StreamingSession, TurnConfig, TurnOutcome, VoiceTurn,
};
pub use stt::{ControlMessage, ServerMessage, SttChannel, TranscriptState};
