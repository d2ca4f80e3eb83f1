pub mod backend;
pub mod device;
pub mod pcm;

pub use backend::{AudioBackend, AudioFrame, CaptureConfig, CaptureSession, CaptureState};
pub use device::MicrophoneBackend;
pub use pcm::{encode_wav, encode_wav_pcm16, float_to_pcm16, pcm16_to_bytes, WAV_HEADER_LEN};
