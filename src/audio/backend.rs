use crate::error::{Result, SpeechError};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Audio sample data (16-bit PCM, mono)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for microphone capture.
///
/// The sample format is fixed by the remote recognizer contract: mono,
/// 16 kHz, 16-bit, with echo cancellation / noise suppression / auto gain
/// all requested from the device. The processing flags are requests --
/// backends apply them where the platform exposes the controls.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate in Hz (recognizer expects 16 kHz)
    pub sample_rate: u32,
    /// Channel count (1 = mono)
    pub channels: u16,
    /// Samples per delivered frame
    pub frame_size: usize,
    /// Request acoustic echo cancellation from the device
    pub echo_cancellation: bool,
    /// Request noise suppression from the device
    pub noise_suppression: bool,
    /// Request automatic gain control from the device
    pub auto_gain_control: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_size: 4096,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations own the device handle and deliver fixed-size frames in
/// production order over the returned channel. Device failure after start
/// is signalled by closing the channel.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive audio frames.
    /// Fails with [`SpeechError::DeviceUnavailable`] when the platform
    /// denies access or has no input device.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device. Idempotent.
    async fn stop(&mut self) -> Result<()>;

    /// Whether the backend is currently capturing.
    fn is_capturing(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Capture session lifecycle: `Idle -> Active -> Closing -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Active,
    Closing,
}

/// A capture session owning one microphone backend.
///
/// Wraps an [`AudioBackend`] with an explicit lifecycle: `open` transitions
/// Idle -> Active and hands back the frame receiver; `close` releases the
/// device on every exit path and is a no-op on an idle or already-closed
/// session.
pub struct CaptureSession {
    backend: Box<dyn AudioBackend>,
    state: CaptureState,
}

impl CaptureSession {
    /// Create a session around the default microphone backend.
    pub fn new(config: CaptureConfig) -> Self {
        Self::with_backend(Box::new(super::device::MicrophoneBackend::new(config)))
    }

    /// Create a session around an explicit backend (used by tests).
    pub fn with_backend(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            state: CaptureState::Idle,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Acquire the device and begin producing frames.
    pub async fn open(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.state == CaptureState::Active {
            warn!("Capture session already active");
            return Err(SpeechError::DeviceUnavailable);
        }

        let rx = self.backend.start().await?;
        self.state = CaptureState::Active;
        info!(backend = self.backend.name(), "Capture session opened");
        Ok(rx)
    }

    /// Stop the device stream and release all handles.
    ///
    /// Idempotent: closing an idle or already-closed session does nothing
    /// and never errors.
    pub async fn close(&mut self) {
        if self.state != CaptureState::Active {
            return;
        }
        self.state = CaptureState::Closing;

        if let Err(e) = self.backend.stop().await {
            warn!("Error while stopping capture backend: {}", e);
        }

        self.state = CaptureState::Idle;
        info!(backend = self.backend.name(), "Capture session closed");
    }
}
