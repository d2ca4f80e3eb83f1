//! Microphone capture backend built on cpal.
//!
//! A dedicated worker thread owns the cpal input stream (cpal streams are
//! not `Send`), reframes the device callback buffers into fixed-size mono
//! frames and forwards them to the async side. The device callback itself
//! never blocks: it hands raw sample chunks to the worker over an unbounded
//! channel, so no frame is dropped even when the async consumer lags.

use crate::audio::backend::{AudioBackend, AudioFrame, CaptureConfig};
use crate::audio::pcm;
use crate::error::{Result, SpeechError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Frames buffered toward the async consumer before backpressure applies.
const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Default-input-device capture backend.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.running.load(Ordering::SeqCst) {
            warn!("Microphone backend already capturing");
            return Err(SpeechError::DeviceUnavailable);
        }

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (open_tx, open_rx) = oneshot::channel::<Result<()>>();

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();

        let worker = std::thread::spawn(move || {
            capture_worker(config, running, frame_tx, open_tx);
        });
        self.worker = Some(worker);

        // Wait for the worker to report whether the device opened.
        match open_rx.await {
            Ok(Ok(())) => Ok(frame_rx),
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                self.join_worker().await;
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                self.join_worker().await;
                Err(SpeechError::DeviceUnavailable)
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.join_worker().await;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone (cpal)"
    }
}

impl MicrophoneBackend {
    async fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            let joined = tokio::task::spawn_blocking(move || handle.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                warn!("Capture worker did not shut down cleanly");
            }
        }
    }
}

/// Owns the cpal stream for the lifetime of one capture.
fn capture_worker(
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    frame_tx: mpsc::Sender<AudioFrame>,
    open_tx: oneshot::Sender<Result<()>>,
) {
    let (chunk_tx, chunk_rx) = std_mpsc::channel::<Vec<i16>>();

    let stream = match build_input_stream(&config, chunk_tx, Arc::clone(&running)) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = open_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        error!("Failed to start input stream: {}", e);
        let _ = open_tx.send(Err(SpeechError::DeviceUnavailable));
        return;
    }

    let _ = open_tx.send(Ok(()));
    info!(
        sample_rate = config.sample_rate,
        frame_size = config.frame_size,
        "Microphone stream started"
    );

    // Reframe callback chunks into fixed-size frames. The loop wakes on a
    // short timeout so a stop request is noticed even during silence.
    let mut pending: Vec<i16> = Vec::with_capacity(config.frame_size * 2);
    let mut samples_delivered: u64 = 0;

    while running.load(Ordering::SeqCst) {
        match chunk_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(chunk) => {
                pending.extend_from_slice(&chunk);
                while pending.len() >= config.frame_size {
                    let samples: Vec<i16> = pending.drain(..config.frame_size).collect();
                    let timestamp_ms = samples_delivered * 1000 / config.sample_rate as u64;
                    samples_delivered += samples.len() as u64;

                    let frame = AudioFrame {
                        samples,
                        sample_rate: config.sample_rate,
                        channels: config.channels,
                        timestamp_ms,
                    };

                    // blocking_send is fine here: this is the worker thread,
                    // not the device callback.
                    if frame_tx.blocking_send(frame).is_err() {
                        // Consumer gone; stop capturing.
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(stream);
    info!("Microphone stream stopped");
}

fn build_input_stream(
    config: &CaptureConfig,
    chunk_tx: std_mpsc::Sender<Vec<i16>>,
    running: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        error!("No default input device available");
        SpeechError::DeviceUnavailable
    })?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    info!(device = %device_name, "Opening input device");

    let supported = find_input_config(&device, config.sample_rate)?;
    let sample_format = supported.sample_format();
    let channels = supported.channels();
    let stream_config: cpal::StreamConfig = supported.into();

    let err_running = Arc::clone(&running);
    let err_fn = move |e: cpal::StreamError| {
        // Terminal device error: the frame channel closes when the worker
        // exits, which the session surfaces as an implicit close.
        error!("Input stream error: {}", e);
        err_running.store(false, Ordering::SeqCst);
    };

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| {
                let mono = take_first_channel_f32(data, channels);
                let _ = chunk_tx.send(pcm::float_to_pcm16(&mono));
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| {
                let mono: Vec<i16> = data.iter().step_by(channels as usize).copied().collect();
                let _ = chunk_tx.send(mono);
            },
            err_fn,
            None,
        ),
        other => {
            error!("Unsupported input sample format: {:?}", other);
            return Err(SpeechError::DeviceUnavailable);
        }
    };

    stream.map_err(|e| {
        error!("Failed to build input stream: {}", e);
        SpeechError::DeviceUnavailable
    })
}

/// Pick an input configuration supporting the target sample rate, preferring
/// the fewest channels.
fn find_input_config(
    device: &cpal::Device,
    target_rate: u32,
) -> Result<cpal::SupportedStreamConfig> {
    let configs = device.supported_input_configs().map_err(|e| {
        error!("Failed to query input configs: {}", e);
        SpeechError::DeviceUnavailable
    })?;

    let mut best: Option<cpal::SupportedStreamConfigRange> = None;
    for range in configs {
        let supports_rate = range.min_sample_rate().0 <= target_rate
            && range.max_sample_rate().0 >= target_rate;
        if !supports_rate {
            continue;
        }
        let better = match &best {
            None => true,
            Some(current) => range.channels() < current.channels(),
        };
        if better {
            best = Some(range);
        }
    }

    match best {
        Some(range) => Ok(range.with_sample_rate(cpal::SampleRate(target_rate))),
        None => {
            // Fall back to the device default; the reframer still takes the
            // first channel, but the rate will not match the recognizer.
            warn!(
                "Device does not support {} Hz natively, using its default config",
                target_rate
            );
            device.default_input_config().map_err(|e| {
                error!("Failed to get default input config: {}", e);
                SpeechError::DeviceUnavailable
            })
        }
    }
}

fn take_first_channel_f32(data: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.iter().step_by(channels as usize).copied().collect()
}
