use crate::audio::{AudioBackend, CaptureConfig, CaptureSession};
use crate::error::{Result, SpeechError};
use crate::events::{EventBus, SessionEvent};
use crate::stt::{ServerMessage, SttChannel, SttSink, SttSource, TranscriptState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Streaming channel lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Open,
    Finalizing,
    Closed,
}

/// Configuration for one streaming transcription session.
#[derive(Debug, Clone)]
pub struct StreamingConfig {
    /// Duplex channel endpoint (accepts a `language` query parameter)
    pub endpoint: String,
    /// Recognition language code
    pub language: String,
    /// Microphone capture settings
    pub capture: CaptureConfig,
    /// How long `stop` waits for a trailing final result
    pub finalize_grace: Duration,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8000/api/ws/speech-to-text".to_string(),
            language: "en".to_string(),
            capture: CaptureConfig::default(),
            finalize_grace: Duration::from_millis(500),
        }
    }
}

/// A live transcription session that manages microphone capture, frame
/// forwarding over the duplex channel, and partial/final transcript state.
///
/// Lifecycle: `Idle -> Connecting -> Open -> Finalizing -> Closed`, one
/// session per object. `start` confirms microphone access before any
/// channel connection is attempted; frames produced while the channel
/// handshake completes are buffered in the capture channel and flushed in
/// production order once forwarding begins, so none are lost.
pub struct StreamingSession {
    config: StreamingConfig,
    events: EventBus,

    state: Arc<Mutex<ChannelState>>,
    transcript: Arc<Mutex<TranscriptState>>,
    capture: Arc<Mutex<CaptureSession>>,
    sink: Arc<Mutex<Option<SttSink>>>,

    /// Wakes the finalize grace wait when a trailing final commits.
    final_notify: Arc<Notify>,
    /// Wakes the finalize grace wait when the channel closes underneath it.
    closed_notify: Arc<Notify>,

    forward_task: Mutex<Option<JoinHandle<()>>>,
    read_task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamingSession {
    /// Create a session using the default microphone backend.
    pub fn new(config: StreamingConfig, events: EventBus) -> Self {
        let capture = CaptureSession::new(config.capture.clone());
        Self::with_capture(config, events, capture)
    }

    /// Create a session around an explicit capture backend (used by tests).
    pub fn with_backend(
        config: StreamingConfig,
        events: EventBus,
        backend: Box<dyn AudioBackend>,
    ) -> Self {
        Self::with_capture(config, events, CaptureSession::with_backend(backend))
    }

    fn with_capture(config: StreamingConfig, events: EventBus, capture: CaptureSession) -> Self {
        Self {
            config,
            events,
            state: Arc::new(Mutex::new(ChannelState::Idle)),
            transcript: Arc::new(Mutex::new(TranscriptState::new())),
            capture: Arc::new(Mutex::new(capture)),
            sink: Arc::new(Mutex::new(None)),
            final_notify: Arc::new(Notify::new()),
            closed_notify: Arc::new(Notify::new()),
            forward_task: Mutex::new(None),
            read_task: Mutex::new(None),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn state(&self) -> ChannelState {
        *self.state.lock().await
    }

    /// Current transcript snapshot.
    pub async fn transcript(&self) -> TranscriptState {
        self.transcript.lock().await.clone()
    }

    /// Open the microphone, connect the duplex channel and begin streaming.
    ///
    /// Microphone access is confirmed first: when the device is denied or
    /// absent no channel connection is attempted and the error is surfaced
    /// both as a return value and a user-facing event. A connect failure
    /// releases the device before returning.
    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if *state != ChannelState::Idle {
                warn!("Streaming session already started");
                return Ok(());
            }
            *state = ChannelState::Connecting;
        }

        info!(language = %self.config.language, "Starting streaming session");

        // 1. Microphone first. Frames produced from here on buffer in the
        //    capture channel until forwarding starts.
        let frame_rx = {
            let mut capture = self.capture.lock().await;
            match capture.open().await {
                Ok(rx) => rx,
                Err(e) => {
                    *self.state.lock().await = ChannelState::Idle;
                    self.events.publish_error(&e);
                    return Err(e);
                }
            }
        };

        // 2. Duplex channel.
        let channel = match SttChannel::connect(&self.config.endpoint, &self.config.language).await
        {
            Ok(channel) => channel,
            Err(e) => {
                self.capture.lock().await.close().await;
                {
                    let mut state = self.state.lock().await;
                    // A stop during the handshake already marked us closed.
                    if *state == ChannelState::Connecting {
                        *state = ChannelState::Idle;
                    }
                }
                self.events.publish_error(&e);
                return Err(e);
            }
        };

        let (mut sink, source) = channel.split();
        {
            let mut state = self.state.lock().await;
            if *state != ChannelState::Connecting {
                // A stop arrived while the handshake was in flight.
                drop(state);
                sink.close().await;
                self.capture.lock().await.close().await;
                info!("Streaming session stopped during connect");
                return Ok(());
            }
            *state = ChannelState::Open;
        }
        *self.sink.lock().await = Some(sink);

        // 3. Forward frames in production order.
        {
            let mut handle = self.forward_task.lock().await;
            *handle = Some(tokio::spawn(forward_frames(
                frame_rx,
                Arc::clone(&self.sink),
                Arc::clone(&self.state),
                Arc::clone(&self.capture),
                Arc::clone(&self.closed_notify),
                self.events.clone(),
            )));
        }

        // 4. Apply inbound messages in arrival order.
        {
            let mut handle = self.read_task.lock().await;
            *handle = Some(tokio::spawn(read_messages(
                source,
                Arc::clone(&self.transcript),
                Arc::clone(&self.state),
                Arc::clone(&self.capture),
                Arc::clone(&self.sink),
                Arc::clone(&self.final_notify),
                Arc::clone(&self.closed_notify),
                self.events.clone(),
            )));
        }

        info!("Streaming session open");
        Ok(())
    }

    /// Stop the session: send one finalize command, wait up to the grace
    /// period for a trailing final result, release all resources and return
    /// the full transcript (None when empty).
    ///
    /// Idempotent: a second stop while finalizing or closed is a no-op and
    /// neither sends another finalize nor emits another completion event.
    pub async fn stop(&self) -> Result<Option<String>> {
        {
            let mut state = self.state.lock().await;
            match *state {
                ChannelState::Open => *state = ChannelState::Finalizing,
                ChannelState::Connecting => {
                    // Stop raced a handshake still in flight. Mark the
                    // session closed so `start` abandons the channel once
                    // the connect resolves, and release the device now.
                    *state = ChannelState::Closed;
                    drop(state);
                    info!("Stop requested during connect, releasing microphone");
                    self.capture.lock().await.close().await;
                    return Ok(None);
                }
                ChannelState::Idle | ChannelState::Finalizing | ChannelState::Closed => {
                    return Ok(None);
                }
            }
        }

        info!("Stopping streaming session");

        {
            let mut sink = self.sink.lock().await;
            if let Some(sink) = sink.as_mut() {
                if let Err(e) = sink.send_finalize().await {
                    warn!("Failed to send finalize command: {}", e);
                }
            }
        }

        // Bounded wait for the recognizer to commit the tail of the
        // utterance; ends early on a trailing final or a channel close.
        let grace = self.config.finalize_grace;
        let _ = tokio::time::timeout(grace, async {
            tokio::select! {
                _ = self.final_notify.notified() => {}
                _ = self.closed_notify.notified() => {}
            }
        })
        .await;

        self.teardown().await;

        let full_text = self.transcript.lock().await.full_text();
        if full_text.is_empty() {
            info!("Streaming session closed (no speech)");
            Ok(None)
        } else {
            info!(chars = full_text.len(), "Streaming session closed");
            self.events
                .publish(SessionEvent::TranscriptCompleted(full_text.clone()));
            Ok(Some(full_text))
        }
    }

    /// Release the device and channel and stop both tasks. Safe to call
    /// repeatedly; an outstanding grace wait is abandoned, not awaited.
    async fn teardown(&self) {
        *self.state.lock().await = ChannelState::Closed;

        self.capture.lock().await.close().await;

        if let Some(mut sink) = self.sink.lock().await.take() {
            sink.close().await;
        }

        if let Some(handle) = self.forward_task.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.read_task.lock().await.take() {
            handle.abort();
        }
    }
}

/// Release everything after an unrequested channel failure. Returns false
/// when the session was already closed (nothing to do, no error to report).
async fn abrupt_close(
    state: &Mutex<ChannelState>,
    capture: &Mutex<CaptureSession>,
    sink: &Mutex<Option<SttSink>>,
    closed_notify: &Notify,
) -> bool {
    let was_requested = {
        let mut st = state.lock().await;
        match *st {
            ChannelState::Closed => return false,
            ChannelState::Finalizing => {
                *st = ChannelState::Closed;
                true
            }
            _ => {
                *st = ChannelState::Closed;
                false
            }
        }
    };

    // Resources are released before any error is surfaced.
    capture.lock().await.close().await;
    if let Some(mut s) = sink.lock().await.take() {
        s.close().await;
    }
    closed_notify.notify_one();

    !was_requested
}

/// Forward captured frames to the channel in production order.
async fn forward_frames(
    mut frame_rx: mpsc::Receiver<crate::audio::AudioFrame>,
    sink: Arc<Mutex<Option<SttSink>>>,
    state: Arc<Mutex<ChannelState>>,
    capture: Arc<Mutex<CaptureSession>>,
    closed_notify: Arc<Notify>,
    events: EventBus,
) {
    info!("Frame forwarding task started");

    let mut channel_broken = false;
    while let Some(frame) = frame_rx.recv().await {
        let mut sink_guard = sink.lock().await;
        let Some(s) = sink_guard.as_mut() else {
            channel_broken = true;
            break;
        };
        if let Err(e) = s.send_audio(&frame.samples).await {
            // The read task observes the same failure and closes the
            // session; just stop forwarding.
            warn!("Frame send failed: {}", e);
            channel_broken = true;
            break;
        }
    }

    // Frame stream ended. During a requested stop the capture closes first
    // and this is the normal exit; with the session still Open and the
    // channel healthy it means the device died mid-session and forces an
    // implicit close.
    let device_failed = !channel_broken && *state.lock().await == ChannelState::Open;
    if device_failed {
        error!("Capture ended unexpectedly while streaming");
        if abrupt_close(&state, &capture, &sink, &closed_notify).await {
            events.publish_error(&SpeechError::DeviceUnavailable);
        }
    }

    info!("Frame forwarding task stopped");
}

/// Apply inbound recognizer messages to the transcript, in arrival order.
#[allow(clippy::too_many_arguments)]
async fn read_messages(
    mut source: SttSource,
    transcript: Arc<Mutex<TranscriptState>>,
    state: Arc<Mutex<ChannelState>>,
    capture: Arc<Mutex<CaptureSession>>,
    sink: Arc<Mutex<Option<SttSink>>>,
    final_notify: Arc<Notify>,
    closed_notify: Arc<Notify>,
    events: EventBus,
) {
    info!("Message handling task started");

    loop {
        match source.next_message().await {
            Some(Ok(message)) => {
                let committed = transcript.lock().await.apply(&message);
                match message {
                    ServerMessage::Partial { text } => {
                        events.publish(SessionEvent::PartialTranscript(text));
                    }
                    ServerMessage::Final { text } => {
                        events.publish(SessionEvent::CommittedTranscript(text));
                    }
                    ServerMessage::Error { message } => {
                        // Recognizer-side error; the channel stays open.
                        warn!("Recognizer reported error: {}", message);
                        events.publish(SessionEvent::Error {
                            message,
                            user_facing: false,
                        });
                    }
                }
                // Only a commit that lands during the finalize window may
                // wake the grace wait. Notifying on every commit would
                // store a permit that a later `stop` consumes immediately,
                // skipping the wait and dropping the trailing segment.
                if committed && *state.lock().await == ChannelState::Finalizing {
                    final_notify.notify_one();
                }
            }
            Some(Err(e)) => {
                if abrupt_close(&state, &capture, &sink, &closed_notify).await {
                    error!("Streaming channel failed: {}", e);
                    events.publish_error(&e);
                }
                break;
            }
            None => {
                if abrupt_close(&state, &capture, &sink, &closed_notify).await {
                    warn!("Streaming channel closed by peer");
                    events.publish_error(&SpeechError::Channel(
                        "channel closed unexpectedly".to_string(),
                    ));
                }
                break;
            }
        }
    }

    info!("Message handling task stopped");
}
