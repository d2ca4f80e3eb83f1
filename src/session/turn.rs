use crate::audio::{AudioBackend, CaptureConfig, CaptureSession, CaptureState};
use crate::batch::{ChatReply, SpeechClient};
use crate::error::Result;
use crate::events::{EventBus, SessionEvent};
use crate::playback::{PlaybackController, Player};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Configuration for turn-based voice chat.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Recognition language code
    pub language: String,
    /// Microphone capture settings
    pub capture: CaptureConfig,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            capture: CaptureConfig::default(),
        }
    }
}

/// Result of one completed voice-chat turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// What the user said (batch recognition result)
    pub transcript: String,
    /// The tutor's reply
    pub reply: ChatReply,
}

/// Turn-based voice chat controller.
///
/// One turn is bracketed by an explicit user gesture: `start_recording`
/// buffers frames in memory until `complete_turn`, which runs the whole
/// exchange sequentially -- transcribe, chat, play the reply -- and emits
/// one typed event per step on the session bus. Recording and playback are
/// mutually exclusive: a new recording gesture interrupts any reply still
/// playing.
pub struct VoiceTurn {
    config: TurnConfig,
    client: SpeechClient,
    playback: Arc<PlaybackController>,
    events: EventBus,

    capture: Mutex<CaptureSession>,
    buffer: Arc<Mutex<Vec<i16>>>,
    collect_task: Mutex<Option<JoinHandle<()>>>,

    /// Conversation continuity across turns, echoed by the chat endpoint.
    session_id: Mutex<Option<String>>,
}

impl VoiceTurn {
    pub fn new(
        config: TurnConfig,
        client: SpeechClient,
        player: Arc<dyn Player>,
        events: EventBus,
    ) -> Self {
        let capture = CaptureSession::new(config.capture.clone());
        Self::with_capture(config, client, player, events, capture)
    }

    /// Build around an explicit capture backend (used by tests).
    pub fn with_backend(
        config: TurnConfig,
        client: SpeechClient,
        player: Arc<dyn Player>,
        events: EventBus,
        backend: Box<dyn AudioBackend>,
    ) -> Self {
        Self::with_capture(
            config,
            client,
            player,
            events,
            CaptureSession::with_backend(backend),
        )
    }

    fn with_capture(
        config: TurnConfig,
        client: SpeechClient,
        player: Arc<dyn Player>,
        events: EventBus,
        capture: CaptureSession,
    ) -> Self {
        Self {
            config,
            client,
            playback: Arc::new(PlaybackController::new(player)),
            events,
            capture: Mutex::new(capture),
            buffer: Arc::new(Mutex::new(Vec::new())),
            collect_task: Mutex::new(None),
            session_id: Mutex::new(None),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Begin buffering one utterance.
    ///
    /// Stops any reply audio still playing first (the microphone and the
    /// speaker compete for the same acoustic space), then acquires the
    /// device. Fails with `DeviceUnavailable` when the microphone cannot be
    /// opened; the error is also published as a user-facing event.
    pub async fn start_recording(&self) -> Result<()> {
        self.playback.stop().await;

        let mut capture = self.capture.lock().await;
        if capture.state() == CaptureState::Active {
            warn!("Turn recording already active");
            return Ok(());
        }

        self.buffer.lock().await.clear();

        let mut frame_rx = match capture.open().await {
            Ok(rx) => rx,
            Err(e) => {
                self.events.publish_error(&e);
                return Err(e);
            }
        };

        let buffer = Arc::clone(&self.buffer);
        let task = tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                buffer.lock().await.extend_from_slice(&frame.samples);
            }
        });
        *self.collect_task.lock().await = Some(task);

        info!("Turn recording started");
        Ok(())
    }

    /// Stop buffering and hand back the complete utterance.
    ///
    /// Idempotent: stopping without an active recording returns whatever
    /// the buffer holds (possibly nothing).
    pub async fn stop_recording(&self) -> Vec<i16> {
        self.capture.lock().await.close().await;

        if let Some(task) = self.collect_task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("Frame collection task failed: {}", e);
            }
        }

        let samples = std::mem::take(&mut *self.buffer.lock().await);
        info!(samples = samples.len(), "Turn recording stopped");
        samples
    }

    /// Finish the turn: stop recording, transcribe the utterance, run one
    /// conversational exchange and play the reply audio.
    ///
    /// Each step is awaited in order and emits its event before the next
    /// begins; an empty transcript (`NoSpeechDetected`) stops the chain
    /// before any chat call is made. Reply playback runs in the background
    /// so the outcome returns as soon as the exchange completes; playback
    /// failure is reported but never blocks the next turn.
    pub async fn complete_turn(&self) -> Result<TurnOutcome> {
        let samples = self.stop_recording().await;

        let transcript = match self
            .client
            .transcribe(&samples, &self.config.language)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                self.events.publish_error(&e);
                return Err(e);
            }
        };
        self.events
            .publish(SessionEvent::TurnTranscribed(transcript.clone()));

        let session_id = self.session_id.lock().await.clone();
        let reply = match self
            .client
            .chat(&transcript, &self.config.language, session_id.as_deref())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                self.events.publish_error(&e);
                return Err(e);
            }
        };

        if reply.session_id.is_some() {
            *self.session_id.lock().await = reply.session_id.clone();
        }

        self.events.publish(SessionEvent::ReplyReady {
            text: reply.text.clone(),
            audio_url: reply.audio_url.clone(),
        });

        if let Some(url) = &reply.audio_url {
            let handle = self.playback.play(url).await;
            self.events.publish(SessionEvent::PlaybackStarted);

            let events = self.events.clone();
            tokio::spawn(async move {
                match handle.await {
                    Ok(Ok(())) => events.publish(SessionEvent::PlaybackFinished),
                    Ok(Err(e)) => {
                        warn!("Reply playback failed: {}", e);
                        events.publish_error(&e);
                    }
                    // Interrupted by a new recording gesture.
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => warn!("Playback task failed: {}", e),
                }
            });
        }

        Ok(TurnOutcome { transcript, reply })
    }
}
