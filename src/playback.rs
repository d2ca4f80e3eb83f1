//! Reply audio playback seam
//!
//! The pipeline does not pull in an audio output stack; consumers provide a
//! [`Player`] for their platform. What the pipeline owns is the lifecycle:
//! starting new audio always cancels whatever was playing, and a new
//! recording gesture can interrupt playback at any time.

use crate::error::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::info;

/// Plays one piece of reply audio, addressed by URL.
///
/// `play` resolves when playback completes (or fails); implementations must
/// tolerate being cancelled mid-play by task abort.
#[async_trait::async_trait]
pub trait Player: Send + Sync {
    async fn play(&self, url: &str) -> Result<()>;
}

/// Serializes playback: at most one clip audible at a time.
pub struct PlaybackController {
    player: Arc<dyn Player>,
    current: Mutex<Option<AbortHandle>>,
}

impl PlaybackController {
    pub fn new(player: Arc<dyn Player>) -> Self {
        Self {
            player,
            current: Mutex::new(None),
        }
    }

    /// Start playing `url`, cancelling any previous playback first.
    ///
    /// Returns the playback task handle; the caller may await completion or
    /// let it run. An interrupted playback resolves as a cancelled join,
    /// not an error. Playback failure surfaces as
    /// [`crate::error::SpeechError::Playback`] and never blocks a
    /// subsequent recording.
    pub async fn play(&self, url: &str) -> JoinHandle<Result<()>> {
        self.stop().await;

        info!(%url, "Starting reply playback");
        let player = Arc::clone(&self.player);
        let url = url.to_string();
        let handle = tokio::spawn(async move { player.play(&url).await });

        let mut current = self.current.lock().await;
        *current = Some(handle.abort_handle());
        handle
    }

    /// Stop any active playback. Idempotent; safe to call with nothing
    /// playing.
    pub async fn stop(&self) {
        let mut current = self.current.lock().await;
        if let Some(handle) = current.take() {
            if !handle.is_finished() {
                info!("Interrupting active playback");
                handle.abort();
            }
        }
    }

    /// Whether a playback task is still running.
    pub async fn is_playing(&self) -> bool {
        let current = self.current.lock().await;
        current.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}
