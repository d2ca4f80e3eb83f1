use crate::audio::pcm;
use crate::error::{Result, SpeechError};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Client for the batch recognition and conversational-exchange endpoints.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: reqwest::Client,
    stt_url: String,
    chat_url: String,
}

/// Request body for the conversational exchange.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

/// Reply from the conversational exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub text: String,
    #[serde(rename = "audioUrl")]
    pub audio_url: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl SpeechClient {
    pub fn new(stt_url: impl Into<String>, chat_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            stt_url: stt_url.into(),
            chat_url: chat_url.into(),
        }
    }

    /// Transcribe one recorded utterance.
    ///
    /// Wraps the samples into a WAVE container and submits them as a single
    /// multipart upload (`audio` + `language` fields). Fails with
    /// [`SpeechError::RecognitionFailed`] on a non-success status (carrying
    /// status code and body for diagnostics) and
    /// [`SpeechError::NoSpeechDetected`] when the transcript comes back
    /// empty -- reported to the user, never silently retried.
    pub async fn transcribe(&self, samples: &[i16], language: &str) -> Result<String> {
        let wav = pcm::encode_wav_pcm16(samples, 16000);
        info!(
            bytes = wav.len(),
            language, "Submitting recorded turn for recognition"
        );

        let audio_part = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| SpeechError::Channel(format!("build upload: {}", e)))?;
        let form = Form::new()
            .part("audio", audio_part)
            .text("language", language.to_string());

        let response = self
            .client
            .post(&self.stt_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SpeechError::Channel(format!("recognition request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SpeechError::Channel(format!("read recognition response: {}", e)))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Recognition endpoint rejected upload");
            return Err(SpeechError::RecognitionFailed {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse = serde_json::from_str(&body).map_err(|e| {
            SpeechError::RecognitionFailed {
                status: status.as_u16(),
                body: format!("unparseable response ({}): {}", e, body),
            }
        })?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(SpeechError::NoSpeechDetected);
        }

        info!(chars = text.len(), "Turn transcribed");
        Ok(text)
    }

    /// One conversational exchange: send the transcript, get the tutor's
    /// reply text plus an optional reply-audio URL and the (possibly newly
    /// created) conversation session id.
    pub async fn chat(
        &self,
        message: &str,
        language: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply> {
        let request = ChatRequest {
            message,
            language,
            session_id,
        };

        let response = self
            .client
            .post(&self.chat_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SpeechError::Channel(format!("chat request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::RecognitionFailed {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ChatReply>()
            .await
            .map_err(|e| SpeechError::Channel(format!("parse chat response: {}", e)))
    }
}
