use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioSettings,
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// Default recognition language code
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct EndpointsConfig {
    /// Duplex streaming recognizer (ws:// or wss://)
    pub stream_url: String,
    /// Batch speech-to-text endpoint
    pub stt_url: String,
    /// Conversational exchange endpoint
    pub chat_url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "lingo-voice".to_string(),
                language: "en".to_string(),
            },
            audio: AudioSettings {
                sample_rate: 16000,
                channels: 1,
                frame_size: 4096,
            },
            endpoints: EndpointsConfig {
                stream_url: "ws://127.0.0.1:8000/api/ws/speech-to-text".to_string(),
                stt_url: "http://127.0.0.1:8000/api/speech-to-text".to_string(),
                chat_url: "http://127.0.0.1:8000/api/voice-chat".to_string(),
            },
        }
    }
}
