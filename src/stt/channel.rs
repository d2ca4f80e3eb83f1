use super::messages::{ControlMessage, ServerMessage};
use crate::audio::pcm;
use crate::error::{Result, SpeechError};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One duplex connection to the streaming recognizer.
///
/// Outbound traffic is raw binary PCM frames plus the textual finalize
/// control message; inbound traffic is JSON [`ServerMessage`]s. The
/// connection's lifecycle is bound 1:1 to one capture session.
pub struct SttChannel {
    inner: WsStream,
}

impl SttChannel {
    /// Open the duplex channel, passing the recognition language as a
    /// query parameter.
    pub async fn connect(endpoint: &str, language: &str) -> Result<Self> {
        let url = format!(
            "{}?language={}",
            with_root_path(endpoint),
            urlencoding::encode(language)
        );
        info!(%url, "Connecting to streaming recognizer");

        let (inner, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| SpeechError::Channel(format!("connect failed: {}", e)))?;

        info!("Streaming channel open");
        Ok(Self { inner })
    }

    /// Split into independently owned send and receive halves so frame
    /// forwarding and message handling can run as separate tasks.
    pub fn split(self) -> (SttSink, SttSource) {
        let (sink, stream) = self.inner.split();
        (SttSink { sink }, SttSource { stream })
    }
}

/// Endpoints are commonly configured as a bare `ws://host:port`; the
/// handshake request line needs at least a root path before the query.
fn with_root_path(endpoint: &str) -> String {
    match endpoint.find("://") {
        Some(i) if !endpoint[i + 3..].contains('/') => format!("{}/", endpoint),
        _ => endpoint.to_string(),
    }
}

/// Send half of the channel.
pub struct SttSink {
    sink: SplitSink<WsStream, Message>,
}

impl SttSink {
    /// Transmit one audio frame as a raw binary message (16-bit LE PCM,
    /// no envelope).
    pub async fn send_audio(&mut self, samples: &[i16]) -> Result<()> {
        self.sink
            .send(Message::Binary(pcm::pcm16_to_bytes(samples)))
            .await
            .map_err(|e| SpeechError::Channel(format!("frame send failed: {}", e)))
    }

    /// Ask the recognizer to commit any pending hypothesis.
    pub async fn send_finalize(&mut self) -> Result<()> {
        let payload = serde_json::to_string(&ControlMessage::Finalize)
            .map_err(|e| SpeechError::Channel(format!("encode finalize: {}", e)))?;
        self.sink
            .send(Message::Text(payload))
            .await
            .map_err(|e| SpeechError::Channel(format!("finalize send failed: {}", e)))
    }

    /// Close the channel politely. Errors are ignored; the peer may
    /// already be gone.
    pub async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

/// Receive half of the channel.
pub struct SttSource {
    stream: SplitStream<WsStream>,
}

impl SttSource {
    /// Next recognizer message, in arrival order.
    ///
    /// Returns `None` once the channel closes. Non-text frames (pings,
    /// pongs) are skipped; unparseable payloads are logged and skipped
    /// rather than tearing down the session.
    pub async fn next_message(&mut self) -> Option<Result<ServerMessage>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(msg) => return Some(Ok(msg)),
                    Err(e) => {
                        warn!("Unparseable recognizer message: {} ({})", text, e);
                        continue;
                    }
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(SpeechError::Channel(format!("receive failed: {}", e))))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::with_root_path;

    #[test]
    fn bare_authority_endpoint_gets_a_root_path() {
        assert_eq!(
            with_root_path("ws://127.0.0.1:9000"),
            "ws://127.0.0.1:9000/"
        );
    }

    #[test]
    fn endpoint_with_path_is_unchanged() {
        assert_eq!(
            with_root_path("ws://localhost:8000/api/ws/speech-to-text"),
            "ws://localhost:8000/api/ws/speech-to-text"
        );
    }
}
