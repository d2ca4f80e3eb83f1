use anyhow::Result;
use clap::{Parser, Subcommand};
use lingo_voice::{
    CaptureConfig, Config, EventBus, SessionEvent, SpeechClient, StreamingConfig,
    StreamingSession, TurnConfig, VoiceTurn,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "lingo-voice", about = "Speech capture and streaming transcription")]
struct Cli {
    /// Configuration file (without extension)
    #[arg(long, default_value = "config/lingo-voice")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Live transcription: stream the microphone until Enter is pressed
    Stream {
        /// Override the configured recognition language
        #[arg(long)]
        language: Option<String>,
    },
    /// One voice-chat turn: record until Enter, then transcribe and chat
    Turn {
        /// Override the configured recognition language
        #[arg(long)]
        language: Option<String>,
    },
}

/// Reply audio sink for the CLI: the URL is logged rather than played.
struct ConsolePlayer;

#[async_trait::async_trait]
impl lingo_voice::Player for ConsolePlayer {
    async fn play(&self, url: &str) -> lingo_voice::error::Result<()> {
        info!(%url, "Reply audio ready");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config).unwrap_or_else(|e| {
        info!("No config file loaded ({}), using defaults", e);
        Config::default()
    });

    info!("{} starting", cfg.service.name);

    let capture = CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        frame_size: cfg.audio.frame_size,
        ..CaptureConfig::default()
    };

    match cli.command {
        Command::Stream { language } => {
            let config = StreamingConfig {
                endpoint: cfg.endpoints.stream_url.clone(),
                language: language.unwrap_or_else(|| cfg.service.language.clone()),
                capture,
                finalize_grace: Duration::from_millis(500),
            };
            run_stream(config).await
        }
        Command::Turn { language } => {
            let config = TurnConfig {
                language: language.unwrap_or_else(|| cfg.service.language.clone()),
                capture,
            };
            let client = SpeechClient::new(&cfg.endpoints.stt_url, &cfg.endpoints.chat_url);
            run_turn(config, client).await
        }
    }
}

async fn run_stream(config: StreamingConfig) -> Result<()> {
    let events = EventBus::default();
    let mut rx = events.subscribe();
    let session = StreamingSession::new(config, events);

    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                SessionEvent::PartialTranscript(text) => {
                    print!("\r{}", text);
                    use std::io::Write;
                    std::io::stdout().flush().ok();
                }
                SessionEvent::CommittedTranscript(text) => println!("\n{}", text),
                SessionEvent::Error { message, .. } => eprintln!("\nerror: {}", message),
                _ => {}
            }
        }
    });

    session.start().await?;
    println!("Listening... press Enter to stop.");
    wait_for_enter().await;

    match session.stop().await? {
        Some(text) => println!("\nTranscript: {}", text),
        None => println!("\nNo speech captured."),
    }

    printer.abort();
    Ok(())
}

async fn run_turn(config: TurnConfig, client: SpeechClient) -> Result<()> {
    let events = EventBus::default();
    let turn = VoiceTurn::new(config, client, Arc::new(ConsolePlayer), events);

    turn.start_recording().await?;
    println!("Recording... press Enter to stop.");
    wait_for_enter().await;

    let outcome = turn.complete_turn().await?;
    println!("You said: {}", outcome.transcript);
    println!("Reply: {}", outcome.reply.text);

    Ok(())
}

async fn wait_for_enter() {
    let mut line = String::new();
    let mut reader = BufReader::new(tokio::io::stdin());
    let _ = reader.read_line(&mut line).await;
}
