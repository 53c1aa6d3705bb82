use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reservation_trainer::{
    create_router, AppState, AudioFile, BookingDraft, Config, GeminiTextClient, ScenarioOptions,
    Trainer, WavDevices, WebSocketConnector,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "reservation-trainer", version, about = "Hotel reservation call trainer")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/reservation-trainer")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the control API
    Serve,

    /// Run one call, replaying a WAV file as the agent's microphone
    Call {
        /// Agent audio (overrides audio.input_wav)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Directory for the customer recording (overrides audio.output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Caller speaks Tagalog
        #[arg(long)]
        tagalog: bool,

        /// Caller is irate
        #[arg(long)]
        irate: bool,

        /// Customer voice (random preset if omitted)
        #[arg(long)]
        voice: Option<String>,

        /// Booking JSON submitted before hanging up
        #[arg(long)]
        booking: Option<PathBuf>,

        /// Seconds to keep listening after the input is exhausted
        #[arg(long, default_value_t = 5)]
        linger: u64,
    },
}

fn build_trainer(cfg: &Config, input: PathBuf, output_dir: PathBuf) -> Trainer {
    let devices = WavDevices::new(input, output_dir, cfg.audio.frame_size);
    let connector = WebSocketConnector::new(&cfg.gemini.live_url, &cfg.gemini.api_key);
    let generator = GeminiTextClient::new(
        &cfg.gemini.text_url,
        &cfg.gemini.text_model,
        &cfg.gemini.api_key,
    );

    Trainer::new(
        cfg.live(),
        Arc::new(connector),
        Arc::new(devices),
        Arc::new(generator),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Reservation Trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    if cfg.gemini.api_key.is_empty() {
        bail!("No API key: set gemini.api_key or GEMINI_API_KEY");
    }

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Call {
            input,
            output_dir,
            tagalog,
            irate,
            voice,
            booking,
            linger,
        } => {
            let options = ScenarioOptions {
                tagalog,
                irate,
                voice,
            };
            run_call(cfg, input, output_dir, options, booking, linger).await
        }
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let Some(input) = cfg.audio.input_wav.clone() else {
        bail!("audio.input_wav must point at the agent audio to replay");
    };

    let trainer = build_trainer(&cfg, input, cfg.audio.output_dir.clone());
    let app = create_router(AppState::new(Arc::new(trainer)));

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on {}", addr);
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}

async fn run_call(
    cfg: Config,
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    options: ScenarioOptions,
    booking: Option<PathBuf>,
    linger: u64,
) -> Result<()> {
    let Some(input) = input.or_else(|| cfg.audio.input_wav.clone()) else {
        bail!("No agent audio: pass --input or set audio.input_wav");
    };
    let output_dir = output_dir.unwrap_or_else(|| cfg.audio.output_dir.clone());

    let booking = match booking {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read booking {}", path.display()))?;
            let draft: BookingDraft =
                serde_json::from_str(&raw).context("Invalid booking JSON")?;
            Some(draft)
        }
        None => None,
    };

    let duration = AudioFile::open(&input)?.duration_seconds;
    let trainer = build_trainer(&cfg, input, output_dir);

    let voice = trainer
        .start_call(options)
        .await
        .context("Failed to start call")?;
    info!("Call started with voice {}, replaying {:.1}s of audio", voice, duration);

    tokio::time::sleep(Duration::from_secs_f64(duration) + Duration::from_secs(linger)).await;

    if let Some(draft) = booking {
        trainer.update_booking(draft).await;
        trainer.submit_booking().await?;
    }

    trainer.end_call().await;
    let evaluation = trainer.evaluation_settled().await;

    let status = trainer.status().await;
    if let Some(message) = &status.status_message {
        println!("Call error: {}", message);
    }

    println!("\n=== Transcript ===");
    for message in trainer.chat_log().await {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            message.role.prefix(),
            message.text
        );
    }

    if let Some(evaluation) = evaluation {
        println!("\n=== Evaluation ===");
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    }

    Ok(())
}
