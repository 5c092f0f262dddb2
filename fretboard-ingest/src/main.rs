//! fretboard-ingest - Main entry point
//!
//! Submits a YouTube link or an audio file to the analysis server, follows
//! the job until it completes and prints the normalized song as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fretboard_common::config::{ensure_directory_exists, resolve_config_path, resolve_data_folder};
use fretboard_common::events::{EventBus, IngestEvent};
use fretboard_ingest::client::HttpJobApi;
use fretboard_ingest::config::{
    IngestConfig, CONFIG_FILE_NAME, ENV_CONFIG_PATH, ENV_DATA_FOLDER,
};
use fretboard_ingest::models::{Preferences, ProgressUpdate, Song, SourceRef};
use fretboard_ingest::{ProcessingOrchestrator, ProgressCallback};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for fretboard-ingest
#[derive(Parser, Debug)]
#[command(name = "fretboard-ingest")]
#[command(about = "Turn songs into chord charts via the Fretboard analysis server")]
#[command(version)]
struct Args {
    /// Analysis server base URL
    #[arg(long, global = true, env = "FRETBOARD_SERVER_URL")]
    server: Option<String>,

    /// Path to ingest.toml
    #[arg(long, global = true, env = "FRETBOARD_INGEST_CONFIG")]
    config: Option<PathBuf>,

    /// Result cache database file
    #[arg(long, global = true, env = "FRETBOARD_CACHE_DB")]
    cache_db: Option<PathBuf>,

    /// Folder for persistent data
    #[arg(long, global = true, env = "FRETBOARD_DATA_FOLDER")]
    data_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a YouTube link or a local audio file
    Process {
        /// YouTube video URL
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,

        /// Local audio file to upload
        #[arg(long)]
        file: Option<PathBuf>,

        /// Target key for transposition (default C)
        #[arg(long)]
        key: Option<String>,

        /// Difficulty level 1-5 (default 3)
        #[arg(long)]
        difficulty: Option<u8>,
    },

    /// Print a previously processed song from the local cache
    Show {
        song_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the song JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fretboard_ingest=info,fretboard_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), ENV_CONFIG_PATH, CONFIG_FILE_NAME);
    let mut config = IngestConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config
        .apply_overrides(args.server, args.cache_db)
        .context("Invalid command-line option")?;

    let data_folder = resolve_data_folder(args.data_folder.as_deref(), ENV_DATA_FOLDER);
    ensure_directory_exists(&data_folder).context("Failed to create data folder")?;

    info!("Server: {}", config.server_url);
    info!("Data folder: {}", data_folder.display());

    let api = HttpJobApi::new(&config.server_url, config.request_timeout())
        .context("Failed to initialize HTTP client")?;
    let cache = config
        .open_cache(&data_folder)
        .await
        .context("Failed to open result cache")?;
    let events = EventBus::new(100);
    let orchestrator =
        ProcessingOrchestrator::new(Arc::new(api), cache, config.poller_config(), events);

    match args.command {
        Command::Process {
            url,
            file,
            key,
            difficulty,
        } => {
            let source = match (url, file) {
                (Some(url), None) => SourceRef::youtube(url)?,
                (None, Some(path)) => SourceRef::from_file(&path).await?,
                _ => bail!("Exactly one of --url or --file is required"),
            };
            let preferences = Preferences::new(key.as_deref(), difficulty);

            tokio::spawn(log_events(orchestrator.events().clone()));
            tokio::spawn(cancel_on_signal(orchestrator.clone()));

            let on_progress: ProgressCallback = Box::new(print_progress);
            let song = orchestrator
                .process(source, preferences, Some(on_progress))
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            print_song(&song)?;
        }
        Command::Show { song_id } => match orchestrator.load_cached(&song_id).await? {
            Some(song) => print_song(&song)?,
            None => bail!("Song {} is not in the local cache", song_id),
        },
    }

    Ok(())
}

fn print_progress(update: ProgressUpdate) {
    info!(
        "[{}] {:>5.1}% {}",
        update.attempt,
        update.progress,
        update.current_step
    );
}

fn print_song(song: &Song) -> Result<()> {
    info!(
        "{} chord changes using {}",
        song.chords.len(),
        song.unique_chord_names().join(", ")
    );
    let json = serde_json::to_string_pretty(song).context("Failed to serialize song")?;
    println!("{}", json);
    Ok(())
}

async fn log_events(events: EventBus) {
    let mut rx = events.subscribe();
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event log lagged, skipped {} events", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        match event {
            IngestEvent::JobSubmitted { job_id, source, .. } => {
                info!(job_id = %job_id, "Submitted {}", source)
            }
            IngestEvent::SongProcessed { song_id, title, artist, .. } => {
                info!(song_id = %song_id, "Processed \"{}\" by {}", title, artist)
            }
            IngestEvent::ProcessingFailed { message, .. } => warn!("{}", message),
            IngestEvent::JobProgress { .. } => {}
        }
    }
}

/// Cancel in-flight processing on Ctrl+C or SIGTERM
async fn cancel_on_signal(orchestrator: ProcessingOrchestrator) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling");
        },
        _ = terminate => {
            info!("Received terminate signal, cancelling");
        },
    }

    orchestrator.shutdown();
}
