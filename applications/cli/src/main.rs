/// Cadence - terminal front end for the playback engine
use anyhow::Context;
use cadence_core::{Track, TrackId};
use cadence_playback::{AudioPlayer, Collaborators, PlaybackEvent, Session};
use cadence_storage::library::{self, NewTrack};
use cadence_storage::{SqliteLibrary, SqliteStore};
use clap::{Parser, Subcommand};
use settings::CliConfig;
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod backend;
mod commands;
mod renderer;
mod settings;

use backend::ClockPlayer;
use commands::{Input, HELP};
use renderer::LogRenderer;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Cadence playback engine driven from the terminal", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL, overrides the configuration
    #[arg(short, long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a playback session reading commands from stdin (default)
    Run,
    /// Add or update a library track
    AddTrack {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        /// Duration in seconds
        #[arg(long)]
        duration: u64,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        album: Option<String>,
        #[arg(long)]
        genre: Option<String>,
        /// File path, used by folder selectors and file:// URIs
        #[arg(long)]
        path: Option<String>,
        #[arg(long)]
        podcast: bool,
    },
    /// Create or replace a playlist
    Playlist {
        id: String,
        name: String,
        /// Track ids in playlist order
        tracks: Vec<String>,
    },
    /// Show library statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence=info,cadence_playback=info,cadence_storage=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(database) = cli.database {
        config.storage.database_url = database;
    }
    config.validate()?;

    let pool = cadence_storage::create_pool(&config.storage.database_url)
        .await
        .with_context(|| format!("opening {}", config.storage.database_url))?;
    cadence_storage::run_migrations(&pool).await?;

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config, pool.clone()).await,
        Commands::AddTrack {
            id,
            title,
            duration,
            artist,
            album,
            genre,
            path,
            podcast,
        } => {
            let mut track = Track::new(TrackId::new(id), title, duration.saturating_mul(1_000));
            track.artist = artist;
            track.album = album;
            track.is_podcast = podcast;
            let mut new = NewTrack::new(track);
            new.genre = genre;
            new.path = path;
            library::upsert_track(&pool, &new).await.map_err(Into::into)
        }
        Commands::Playlist { id, name, tracks } => {
            let ids: Vec<TrackId> = tracks.into_iter().map(TrackId::new).collect();
            library::save_playlist(&pool, &id, &name, &ids)
                .await
                .map_err(Into::into)
        }
        Commands::Stats => {
            let count = library::count(&pool).await?;
            println!("{count} tracks in library");
            Ok(())
        }
    };

    pool.close().await;
    result
}

async fn run(config: CliConfig, pool: SqlitePool) -> anyhow::Result<()> {
    let store = SqliteStore::new(pool.clone());
    let collaborators = Collaborators {
        retriever: Arc::new(SqliteLibrary::new(pool.clone())),
        persistence: Arc::new(store.clone()),
        favorites: Arc::new(store),
    };

    let session = Session::start(
        config.playback,
        |sinks| sinks.map(|sink| Box::new(ClockPlayer::new(sink)) as Box<dyn AudioPlayer>),
        collaborators,
        Box::new(LogRenderer::new()),
    );
    let reporter = tokio::spawn(report_events(session.subscribe(), pool));

    println!("Type 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match commands::parse_line(&line) {
                    Ok(Input::Command(command)) => session.send(command)?,
                    Ok(Input::Help) => println!("{HELP}"),
                    Ok(Input::Quit) => break,
                    Ok(Input::Empty) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Stopping playback session");
    session.stop().await;
    reporter.abort();
    Ok(())
}

/// Log engine events and count plays
async fn report_events(mut events: broadcast::Receiver<PlaybackEvent>, pool: SqlitePool) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event reporter lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match &event {
            PlaybackEvent::MetadataChanged {
                metadata: Some(metadata),
            } => {
                if let Err(e) = library::record_play(&pool, &metadata.id).await {
                    tracing::warn!("Failed to record play of {}: {}", metadata.id, e);
                }
            }
            PlaybackEvent::StateChanged { session } => {
                tracing::info!(bookmark_ms = session.bookmark_ms, "Playback {}", session.status);
            }
            PlaybackEvent::QueueChanged { len, current } => {
                tracing::info!(len, current = ?current, "Queue changed");
            }
            PlaybackEvent::Error { message } => tracing::warn!("{}", message),
            other => tracing::debug!(event = other.event_type(), "Playback event"),
        }
    }
}
