//! Fourfold - Unified CLI
//!
//! Matchmaking server and stats tooling.

#![warn(missing_docs)]

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use fourfold_server::{
    AppState, GameRecorder, GameRepository, Matchmaker, NullRecorder, ServerConfig,
    TracingPublisher, router,
};
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fourfold_server=debug")),
        )
        .init();

    match cli.command {
        Command::Serve {
            config,
            host,
            port,
            db_path,
            no_db,
        } => run_server(config, host, port, db_path, no_db).await,
        Command::Leaderboard { db_path, limit } => show_leaderboard(db_path, limit),
    }
}

/// Run the matchmaking server
#[instrument(skip_all)]
async fn run_server(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    db_path: Option<String>,
    no_db: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    }
    .with_bind(host, port);
    if no_db {
        config = config.with_db_path(None);
    } else if db_path.is_some() {
        config = config.with_db_path(db_path);
    }

    let repository = match config.db_path() {
        Some(path) => {
            let repo = GameRepository::new(path.clone())?;
            repo.run_migrations()?;
            Some(repo)
        }
        None => {
            warn!("Persistence disabled, finished games will not be recorded");
            None
        }
    };

    let recorder: Arc<dyn GameRecorder> = match &repository {
        Some(repo) => Arc::new(repo.clone()),
        None => Arc::new(NullRecorder),
    };
    let matchmaker = Matchmaker::from_config(&config, recorder, Arc::new(TracingPublisher));
    let app = router(AppState::new(matchmaker, repository));

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!(
        address = %listener.local_addr()?,
        bot = %config.bot_name(),
        "Server ready, accepting WebSocket connections on /ws"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Print the leaderboard
#[instrument]
fn show_leaderboard(db_path: String, limit: usize) -> Result<()> {
    let repo = GameRepository::new(db_path)?;
    repo.run_migrations()?;
    let entries = repo.leaderboard(limit)?;

    if entries.is_empty() {
        println!("No games recorded yet.");
        return Ok(());
    }

    println!("{:<4} {:<20} {:>5} {:>5} {:>5} {:>5} {:>7}", "#", "Player", "Games", "W", "L", "D", "Win %");
    for (rank, entry) in entries.iter().enumerate() {
        let stats = entry.stats();
        println!(
            "{:<4} {:<20} {:>5} {:>5} {:>5} {:>5} {:>6.1}%",
            rank + 1,
            entry.display_name(),
            stats.total_games(),
            stats.wins(),
            stats.losses(),
            stats.draws(),
            stats.win_rate()
        );
    }
    Ok(())
}
