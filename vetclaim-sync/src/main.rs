//! vetclaim-sync - VA.gov claims scraper and VetClaim sync agent
//!
//! One-shot subcommands drive a single operation; `daemon` runs the periodic
//! sync timer and serves the command bus as JSON lines on stdin/stdout.
//! Logs go to stderr (or the configured file) so stdout stays machine
//! readable.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vetclaim_common::commands::Command;
use vetclaim_common::config::{self, LoggingConfig, TomlConfig};
use vetclaim_common::store::{initialize_store, SqliteStore};
use vetclaim_common::time::SystemClock;
use vetclaim_sync::notify::TracingNotifier;
use vetclaim_sync::AppState;

/// Command-line arguments for vetclaim-sync
#[derive(Parser, Debug)]
#[command(name = "vetclaim-sync")]
#[command(about = "Scrape VA.gov benefit claims and sync them to VetClaim Services")]
#[command(version)]
struct Args {
    /// Config file (overrides VETCLAIM_CONFIG and the platform default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write install defaults to the store and a default config file
    Init,
    /// Print the backend session status
    Status,
    /// Run one fetch cycle
    Fetch {
        /// Ignore the cooldown
        #[arg(long)]
        force: bool,
    },
    /// Re-deliver the cached claims
    Sync,
    /// Store backend tokens from a web login
    Login {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        refresh_token: String,
        /// User profile as JSON
        #[arg(long)]
        user_data: Option<String>,
    },
    /// Periodic sync plus the JSON-lines command bus
    Daemon,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_source) = config::load_config_with_source(args.config.as_deref());
    init_tracing(&config.logging)?;

    info!(
        "Starting vetclaim-sync {} ({}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config_source.log();

    let store = Arc::new(
        SqliteStore::open(&config.store_path)
            .await
            .context("Failed to open store")?,
    );
    info!("Store: {}", config.store_path.display());

    if let Cmd::Init = args.command {
        let config_path = config_source.path().map(Path::to_path_buf);
        return init(store.as_ref(), config_path, &config).await;
    }

    let state = AppState::new(
        &config,
        store,
        Arc::new(SystemClock),
        Arc::new(TracingNotifier),
    )
    .await
    .context("Failed to initialize clients")?;

    match args.command {
        Cmd::Init => Ok(()),
        Cmd::Status => {
            let response = state.dispatcher.handle(Command::RequestAuthStatus).await;
            print_json(&response)
        }
        Cmd::Fetch { force } => {
            let report = state.pipeline.run_cycle(force).await;
            print_json(&report.summary())
        }
        Cmd::Sync => {
            let outcome = state.sync.resync_cached().await;
            print_json(&json!({
                "synced": outcome.is_delivered(),
                "outcome": format!("{:?}", outcome),
            }))
        }
        Cmd::Login {
            access_token,
            refresh_token,
            user_data,
        } => {
            let user_data = user_data
                .map(|raw| serde_json::from_str::<Value>(&raw))
                .transpose()
                .context("--user-data is not valid JSON")?;
            let response = state
                .dispatcher
                .handle(Command::AuthTokensReceived {
                    access_token: Some(access_token),
                    refresh_token: Some(refresh_token),
                    user_data,
                })
                .await;
            print_json(&response)
        }
        Cmd::Daemon => daemon(state).await,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vetclaim_sync={level},vetclaim_common={level}",
            level = logging.level
        ))
    });

    let (file_layer, stderr_layer) = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        None => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

async fn init(
    store: &SqliteStore,
    config_path: Option<PathBuf>,
    config: &TomlConfig,
) -> Result<()> {
    initialize_store(store).await?;

    let target = config_path.or_else(config::default_config_path);
    match target {
        Some(path) if !path.exists() => {
            config::write_toml_config(config, &path)?;
            info!("Wrote default config to {}", path.display());
        }
        Some(path) => info!("Keeping existing config {}", path.display()),
        None => warn!("No config directory available, config file not written"),
    }

    print_json(&json!({ "success": true }))
}

/// Serve the command bus until EOF or a shutdown signal
async fn daemon(state: AppState) -> Result<()> {
    state.start_periodic_sync();
    info!("Daemon ready, reading commands from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let message = match serde_json::from_str::<Value>(&line) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(error = %e, "Ignoring non-JSON input line");
                        continue;
                    }
                };
                if let Some(response) = state.dispatcher.dispatch(message).await {
                    print_json(&response)?;
                }
            }
        }
    }

    state.scheduler.stop();
    info!("Daemon shutdown complete");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
