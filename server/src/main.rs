mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use adapters::{AppState, InMemory, InMemoryPlayerDirectory, TickDriver, TokioTimer, WebSocketNotifier, router};
use application::BattlegroundService;
use domain::BattlegroundManager;

use crate::config::{AppConfig, ConfigError};
use crate::logging::setup_logging;

#[derive(Debug, Parser)]
#[command(name = "bgqueue-server", about = "Battleground queue and matchmaking server")]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides the configured bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Overrides the configured log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Output logs in JSON format
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let loaded = match AppConfig::load(&args.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let from_file = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    if let Err(e) = setup_logging(&config.logging, args.json_logs) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    if !from_file {
        warn!(path = %args.config.display(), "Configuration file not found, using defaults");
    }

    match run(config).await {
        Ok(()) => {
            info!("Server shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), ServerError> {
    config.validate()?;
    let address = config.bind_address()?;

    let manager = BattlegroundManager::new(config.battleground_config(), config.catalog());
    let notifier = Arc::new(WebSocketNotifier::new());
    let directory = Arc::new(InMemoryPlayerDirectory::new());
    // no world simulation is attached; commands and records are kept in memory
    let store = Arc::new(InMemory::new());

    let service = Arc::new(BattlegroundService::new(
        manager,
        directory.clone(),
        notifier.clone(),
        store.clone(),
        store.clone(),
        store,
    ));

    let ticker = TickDriver::new(Arc::clone(&service), Arc::new(TokioTimer::new()), config.tick_interval()).spawn();

    let state = Arc::new(AppState::new(service, notifier, directory));
    let app = router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(ServerError::Bind)?;
    info!(%address, templates = config.templates.len(), "Server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve);
    ticker.abort();
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
