//! feedback-intake - Complaint intake microservice
//!
//! Accepts free-text customer feedback, enriches it with sentiment, category
//! and caller geolocation from three upstream providers, and stores it in
//! SQLite.
//!
//! Startup refuses to proceed without provider credentials.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use feedback_common::config::{default_config_path, ProviderCredentials, TomlConfig};
use feedback_intake::providers::ProviderSet;
use feedback_intake::{build_router, logging, AppState, EnrichmentOrchestrator};
use tokio::signal;
use tracing::info;

/// Command-line arguments for feedback-intake
#[derive(Parser, Debug)]
#[command(name = "feedback-intake")]
#[command(about = "Customer feedback intake and enrichment service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "FEEDBACK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long, default_value = "127.0.0.1", env = "FEEDBACK_BIND")]
    bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value = "8000", env = "FEEDBACK_PORT")]
    port: u16,

    /// SQLite database file (overrides the config file)
    #[arg(short, long, env = "FEEDBACK_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = logging::init();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = TomlConfig::load(&config_path).context("Failed to load configuration")?;
    log_level
        .apply_configured(&config.logging)
        .context("Failed to apply configured log level")?;

    info!(
        "Starting feedback-intake v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let credentials = ProviderCredentials::resolve(&config.providers)
        .context("Provider credentials are required")?;

    let db_path = args.database.clone().unwrap_or_else(|| config.database_path());
    info!("Database: {}", db_path.display());
    let pool = feedback_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let providers = ProviderSet::from_config(&config.providers, &credentials)
        .context("Failed to construct provider clients")?;
    let orchestrator = EnrichmentOrchestrator::new(providers);

    let state = AppState::new(pool, orchestrator)
        .with_trust_forwarded_for(config.trust_forwarded_for);
    let app = build_router(state);

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("feedback-intake listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
