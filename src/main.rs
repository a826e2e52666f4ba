use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::config::Config;
use folio::AppState;

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about = "A small CMS backend for ordered page content", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "FOLIO_CONFIG", default_value = "folio.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Folio v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data and upload directories exist
    folio::utils::ensure_dir(&config.server.data_dir)?;
    folio::utils::ensure_dir(&config.uploads.dir)?;

    // Initialize database
    let db = folio::db::init(&config.server.data_dir).await?;

    if config.server.seed_sample_content {
        folio::db::seed_sample_content(&db)
            .await
            .context("Failed to seed sample content")?;
    }

    // Ensure the built-in admin user exists
    folio::api::auth::ensure_admin_user(
        &db,
        &config.auth.admin_password,
        config.auth.reset_admin_password,
    )
    .await
    .context("Failed to ensure admin user")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create app state and router
    let state = Arc::new(AppState::new(config, db));
    let app = folio::api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
