//! pollwatch-server - election monitoring backend
//!
//! Serves the submission, verification, media and live-stream API together
//! with the realtime WebSocket and SSE feeds from one SQLite database.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pollwatch_common::config::{database_path, resolve_root_folder, ServerConfig, ROOT_FOLDER_ENV};
use pollwatch_common::db::init_database;
use pollwatch_server::services::users::bootstrap_admin;
use pollwatch_server::{build_router, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for pollwatch-server
#[derive(Parser, Debug)]
#[command(name = "pollwatch-server")]
#[command(about = "Election monitoring backend with realtime updates")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "POLLWATCH_PORT")]
    port: Option<u16>,

    /// Folder holding the database
    #[arg(short, long, env = "POLLWATCH_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "POLLWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Token for an administrator account, created on startup if unknown
    #[arg(long, env = "POLLWATCH_ADMIN_TOKEN")]
    admin_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollwatch_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database work
    info!(
        "Starting PollWatch server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config = ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);

    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    if let Some(token) = args.admin_token.as_deref() {
        bootstrap_admin(&pool, token)
            .await
            .context("Failed to provision administrator")?;
    }

    let port = args.port.unwrap_or(config.port);
    let ip: std::net::IpAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind_addr '{}'", config.bind_addr))?;
    let addr = SocketAddr::new(ip, port);

    let state = AppState::new(pool, config);
    let app = build_router(state);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
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
