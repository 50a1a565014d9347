//! ASI-GEST production tracking service - main entry point
//!
//! Opens the operational store (creating it on first run) and the ASITRON
//! ERP database (read-only), then serves the REST API until Ctrl+C or
//! SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use asigest_common::config::{load_toml_config, Overrides, Settings};
use asigest_api::{build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for asigest-api
#[derive(Parser, Debug)]
#[command(name = "asigest-api")]
#[command(about = "ASI-GEST production tracking service")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "ASIGEST_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "ASIGEST_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "ASIGEST_PORT")]
    port: Option<u16>,

    /// Operational database file
    #[arg(long, env = "ASIGEST_DB_PATH")]
    db_path: Option<PathBuf>,

    /// ASITRON ERP database file (opened read-only)
    #[arg(long, env = "ASIGEST_ERP_DB_PATH")]
    erp_db_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "ASIGEST_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The log level lives in the config file, so loading it runs under a
    // temporary stderr subscriber
    let bootstrap = tracing_subscriber::fmt().with_writer(std::io::stderr).finish();
    let toml_config = tracing::subscriber::with_default(bootstrap, || {
        load_toml_config(args.config.as_deref())
    })
    .context("Failed to load configuration")?;
    let settings = Settings::resolve(
        toml_config,
        Overrides {
            host: args.host,
            port: args.port,
            db_path: args.db_path,
            erp_db_path: args.erp_db_path,
            log_level: args.log_level,
        },
    );

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "asigest_api={level},asigest_common={level},tower_http={level}",
                    level = settings.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting ASI-GEST API (asigest-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Operational database: {}", settings.db_path.display());
    info!("ERP database: {}", settings.erp_db_path.display());

    let db = asigest_common::db::init_database(&settings.db_path)
        .await
        .context("Failed to initialize operational database")?;

    let erp = asigest_common::db::connect_readonly(&settings.erp_db_path)
        .await
        .context("Failed to open ERP database")?;

    let app = build_router(AppState::new(db, erp), &settings.cors_origins);

    let addr = settings.bind_address();
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

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
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
