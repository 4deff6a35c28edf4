//! fra-pv (Patta Verification) - land-claim document verification service
//!
//! Settings resolve CLI → ENV → TOML (`fra-pv.toml`) → compiled default.

use anyhow::{Context, Result};
use clap::Parser;
use fra_common::api::ApiKey;
use fra_common::config::{
    load_toml_config_or_default, CompiledDefaults, PortalMode, RootFolderInitializer,
    RootFolderResolver,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use fra_pv::extractors::{DocumentExtractor, PlainTextSource, TesseractSource, TextSource};
use fra_pv::services::{HttpPortal, PortalClient, SimulatedPortal, UploadStore, VerificationService};
use fra_pv::{build_router, AppState};

const MODULE_NAME: &str = "fra-pv";

/// Command-line arguments for fra-pv
#[derive(Parser, Debug)]
#[command(name = "fra-pv")]
#[command(about = "Patta document verification service")]
#[command(version)]
struct Args {
    /// Root folder for the database and uploads (also FRA_ROOT_FOLDER)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5730
    #[arg(short, long, env = "FRA_PV_BIND")]
    bind: Option<String>,

    /// API key required on protected routes; unset disables authentication
    #[arg(long, env = "FRA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// External OCR command (tesseract-compatible); unset reads text directly
    #[arg(long, env = "FRA_OCR_COMMAND")]
    ocr_command: Option<String>,

    /// State used when a request names none
    #[arg(long, env = "FRA_DEFAULT_STATE")]
    default_state: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_toml_config_or_default(MODULE_NAME);
    let defaults = CompiledDefaults::for_current_platform();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level)),
        )
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting FRA Patta Verification (fra-pv) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", initializer.root().display());

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = fra_pv::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let text_source: Arc<dyn TextSource> =
        match args.ocr_command.clone().or(toml_config.ocr.command.clone()) {
            Some(command) => {
                info!("OCR command: {}", command);
                Arc::new(TesseractSource::new(command))
            }
            None => {
                info!("No OCR command configured, reading document text directly");
                Arc::new(PlainTextSource::new())
            }
        };

    let portal: Arc<dyn PortalClient> = match toml_config.portal.mode {
        PortalMode::Simulated => {
            warn!("Using simulated registry portal");
            Arc::new(SimulatedPortal::new())
        }
        PortalMode::Http => {
            let timeout = Duration::from_secs(toml_config.portal.timeout_secs);
            let client = HttpPortal::new(timeout, toml_config.portal.base_url.clone())
                .context("Failed to create portal HTTP client")?;
            info!(timeout_secs = toml_config.portal.timeout_secs, "Using HTTP registry portal");
            Arc::new(client)
        }
    };

    let api_key = args
        .api_key
        .as_deref()
        .or(toml_config.api_key.as_deref())
        .and_then(ApiKey::new);
    if api_key.is_some() {
        info!("API key authentication enabled");
    } else {
        warn!("No API key configured, authentication disabled");
    }

    let default_state = args
        .default_state
        .clone()
        .or(toml_config.default_state.clone())
        .unwrap_or(defaults.default_state);
    let max_upload_bytes = toml_config
        .max_upload_bytes
        .unwrap_or(defaults.max_upload_bytes);

    let verifier = VerificationService::new(DocumentExtractor::new(text_source), portal);
    let uploads = UploadStore::new(initializer.uploads_path());

    let state = AppState::new(db_pool, verifier, uploads)
        .with_api_key(api_key)
        .with_default_state(default_state)
        .with_max_upload_bytes(max_upload_bytes);
    let app = build_router(state);

    let bind = args
        .bind
        .clone()
        .or(toml_config.bind.clone())
        .unwrap_or(defaults.bind);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("fra-pv listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
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
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
