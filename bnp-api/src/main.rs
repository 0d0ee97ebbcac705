//! bnp-api - BirdNET-Pi detection analytics service
//!
//! Serves the detection log, species lists, artifacts and species images
//! over a JSON HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bnp_common::config::{BootstrapConfig, BootstrapOverrides, SettingsHandle};
use bnp_common::db::connect_detection_store;
use bnp_api::images::{self, FlickrProvider, ImageCache, ImageResolver, WikipediaProvider};
use bnp_api::{build_router, AppState};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for bnp-api
#[derive(Parser, Debug)]
#[command(name = "bnp-api")]
#[command(about = "BirdNET-Pi detection analytics API")]
#[command(version)]
struct Args {
    /// Bootstrap TOML config file
    #[arg(short, long, env = "BNP_CONFIG")]
    config: Option<PathBuf>,

    /// BirdNET-Pi installation directory
    #[arg(short, long, env = "BNP_BASE_PATH")]
    base_path: Option<PathBuf>,

    /// Station settings file (birdnet.conf)
    #[arg(short, long, env = "BNP_SETTINGS")]
    settings: Option<PathBuf>,

    /// Detection database
    #[arg(short, long, env = "BNP_DATABASE")]
    database: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "BNP_BIND")]
    bind: Option<String>,
}

impl From<Args> for BootstrapOverrides {
    fn from(args: Args) -> Self {
        Self {
            config_file: args.config,
            base_path: args.base_path,
            settings_path: args.settings,
            database_path: args.database,
            bind_addr: args.bind,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = BootstrapConfig::resolve(&BootstrapOverrides::from(args))
        .context("Failed to resolve configuration")?;

    // RUST_LOG wins over the config file's level
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!(
                "bnp_api={level},bnp_common={level},tower_http={level}",
                level = config.log_level
            )
            .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting BirdNET-Pi analytics API (bnp-api) v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Base path: {}", config.base_path.display());
    info!("Settings file: {}", config.settings_path.display());

    let settings = SettingsHandle::load(&config.settings_path)
        .context("Failed to load station settings")?;

    let db = match connect_detection_store(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open detection database: {}", e);
            return Err(e.into());
        }
    };

    let cache = ImageCache::open(&config.image_cache_path)
        .await
        .context("Failed to open image cache")?;
    let client = images::http_client()?;
    let resolver = ImageResolver::new(cache)
        .with_provider(Arc::new(FlickrProvider::new(client.clone(), settings.clone())))
        .with_provider(Arc::new(WikipediaProvider::new(client)));

    let state = AppState::new(db, settings, config.base_path.clone(), resolver);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("bnp-api listening on http://{}", config.bind_addr);

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
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
