//! Subtitle Service
//!
//! HTTP front end for batch caption retrieval and conversion.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subtitle_service::config::ServerConfig;
use subtitle_service::config_file::{generate_default_config, ConfigFile};
use subtitle_service::http::create_router;
use subtitle_service::state::AppState;
use subtitle_service::{storage, Result, ServiceError};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "subtitle-service";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("--generate-config") {
        let path = args.get(2).map(String::as_str).unwrap_or("config.toml");
        generate_default_config(path)
            .map_err(|e| ServiceError::Config(format!("cannot write {}: {}", path, e)))?;
        println!("Wrote default configuration to {}", path);
        return Ok(());
    }

    // Load configuration
    let config_path = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "config.toml".to_string());
    let (mut config, load_error) = if std::path::Path::new(&config_path).exists() {
        match ConfigFile::from_file(&config_path) {
            Ok(cf) => (cf.into_server_config(), None),
            Err(e) => (ServerConfig::default(), Some(e.to_string())),
        }
    } else {
        (ServerConfig::default(), None)
    };
    config.apply_env();

    // Initialize logging
    init_logging(&config.log_level, &config.log_format);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = load_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            config_path,
            e
        );
    }
    tracing::info!("Configuration loaded: {:?}", config);

    storage::ensure_dirs(&config.storage).await?;

    // Create application state
    let state = Arc::new(AppState::with_ytdlp(config.clone()));
    tracing::info!(
        workers = state.processor.workers(),
        cache_ttl_secs = config.cache.ttl_secs,
        "Processor ready"
    );

    // Background task: sweep expired cache entries.
    let cache_sweeper = state.spawn_periodic(
        Duration::from_secs(config.cache.sweep_interval_secs),
        |state| async move {
            let removed = state.cache.clear_expired();
            if removed > 0 {
                tracing::info!("Evicted {} expired cache entries", removed);
            }
        },
    );

    // Background task: delete old caption and scratch files.
    let file_sweeper = state.spawn_periodic(
        Duration::from_secs(config.storage.cleanup_interval_secs),
        |state| async move {
            storage::sweep(&state.config.storage).await;
        },
    );

    // Build router
    let app = create_router(state.clone());

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| ServiceError::Config(format!("invalid listen address: {}", e)))?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown();
    cache_sweeper.abort();
    file_sweeper.abort();
    match storage::clear_dir(&config.storage.temp_dir).await {
        Ok(n) => tracing::info!("Removed {} temporary file(s)", n),
        Err(e) => tracing::error!("Failed to clean temp directory: {}", e),
    }
    tracing::info!("{} stopped", APP_NAME);

    Ok(())
}

/// Initialize logging with tracing
fn init_logging(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("subtitle_service={level},tower_http={level}", level = level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
