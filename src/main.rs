use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vix_career_api::config::AppConfig;
use vix_career_api::database::{ensure_indexes, DocumentStore, MemoryStore, MongoStore};
use vix_career_api::{app, AppState};

#[derive(Parser)]
#[command(name = "vix-career-api")]
#[command(about = "REST backend for the VixCareer job board")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Port to listen on (overrides PORT)")]
    port: Option<u16>,

    #[arg(long, help = "Serve from an in-process store instead of MongoDB")]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DB_USER, DB_PASS, ACCESS_TOKEN_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(port) = cli.port {
        config.api.port = port;
    }
    info!("Starting VixCareer API in {:?} mode", config.environment);

    let store = open_store(&config, cli.in_memory).await?;
    // Existing duplicate pairs block the index; the request-time check still applies then.
    if let Err(e) = ensure_indexes(store.as_ref()).await {
        warn!("Could not ensure unique job application index: {}", e);
    }

    match store.ping().await {
        Ok(()) => info!("Pinged your deployment. Store connection is healthy"),
        Err(e) => warn!("Store ping failed: {}", e),
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(store, config);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // The router owned the last AppState; the store connection is released with it.
    info!("Server stopped, store connection released");
    Ok(())
}

async fn open_store(config: &AppConfig, in_memory: bool) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if in_memory {
        info!("Using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let uri = config.database.connection_uri().context("missing MongoDB credentials")?;
    let store = MongoStore::connect(&uri, &config.database.name)
        .await
        .context("failed to configure MongoDB client")?;
    info!("Using MongoDB database {}", config.database.name);
    Ok(Arc::new(store))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received");
}
