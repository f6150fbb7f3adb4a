//! `pg-atlas` server binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pg_atlas_api::{AppState, Settings, router};
use pg_atlas_authn::{HttpJwksFetcher, JwksCache, OidcVerifier};
use pg_atlas_ingest::LoggingSink;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init();

    settings.validate().context("invalid settings")?;

    let cache_config = settings.cache_config()?;
    let fetcher = Arc::new(HttpJwksFetcher::new(cache_config.fetch_timeout()));
    let cache = Arc::new(JwksCache::new(fetcher, cache_config));
    let verifier = OidcVerifier::new(settings.verifier_config()?, cache);
    let state = AppState::new(verifier, Arc::new(LoggingSink::new()));

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    info!(
        api_url = %settings.api_url,
        addr = %settings.bind_addr,
        version = env!("CARGO_PKG_VERSION"),
        "PG Atlas starting up"
    );

    axum::serve(listener, router(state, settings.max_body_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("PG Atlas shutting down");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "failed to register SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
