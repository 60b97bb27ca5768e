//! Reward Relayer binary.

use reward_relayer::metrics::METRICS;
use reward_relayer::{create_router, AppState, Config};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Reward Relayer");

    let config: Config = config::Config::builder()
        .add_source(config::File::with_name("relayer").required(false))
        .add_source(config::Environment::with_prefix("RELAYER"))
        .build()
        .and_then(|c| c.try_deserialize())
        .unwrap_or_else(|e| {
            error!(error = %e, "FATAL: Config error, fix RELAYER_* env vars or relayer.toml");
            std::process::exit(1);
        });

    if config.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
        info!("API key auth enabled");
    } else {
        warn!("RELAYER_API_KEY not set, /claimToken is unprotected (dev mode)");
    }

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState::new(config)?);

    // Credentials are re-read per request; this only warns early.
    if let Err(e) = state.server_config() {
        warn!(error = %e, "Engine credentials incomplete, claims will fail until set");
    }

    let app = create_router(state.clone());

    info!(address = %bind_address, "Listening");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Wake in-flight pollers so their requests can answer and drain.
            shutdown.cancel();
        })
        .await?;

    info!("Relayer shut down gracefully");
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM. A handler that fails to install
/// is logged and never fires, so the other signal still works.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    info!(
        signal,
        in_flight_polls = METRICS.in_flight_polls.load(Ordering::Relaxed),
        "Shutting down, cancelling in-flight polls"
    );
}
