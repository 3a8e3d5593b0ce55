//! Event pass registration HTTP server.

use eventpass_core::environment::SystemClock;
use eventpass_postgres::PostgresRecordStore;
use metrics_exporter_prometheus::PrometheusBuilder;
use registration::{
    config::Config,
    server::{build_router, AppState},
    Code128Generator, SessionRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "registration=info,eventpass_runtime=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting event pass registration server");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;
    info!(
        database_url = %config.redacted_database_url(),
        address = %config.bind_address(),
        session_capacity = config.sessions.capacity,
        "Configuration loaded"
    );

    // Prometheus exporter
    if let Some(port) = config.server.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()?;
        info!("Prometheus metrics available at http://0.0.0.0:{port}/metrics");
    }

    // Record store
    info!("Connecting to record store...");
    let records = PostgresRecordStore::connect(
        &config.database.url,
        config.database.max_connections,
        Duration::from_secs(config.database.connect_timeout),
    )
    .await?;
    info!("Record store connected");

    let codes = Code128Generator::new(config.barcode.height, config.barcode.module_width);
    let sessions = Arc::new(SessionRegistry::new(config.sessions.capacity));

    let state = AppState::new(
        Arc::new(records),
        Arc::new(codes),
        Arc::new(SystemClock),
        Arc::clone(&sessions),
        Duration::from_millis(config.sessions.effect_timeout_ms),
    );

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let in-flight registrations and download accounting finish
    let timed_out = sessions
        .shutdown_all(Duration::from_secs(config.server.shutdown_timeout))
        .await;
    if timed_out > 0 {
        warn!(sessions = timed_out, "Sessions still had pending effects at shutdown");
    }

    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
