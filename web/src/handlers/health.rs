//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{http::StatusCode, Json};
use eventpass_core::record_store::RecordStore;
use eventpass_runtime::{HealthCheck, HealthStatus};

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check dependencies (database, etc.).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Probe the record store (for readiness).
///
/// Issues a cheap existence check; any error marks the store unhealthy.
///
/// # Status Codes
///
/// - 200 OK: the store answered
/// - 503 Service Unavailable: the store failed
///
/// # Response
///
/// ```json
/// {
///   "component": "record_store",
///   "status": "Healthy",
///   "message": null,
///   "metadata": []
/// }
/// ```
pub async fn record_store_readiness(store: &dyn RecordStore) -> (StatusCode, Json<HealthCheck>) {
    let health = match store.exists("").await {
        Ok(_) => HealthCheck::healthy("record_store"),
        Err(error) => {
            tracing::warn!(%error, "Readiness probe failed");
            HealthCheck::unhealthy("record_store", error.to_string())
        },
    };

    let status = match health.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(health))
}
