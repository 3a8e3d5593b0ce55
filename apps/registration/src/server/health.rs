//! Health check endpoints for the registration service.
//!
//! Liveness never touches dependencies; readiness probes the record store.

use super::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use eventpass_runtime::HealthCheck;
use eventpass_web::handlers::record_store_readiness;

pub use eventpass_web::handlers::health_check;

/// Readiness check endpoint.
///
/// Returns 200 OK when the record store answers, 503 otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/ready
/// # {"component":"record_store","status":"Healthy","message":null,"metadata":[["sessions","3"]]}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthCheck>) {
    let (status, Json(health)) = record_store_readiness(state.records.as_ref()).await;
    let health = health.with_metadata("sessions", state.sessions.len().to_string());
    (status, Json(health))
}
