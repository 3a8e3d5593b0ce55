//! Router configuration for the registration service.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{admin, sessions};
use axum::{
    routing::{get, post},
    Router,
};
use eventpass_web::correlation_id_layer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Configures all routes including:
/// - Health checks
/// - Session endpoints (form, pass, download, reset)
/// - Admin statistics
///
/// Every response carries an `X-Correlation-ID` header.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Interaction sessions
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/sessions/:id/registration", post(sessions::submit_registration))
        .route("/sessions/:id/pass", get(sessions::get_pass))
        .route("/sessions/:id/pass/download", get(sessions::download_pass))
        .route("/sessions/:id/reset", post(sessions::register_another))
        // Admin
        .route("/admin/stats", get(admin::get_stats));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}
