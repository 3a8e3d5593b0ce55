//! Admin API endpoints.
//!
//! - GET /api/admin/stats - Registration and download totals

use crate::server::state::AppState;
use crate::services::{self, StatsReport};
use axum::{extract::State, Json};

/// Aggregate statistics over every registration.
///
/// Always 200: a record store failure yields zero totals with the failure in
/// `error`.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/admin/stats
/// # {"total_registrations":3,"total_downloads":2,"gender_breakdown":{"Female":1,"Male":2},"error":null}
/// ```
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsReport> {
    Json(services::get_stats(state.records.as_ref()).await)
}
