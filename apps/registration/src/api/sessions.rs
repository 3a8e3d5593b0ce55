//! Session API endpoints.
//!
//! Drives one interaction session through the form and pass screens:
//! - POST /api/sessions - Open a session
//! - GET /api/sessions/:id - Current session state
//! - DELETE /api/sessions/:id - Drop the session
//! - POST /api/sessions/:id/registration - Submit the form
//! - GET /api/sessions/:id/pass - Pass image (inline)
//! - GET /api/sessions/:id/pass/download - Pass image (attachment, counted)
//! - POST /api/sessions/:id/reset - Register another

use crate::server::state::AppState;
use crate::sessions::PassStore;
use crate::types::{PassAction, PassState, RegistrationForm, SubmissionFailure};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use eventpass_runtime::StoreError;
use eventpass_web::{AppError, CorrelationId};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Session state as returned to the client.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// Session ID
    pub session_id: Uuid,
    /// Current interaction state
    pub state: PassState,
}

impl SessionView {
    async fn of(session_id: Uuid, store: &PassStore) -> Self {
        Self {
            session_id,
            state: store.state(Clone::clone).await,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn session(state: &AppState, id: Uuid) -> Result<Arc<PassStore>, AppError> {
    state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::not_found("Session", id))
}

async fn shown_identifier(store: &PassStore) -> Result<String, AppError> {
    store
        .state(|s| s.pass_identifier().map(str::to_string))
        .await
        .ok_or_else(|| AppError::conflict("No pass is shown in this session"))
}

/// Map the state after a finished submission onto a response
fn submission_outcome(session_id: Uuid, state: PassState) -> Result<SessionView, AppError> {
    let message = state
        .notice
        .as_ref()
        .map(|notice| notice.message.clone())
        .unwrap_or_default();

    match state.last_failure {
        None if state.pass_identifier().is_some() => Ok(SessionView { session_id, state }),
        Some(SubmissionFailure::Invalid) => Err(AppError::validation(message)),
        Some(SubmissionFailure::Duplicate) => Err(AppError::conflict(message)),
        Some(SubmissionFailure::Unavailable) => Err(AppError::unavailable(message)),
        // Another submit of this session owns the in-flight registration
        None if state.submitting => {
            Err(AppError::conflict("A registration is already in progress"))
        },
        None => Err(AppError::unavailable("The registration did not complete")),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Open a new session on the form screen.
///
/// # Endpoint
///
/// ```text
/// POST /api/sessions
/// ```
///
/// Returns `201 Created` with the session ID and initial state.
pub async fn create_session(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
) -> (StatusCode, Json<SessionView>) {
    let (session_id, store) = state.sessions.create(state.environment());
    tracing::info!(%session_id, %correlation_id, "Session opened");

    (
        StatusCode::CREATED,
        Json(SessionView::of(session_id, &store).await),
    )
}

/// Current session state.
///
/// # Errors
///
/// 404 if the session does not exist.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let store = session(&state, id)?;
    Ok(Json(SessionView::of(id, &store).await))
}

/// Drop a session.
///
/// # Errors
///
/// 404 if the session does not exist.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let store = state
        .sessions
        .remove(&id)
        .ok_or_else(|| AppError::not_found("Session", id))?;

    if let Err(error) = store.shutdown(state.effect_timeout).await {
        tracing::warn!(session_id = %id, %error, "Session effects still running at removal");
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Submit the registration form.
///
/// Waits for the registration effect and maps the outcome:
/// - 200 with the new state when the pass is issued
/// - 202 with the current state when the write is still running after the
///   effect timeout; the client polls `GET /api/sessions/:id` for the result
/// - 422 when a field is missing or the identifier cannot be encoded
/// - 409 when the identifier is taken, a pass is already shown, or another
///   submit of this session is in flight
/// - 503 when the record store failed
///
/// # Errors
///
/// See above; 404 if the session does not exist.
pub async fn submit_registration(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    correlation_id: CorrelationId,
    Json(form): Json<RegistrationForm>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let store = session(&state, id)?;

    let (on_pass, submitting) = store
        .state(|s| (s.pass_identifier().is_some(), s.submitting))
        .await;
    if on_pass {
        return Err(AppError::conflict(
            "A pass is already shown; register another to start over",
        ));
    }
    if submitting {
        return Err(AppError::conflict("A registration is already in progress"));
    }

    tracing::info!(session_id = %id, %correlation_id, "Registration submitted");

    let mut handle = store.send(PassAction::Submit { form }).await?;
    match handle.wait_with_timeout(state.effect_timeout).await {
        Ok(()) => {},
        Err(StoreError::Timeout) => {
            // The write may still commit, so this is not a failure
            tracing::warn!(session_id = %id, "Registration still pending after effect timeout");
            return Ok((StatusCode::ACCEPTED, Json(SessionView::of(id, &store).await)));
        },
        Err(error) => return Err(error.into()),
    }

    let view = submission_outcome(id, store.state(Clone::clone).await)?;
    Ok((StatusCode::OK, Json(view)))
}

/// Pass image, inline.
///
/// # Errors
///
/// 409 if no pass is shown; 500 if rendering fails.
pub async fn get_pass(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let store = session(&state, id)?;
    let identifier = shown_identifier(&store).await?;

    let image = state.codes.generate(&identifier)?;

    Ok(([(header::CONTENT_TYPE, state.codes.media_type())], image))
}

/// Pass image as a download.
///
/// The image is rendered before accounting starts. Accounting runs in the
/// background: its latency and failures never reach the download, and the
/// session's `downloads` tally catches up when it finishes.
///
/// # Errors
///
/// 409 if no pass is shown; 500 if rendering fails.
pub async fn download_pass(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let store = session(&state, id)?;
    let identifier = shown_identifier(&store).await?;

    let image = state.codes.generate(&identifier)?;

    if let Err(error) = store.send(PassAction::DownloadRequested).await {
        tracing::warn!(session_id = %id, %error, "Download accounting not started");
    }

    let disposition = format!(
        "attachment; filename=\"{identifier}.{}\"",
        state.codes.file_extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, state.codes.media_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        image,
    ))
}

/// Leave the pass screen and return to an empty form.
///
/// # Errors
///
/// 404 if the session does not exist.
pub async fn register_another(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let store = session(&state, id)?;
    store.send(PassAction::RegisterAnother).await?;
    Ok(Json(SessionView::of(id, &store).await))
}
