//! Upload session API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use mediaflow_core::{ProgressSnapshot, UploadSession};

use super::handlers::{orchestrator_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Current or most recent session, if any has been started
    pub session: Option<UploadSession>,
    pub progress: ProgressSnapshot,
    pub running: bool,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// False when no session was active
    pub cancelled: bool,
}

async fn session_response(state: &AppState) -> SessionResponse {
    let orchestrator = state.orchestrator();
    SessionResponse {
        session: orchestrator.session().await,
        progress: orchestrator.progress().await,
        running: orchestrator.is_running(),
    }
}

pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(session_response(&state).await)
}

/// Start uploading every pending item
pub async fn start_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    state
        .orchestrator()
        .start()
        .await
        .map_err(orchestrator_error)?;
    info!("Upload session started via API");
    Ok((StatusCode::ACCEPTED, Json(session_response(&state).await)))
}

/// Abort in-flight transfers and stop dispatching
pub async fn cancel_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CancelResponse>, ApiError> {
    let cancelled = state
        .orchestrator()
        .cancel()
        .await
        .map_err(orchestrator_error)?;
    Ok(Json(CancelResponse { cancelled }))
}
