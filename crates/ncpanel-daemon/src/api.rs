//! Read-only dashboard handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::{debug, warn};

use crate::server::DashboardState;
use crate::host::SystemInfo;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Latest panel state
pub async fn get_state(State(state): State<DashboardState>) -> impl IntoResponse {
    let view = state.view.borrow().clone();
    Json(view)
}

/// Host facts; collection runs off the async workers
pub async fn get_system_info() -> impl IntoResponse {
    debug!("System info requested");
    match tokio::task::spawn_blocking(SystemInfo::collect).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => {
            warn!(error = %e, "System info collection failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("System info unavailable")),
            )
                .into_response()
        }
    }
}
