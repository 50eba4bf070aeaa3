//! Admin endpoints for lesson model creation

pub mod level_models;
pub mod training;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;
use crate::api::types::ApiError;

/// Session ids with this prefix are granted the admin role at the transport edge
pub const ADMIN_SESSION_PREFIX: &str = "admin_level_";

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/training/add-sample", post(training::add_sample))
        .route("/training/complete-level", post(training::complete_level))
        .route("/level-models", get(level_models::list_level_models))
}

/// Reject sessions that are not admin sessions
pub fn require_admin_session(session_id: &str) -> Result<(), ApiError> {
    if session_id.starts_with(ADMIN_SESSION_PREFIX) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Invalid admin session"))
    }
}
