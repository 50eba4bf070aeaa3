//! Health, liveness and endpoint inventory

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tracing::warn;

use super::state::AppState;
use crate::api::types::Json;

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub model_loaded: bool,
    pub active_connections: usize,
    pub training_session: bool,
    pub practice_mode: bool,
    pub practice_level: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct RootResponse {
    pub message: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// Service state summary. Degraded when internal state cannot be read.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let recognition = &state.recognition;
    let mut status = HealthStatus::Healthy;

    let training_session = recognition
        .current_session()
        .map(|s| s.is_some())
        .unwrap_or_else(|e| {
            warn!(error = %e, "Health check could not read training session");
            status = HealthStatus::Degraded;
            false
        });

    let lesson = recognition.lesson_status().ok();
    if lesson.is_none() {
        status = HealthStatus::Degraded;
    }

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded: recognition.has_default_model(),
        active_connections: state.connections.active(),
        training_session,
        practice_mode: lesson.as_ref().is_some_and(|l| l.active),
        practice_level: lesson.and_then(|l| l.lesson_id),
    };

    (StatusCode::OK, Json(response))
}

/// Liveness probe
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn root() -> impl IntoResponse {
    let endpoints = BTreeMap::from([
        ("translation_websocket", "/gesture-ws"),
        ("health", "/health"),
        ("training_start", "/training/start"),
        ("training_add_sample", "/training/add-sample"),
        ("training_complete", "/training/complete"),
        ("admin_training_add_sample", "/admin/training/add-sample"),
        ("admin_training_complete", "/admin/training/complete-level"),
        ("admin_list_models", "/admin/level-models"),
        ("practice_start", "/practice/start"),
        ("practice_stop", "/practice/stop"),
        ("practice_status", "/practice/status"),
    ]);

    Json(RootResponse {
        message: "Gesture Translation & Training Server".to_string(),
        endpoints,
    })
}
