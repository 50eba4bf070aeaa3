//! Practice (lesson mode) endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use super::state::AppState;
use crate::api::types::{
    ApiError, Json, LevelInfo, ResultStatus, StartPracticeRequest, StartPracticeResponse,
    StopPracticeResponse,
};
use crate::domain::gesture::LessonId;

pub fn create_practice_router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_practice))
        .route("/stop", post(stop_practice))
        .route("/status", get(practice_status))
}

async fn start_practice(
    State(state): State<AppState>,
    Json(request): Json<StartPracticeRequest>,
) -> Result<Json<StartPracticeResponse>, ApiError> {
    let lesson_id = request
        .lesson_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing lesson_id"))?;
    let lesson = LessonId::new(lesson_id).map_err(|e| ApiError::bad_request(e.to_string()))?;

    state.recognition.enter_lesson(&lesson).await?;

    Ok(Json(StartPracticeResponse {
        status: ResultStatus::Success,
        level_info: state.recognition.lesson_status()?.into(),
    }))
}

async fn stop_practice(
    State(state): State<AppState>,
) -> Result<Json<StopPracticeResponse>, ApiError> {
    state.recognition.exit_lesson()?;

    Ok(Json(StopPracticeResponse {
        status: ResultStatus::Success,
        message: "Practice mode stopped".to_string(),
    }))
}

async fn practice_status(State(state): State<AppState>) -> Result<Json<LevelInfo>, ApiError> {
    Ok(Json(state.recognition.lesson_status()?.into()))
}
