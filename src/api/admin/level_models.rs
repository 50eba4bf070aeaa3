use axum::extract::State;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, LevelModelsResponse, ResultStatus};

/// Metadata of every readable lesson artifact
pub async fn list_level_models(
    State(state): State<AppState>,
) -> Result<Json<LevelModelsResponse>, ApiError> {
    let level_models = state.recognition.list_lesson_artifacts().await?;

    Ok(Json(LevelModelsResponse {
        status: ResultStatus::Success,
        level_models,
    }))
}
