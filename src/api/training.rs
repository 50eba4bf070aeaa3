//! Regular training endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Router};
use tracing::error;

use super::state::AppState;
use crate::api::types::{
    required, AddSampleRequest, ApiError, CompleteTrainingRequest, CompleteTrainingResponse, Json,
    ResultStatus, SampleResponse, StartTrainingRequest, StartTrainingResponse,
};
use crate::domain::training::SessionRole;
use crate::infrastructure::extractor::decode_frame;

pub fn create_training_router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_training))
        .route("/add-sample", post(add_sample))
        .route("/complete", post(complete_training))
}

async fn start_training(
    State(state): State<AppState>,
    Json(request): Json<StartTrainingRequest>,
) -> Result<Json<StartTrainingResponse>, ApiError> {
    let session_id = required(request.session_id)?;

    let session = state
        .recognition
        .begin_collection(&session_id, SessionRole::Regular, None)?;

    Ok(Json(StartTrainingResponse {
        status: ResultStatus::Success,
        session,
    }))
}

async fn add_sample(
    State(state): State<AppState>,
    Json(request): Json<AddSampleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = required(request.session_id)?;
    let gesture = required(request.gesture_name)?;
    let frame = decode_frame(&required(request.frame)?)?;

    let samples = state
        .recognition
        .submit_frame(&session_id, &gesture, frame)
        .await?;

    if samples == 0 {
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SampleResponse::rejected("Failed to process frame")),
        ));
    }

    Ok((StatusCode::OK, Json(SampleResponse::recorded(samples, None))))
}

async fn complete_training(
    State(state): State<AppState>,
    Json(request): Json<CompleteTrainingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = required(request.session_id)?;

    let outcome = state
        .recognition
        .finish_collection(&session_id, SessionRole::Regular, None)
        .await?;

    if !outcome.success {
        error!(session_id = %session_id, "Training failed, previous model kept");
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CompleteTrainingResponse {
                status: ResultStatus::Error,
                accuracy: outcome.accuracy,
                lesson_id: None,
                message: Some("Training failed".to_string()),
            }),
        ));
    }

    Ok((
        StatusCode::OK,
        Json(CompleteTrainingResponse {
            status: ResultStatus::Success,
            accuracy: outcome.accuracy,
            lesson_id: None,
            message: None,
        }),
    ))
}
