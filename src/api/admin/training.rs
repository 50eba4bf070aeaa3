//! Lesson model training endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, info};

use super::require_admin_session;
use crate::api::state::AppState;
use crate::api::types::{
    required, AdminAddSampleRequest, AdminCompleteRequest, ApiError, CompleteTrainingResponse,
    Json, ResultStatus, SampleResponse,
};
use crate::domain::gesture::LessonId;
use crate::domain::training::SessionRole;
use crate::infrastructure::extractor::decode_frame;

fn parse_lesson(lesson_id: String) -> Result<LessonId, ApiError> {
    LessonId::new(lesson_id).map_err(|e| ApiError::bad_request(e.to_string()))
}

/// Add a sample to a lesson session, starting one when the current session differs
pub async fn add_sample(
    State(state): State<AppState>,
    Json(request): Json<AdminAddSampleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = required(request.session_id)?;
    let lesson_id = required(request.lesson_id)?;
    let gesture = required(request.gesture_name)?;
    let frame = required(request.frame)?;

    require_admin_session(&session_id)?;
    let lesson = parse_lesson(lesson_id)?;
    let frame = decode_frame(&frame)?;

    let recognition = &state.recognition;
    let is_current = recognition.current_session()?.is_some_and(|s| {
        s.session_id == session_id
            && s.role == SessionRole::Admin
            && s.lesson_id.as_deref() == Some(lesson.as_str())
    });

    if !is_current {
        info!(session_id = %session_id, lesson_id = %lesson, "Starting admin training session");
        recognition.begin_collection(&session_id, SessionRole::Admin, Some(lesson.clone()))?;
    }

    let samples = recognition.submit_frame(&session_id, &gesture, frame).await?;

    if samples == 0 {
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SampleResponse::rejected("Failed to process admin frame")),
        ));
    }

    Ok((
        StatusCode::OK,
        Json(SampleResponse::recorded(samples, Some(lesson.to_string()))),
    ))
}

pub async fn complete_level(
    State(state): State<AppState>,
    Json(request): Json<AdminCompleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = required(request.session_id)?;
    let lesson_id = required(request.lesson_id)?;

    require_admin_session(&session_id)?;
    let lesson = parse_lesson(lesson_id)?;

    let outcome = state
        .recognition
        .finish_collection(&session_id, SessionRole::Admin, Some(&lesson))
        .await?;

    if !outcome.success {
        error!(session_id = %session_id, lesson_id = %lesson, "Admin level training failed");
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CompleteTrainingResponse {
                status: ResultStatus::Error,
                accuracy: outcome.accuracy,
                lesson_id: Some(lesson.to_string()),
                message: Some(format!("Level training failed for {}", lesson)),
            }),
        ));
    }

    info!(lesson_id = %lesson, accuracy = outcome.accuracy, "Level model created");

    Ok((
        StatusCode::OK,
        Json(CompleteTrainingResponse {
            status: ResultStatus::Success,
            accuracy: outcome.accuracy,
            lesson_id: Some(lesson.to_string()),
            message: Some(format!("Level model created for {}", lesson)),
        }),
    ))
}
