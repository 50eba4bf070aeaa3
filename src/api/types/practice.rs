//! Practice (lesson mode) bodies

use serde::{Deserialize, Serialize};

use super::training::ResultStatus;
use crate::domain::artifact::ArtifactMetadata;
use crate::infrastructure::services::LessonStatus;

#[derive(Debug, Clone, Deserialize)]
pub struct StartPracticeRequest {
    pub lesson_id: Option<String>,
}

/// Lesson mode state as reported to clients
#[derive(Debug, Clone, Serialize)]
pub struct LevelInfo {
    pub is_practice_mode: bool,
    pub current_level: Option<String>,
    pub allowed_gestures: Vec<String>,
    pub has_level_model: bool,
    pub model_metadata: Option<ArtifactMetadata>,
    pub message: String,
}

impl From<LessonStatus> for LevelInfo {
    fn from(status: LessonStatus) -> Self {
        let message = match &status.lesson_id {
            Some(id) if status.active => format!("Practice mode: {}", id),
            _ => "Normal translation mode".to_string(),
        };

        Self {
            is_practice_mode: status.active,
            current_level: status.lesson_id,
            allowed_gestures: status.vocabulary.as_slice().to_vec(),
            has_level_model: status.has_model,
            model_metadata: status.metadata,
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartPracticeResponse {
    pub status: ResultStatus,
    pub level_info: LevelInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopPracticeResponse {
    pub status: ResultStatus,
    pub message: String,
}
