//! Training and admin request/response bodies

use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::domain::artifact::ArtifactMetadata;
use crate::infrastructure::services::SessionSummary;

/// `status` field shared by the result-style responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// Fields are optional so a missing one yields "Missing required fields" instead of a parse error
#[derive(Debug, Clone, Deserialize)]
pub struct StartTrainingRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddSampleRequest {
    pub session_id: Option<String>,
    pub gesture_name: Option<String>,
    pub frame: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteTrainingRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminAddSampleRequest {
    pub session_id: Option<String>,
    pub lesson_id: Option<String>,
    pub gesture_name: Option<String>,
    pub frame: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminCompleteRequest {
    pub session_id: Option<String>,
    pub lesson_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartTrainingResponse {
    pub status: ResultStatus,
    pub session: SessionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleResponse {
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SampleResponse {
    pub fn recorded(samples: usize, lesson_id: Option<String>) -> Self {
        Self {
            status: ResultStatus::Success,
            samples: Some(samples),
            lesson_id,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            samples: None,
            lesson_id: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompleteTrainingResponse {
    pub status: ResultStatus,
    pub accuracy: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelModelsResponse {
    pub status: ResultStatus,
    pub level_models: Vec<ArtifactMetadata>,
}

/// Trimmed, non-empty value or a 400
pub fn required(value: Option<String>) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required fields"))
}
