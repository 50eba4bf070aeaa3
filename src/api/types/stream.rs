//! WebSocket translation stream messages

use serde::{Deserialize, Serialize};

use crate::domain::classifier::ClassifierKind;
use crate::domain::extractor::Landmark;
use crate::infrastructure::services::FrameResult;

/// Inbound text message
#[derive(Debug, Clone, Deserialize)]
pub struct FrameMessage {
    pub frame: Option<String>,
}

/// Outbound prediction for one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameResponse {
    pub timestamp: f64,
    pub hand_detected: bool,
    pub landmarks: Vec<Landmark>,
    pub gesture: String,
    pub confidence: f32,
    pub restricted_mode: bool,
    pub lesson_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ClassifierKind>,
}

impl From<FrameResult> for FrameResponse {
    fn from(result: FrameResult) -> Self {
        Self {
            timestamp: result.timestamp,
            hand_detected: result.hand_detected,
            landmarks: result.landmarks,
            gesture: result.gesture,
            confidence: result.confidence,
            restricted_mode: result.restricted_mode,
            lesson_id: result.lesson_id,
            source: result.source,
        }
    }
}

/// Per-frame failure; the stream stays open
#[derive(Debug, Clone, Serialize)]
pub struct StreamError {
    pub error: String,
}

impl StreamError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
