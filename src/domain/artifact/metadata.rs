//! Artifact metadata record

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::gesture::{GestureVocabulary, ModelOwner};
use crate::domain::DomainError;

/// `lesson_id` recorded for the default artifact
pub const DEFAULT_ARTIFACT_LESSON_ID: &str = "original";

/// Metadata written next to the model files of an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub lesson_id: String,
    /// Epoch seconds
    pub created_at: i64,
    pub accuracy: f32,
    pub samples_count: usize,
    /// Vocabulary in training order; position is the class index
    pub gestures: GestureVocabulary,
    pub num_classes: usize,
    #[serde(default)]
    pub admin_session: Option<String>,
    #[serde(default)]
    pub ensemble_accuracy: Option<f32>,
    #[serde(default)]
    pub neural_accuracy: Option<f32>,
}

impl ArtifactMetadata {
    pub fn new(
        owner: &ModelOwner,
        gestures: GestureVocabulary,
        samples_count: usize,
        accuracy: f32,
        admin_session: Option<String>,
    ) -> Self {
        let lesson_id = match owner {
            ModelOwner::Default => DEFAULT_ARTIFACT_LESSON_ID.to_string(),
            ModelOwner::Lesson(id) => id.to_string(),
        };

        Self {
            lesson_id,
            created_at: Utc::now().timestamp(),
            accuracy,
            samples_count,
            num_classes: gestures.len(),
            gestures,
            admin_session,
            ensemble_accuracy: None,
            neural_accuracy: None,
        }
    }

    pub fn is_default(&self) -> bool {
        self.lesson_id == DEFAULT_ARTIFACT_LESSON_ID
    }

    /// Check internal consistency of a loaded record
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.gestures.is_empty() {
            return Err(DomainError::artifact("Metadata lists no gestures"));
        }

        if self.num_classes != self.gestures.len() {
            return Err(DomainError::artifact(format!(
                "Metadata declares {} classes but lists {} gestures",
                self.num_classes,
                self.gestures.len()
            )));
        }

        if !self.accuracy.is_finite() || !(0.0..=1.0).contains(&self.accuracy) {
            return Err(DomainError::artifact(format!(
                "Metadata accuracy {} is out of range",
                self.accuracy
            )));
        }

        Ok(())
    }
}
