//! Training domain - collection sessions, datasets and outcomes

mod dataset;
mod session;

use serde::Serialize;

pub use dataset::{DatasetSplit, LabeledDataset};
pub use session::{GestureSamples, SampleSlot, SessionRole, TrainingSession};

/// Result of a training run, reported as data rather than an error
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingOutcome {
    pub success: bool,
    pub accuracy: f32,
}

impl TrainingOutcome {
    pub fn succeeded(accuracy: f32) -> Self {
        Self {
            success: true,
            accuracy,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            accuracy: 0.0,
        }
    }
}
