//! Deterministic finger-extension heuristic used when no trained model is loaded

use crate::domain::extractor::LANDMARK_DIMENSIONS;
use crate::domain::gesture::GestureVocabulary;

/// Hand landmarks per detection
pub const HAND_LANDMARKS: usize = 21;

/// (tip, pip) landmark pairs for thumb, index, middle, ring, pinky
const FINGER_JOINTS: [(usize, usize); 5] = [(4, 3), (8, 6), (12, 10), (16, 14), (20, 18)];

const LABELS: [&str; 6] = ["Hello", "I Love You", "Yes", "No", "Thank You", "Unknown"];
const UNKNOWN: usize = 5;

/// Extended-finger pattern table
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerPatternRules;

impl FingerPatternRules {
    /// Labels the table can produce, in class-index order
    pub fn vocabulary() -> GestureVocabulary {
        GestureVocabulary::new(LABELS).unwrap_or_default()
    }

    /// Class index into [`Self::vocabulary`] and a fixed confidence
    pub fn classify(&self, features: &[f32]) -> (usize, f32) {
        if features.len() < HAND_LANDMARKS * LANDMARK_DIMENSIONS {
            return (UNKNOWN, 0.3);
        }

        let y = |landmark: usize| features[landmark * LANDMARK_DIMENSIONS + 1];
        let up: Vec<bool> = FINGER_JOINTS
            .iter()
            .map(|&(tip, pip)| y(tip) < y(pip))
            .collect();

        match up.as_slice() {
            [true, true, true, true, true] => (0, 0.8),
            [false, true, false, false, true] => (1, 0.8),
            [true, false, false, false, false] => (2, 0.7),
            [false, true, true, false, false] => (3, 0.7),
            [false, false, false, false, false] => (4, 0.6),
            _ => (UNKNOWN, 0.3),
        }
    }
}
