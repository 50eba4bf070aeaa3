//! Feature extraction seam - frame bytes in, landmark feature vector out

#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Coordinates per hand landmark
pub const LANDMARK_DIMENSIONS: usize = 3;

/// A single 3D hand landmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Fixed-length numeric feature vector for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Flatten landmarks into x,y,z triples
    pub fn from_landmarks(landmarks: &[Landmark]) -> Self {
        Self(landmarks.iter().flat_map(|l| [l.x, l.y, l.z]).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// View the vector as landmarks; trailing values that do not form a triple are ignored
    pub fn landmarks(&self) -> Vec<Landmark> {
        self.0
            .chunks_exact(LANDMARK_DIMENSIONS)
            .map(|c| Landmark {
                x: c[0],
                y: c[1],
                z: c[2],
            })
            .collect()
    }
}

/// Outcome of running the extractor on one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// No hand found; a normal, frequent outcome
    NoHand,
    Hand(FeatureVector),
}

impl Detection {
    pub fn is_hand(&self) -> bool {
        matches!(self, Self::Hand(_))
    }

    pub fn into_features(self) -> Option<FeatureVector> {
        match self {
            Self::NoHand => None,
            Self::Hand(features) => Some(features),
        }
    }
}

/// Converts one frame into a feature vector.
///
/// Implementations are not assumed safe for concurrent use, hence `&mut self`;
/// callers serialize access.
#[cfg_attr(test, automock)]
pub trait FeatureExtractor: Send {
    /// Run detection on raw (already transport-decoded) frame bytes
    fn extract(&mut self, frame: &[u8]) -> Result<Detection, DomainError>;

    /// Length of vectors produced on detection
    fn feature_len(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmarks_round_trip_through_vector() {
        let points = vec![
            Landmark {
                x: 0.1,
                y: 0.2,
                z: 0.3,
            },
            Landmark {
                x: 0.4,
                y: 0.5,
                z: 0.6,
            },
        ];

        let vector = FeatureVector::from_landmarks(&points);
        assert_eq!(vector.as_slice(), &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(vector.landmarks(), points);
    }

    #[test]
    fn test_detection_into_features() {
        assert!(Detection::NoHand.into_features().is_none());
        let detection = Detection::Hand(FeatureVector::new(vec![1.0]));
        assert!(detection.is_hand());
        assert_eq!(detection.into_features().unwrap().len(), 1);
    }
}
