//! Extractor for frames carrying pre-computed hand landmarks
//!
//! The decoded payload is a JSON document `{"landmarks": [{"x":..,"y":..,"z":..}, ...]}`
//! as produced by on-device hand tracking. An empty list means no hand.

use serde::Deserialize;

use crate::domain::extractor::{Detection, FeatureExtractor, FeatureVector, Landmark, LANDMARK_DIMENSIONS};
use crate::domain::DomainError;

#[derive(Debug, Deserialize)]
struct LandmarkPayload {
    #[serde(default)]
    landmarks: Vec<Landmark>,
}

/// Landmark-document extractor producing `feature_len` values per hand
#[derive(Debug, Clone)]
pub struct LandmarkPayloadExtractor {
    feature_len: usize,
}

impl LandmarkPayloadExtractor {
    pub fn new(feature_len: usize) -> Self {
        Self { feature_len }
    }
}

impl FeatureExtractor for LandmarkPayloadExtractor {
    fn extract(&mut self, frame: &[u8]) -> Result<Detection, DomainError> {
        let payload: LandmarkPayload = serde_json::from_slice(frame)
            .map_err(|e| DomainError::extraction(format!("Failed to decode frame: {}", e)))?;

        if payload.landmarks.is_empty() {
            return Ok(Detection::NoHand);
        }

        let expected = self.feature_len / LANDMARK_DIMENSIONS;
        if payload.landmarks.len() != expected {
            return Err(DomainError::extraction(format!(
                "Expected {} landmarks, got {}",
                expected,
                payload.landmarks.len()
            )));
        }

        if payload
            .landmarks
            .iter()
            .any(|l| !(l.x.is_finite() && l.y.is_finite() && l.z.is_finite()))
        {
            return Err(DomainError::extraction("Landmark coordinates must be finite"));
        }

        Ok(Detection::Hand(FeatureVector::from_landmarks(&payload.landmarks)))
    }

    fn feature_len(&self) -> usize {
        self.feature_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(count: usize) -> Vec<u8> {
        let points: Vec<_> = (0..count)
            .map(|i| json!({"x": i as f32 * 0.01, "y": 0.5, "z": 0.0}))
            .collect();
        serde_json::to_vec(&json!({ "landmarks": points })).unwrap()
    }

    #[test]
    fn test_full_hand_is_detected() {
        let mut extractor = LandmarkPayloadExtractor::new(63);
        let detection = extractor.extract(&payload(21)).unwrap();

        let features = detection.into_features().unwrap();
        assert_eq!(features.len(), 63);
        assert_eq!(features.as_slice()[4], 0.5);
    }

    #[test]
    fn test_empty_landmarks_is_no_hand() {
        let mut extractor = LandmarkPayloadExtractor::new(63);
        assert_eq!(extractor.extract(&payload(0)).unwrap(), Detection::NoHand);
        assert_eq!(extractor.extract(b"{}").unwrap(), Detection::NoHand);
    }

    #[test]
    fn test_wrong_landmark_count_is_rejected() {
        let mut extractor = LandmarkPayloadExtractor::new(63);
        assert!(extractor.extract(&payload(5)).is_err());
    }

    #[test]
    fn test_non_json_payload_is_rejected() {
        let mut extractor = LandmarkPayloadExtractor::new(63);
        let result = extractor.extract(&[0xFF, 0xD8, 0xFF]);
        assert!(matches!(result, Err(DomainError::Extraction { .. })));
    }
}
