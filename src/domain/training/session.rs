//! Training session entity - role, vocabulary and per-gesture sample buffers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::extractor::FeatureVector;
use crate::domain::gesture::{GestureVocabulary, LessonId, ModelOwner};

/// Role under which samples are collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    Regular,
    Admin,
}

impl SessionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for SessionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only samples for one gesture; `labels` runs parallel to `features`
#[derive(Debug, Clone, Default)]
pub struct GestureSamples {
    features: Vec<FeatureVector>,
    labels: Vec<usize>,
}

impl GestureSamples {
    pub fn push(&mut self, features: FeatureVector, label: usize) -> usize {
        self.features.push(features);
        self.labels.push(label);
        self.features.len()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Drop the oldest `n` samples
    pub fn discard_front(&mut self, n: usize) {
        let n = n.min(self.features.len());
        self.features.drain(..n);
        self.labels.drain(..n);
    }

    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }
}

/// Slot a sample will be appended to, bound to the session it was issued by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSlot {
    pub generation: u64,
    pub index: usize,
}

/// The current collection session.
///
/// Buckets are pre-created for every gesture of the resolved vocabulary and
/// indexed by vocabulary position, so the class index of a sample is always
/// its gesture's position.
#[derive(Debug, Clone)]
pub struct TrainingSession {
    id: String,
    role: SessionRole,
    lesson_id: Option<LessonId>,
    created_at: DateTime<Utc>,
    generation: u64,
    vocabulary: GestureVocabulary,
    buckets: Vec<GestureSamples>,
}

impl TrainingSession {
    /// A lesson id is only retained for admin sessions
    pub fn new(
        id: impl Into<String>,
        role: SessionRole,
        lesson_id: Option<LessonId>,
        vocabulary: GestureVocabulary,
        generation: u64,
    ) -> Self {
        let lesson_id = match role {
            SessionRole::Admin => lesson_id,
            SessionRole::Regular => None,
        };

        Self {
            id: id.into(),
            role,
            lesson_id,
            created_at: Utc::now(),
            generation,
            buckets: vec![GestureSamples::default(); vocabulary.len()],
            vocabulary,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn lesson_id(&self) -> Option<&LessonId> {
        self.lesson_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn vocabulary(&self) -> &GestureVocabulary {
        &self.vocabulary
    }

    pub fn buckets(&self) -> &[GestureSamples] {
        &self.buckets
    }

    /// Artifact family this session trains
    pub fn owner(&self) -> ModelOwner {
        match &self.lesson_id {
            Some(id) => ModelOwner::Lesson(id.clone()),
            None => ModelOwner::Default,
        }
    }

    /// Slot for a gesture, `None` when it is outside the session vocabulary
    pub fn slot_for(&self, gesture: &str) -> Option<SampleSlot> {
        self.vocabulary.index_of(gesture).map(|index| SampleSlot {
            generation: self.generation,
            index,
        })
    }

    pub fn count(&self, index: usize) -> usize {
        self.buckets.get(index).map(GestureSamples::len).unwrap_or(0)
    }

    /// Append a sample; `None` when the slot belongs to another session
    pub fn record(&mut self, slot: SampleSlot, features: FeatureVector) -> Option<usize> {
        if slot.generation != self.generation {
            return None;
        }

        self.buckets
            .get_mut(slot.index)
            .map(|bucket| bucket.push(features, slot.index))
    }

    pub fn total_samples(&self) -> usize {
        self.buckets.iter().map(GestureSamples::len).sum()
    }

    /// Per-bucket sample counts in vocabulary order
    pub fn bucket_sizes(&self) -> Vec<usize> {
        self.buckets.iter().map(GestureSamples::len).collect()
    }

    /// Remove the samples a training run consumed, given the bucket sizes it
    /// saw. Samples appended since stay. Returns how many remain.
    pub fn discard_trained(&mut self, trained: &[usize]) -> usize {
        for (bucket, n) in self.buckets.iter_mut().zip(trained) {
            bucket.discard_front(*n);
        }
        self.total_samples()
    }

    /// Per-gesture counts in vocabulary order
    pub fn counts(&self) -> Vec<(String, usize)> {
        self.vocabulary
            .iter()
            .zip(&self.buckets)
            .map(|(gesture, bucket)| (gesture.to_string(), bucket.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> GestureVocabulary {
        GestureVocabulary::new(["Hello", "Thank You", "Yes", "No"]).unwrap()
    }

    #[test]
    fn test_buckets_precreated_per_gesture() {
        let session = TrainingSession::new("s1", SessionRole::Regular, None, vocabulary(), 1);
        assert_eq!(session.buckets().len(), 4);
        assert_eq!(session.total_samples(), 0);
        assert!(session.counts().iter().all(|(_, count)| *count == 0));
    }

    #[test]
    fn test_record_uses_vocabulary_position_as_label() {
        let mut session = TrainingSession::new("s1", SessionRole::Regular, None, vocabulary(), 1);
        let slot = session.slot_for("Yes").unwrap();

        assert_eq!(session.record(slot, FeatureVector::new(vec![0.1])), Some(1));
        assert_eq!(session.record(slot, FeatureVector::new(vec![0.2])), Some(2));
        assert_eq!(session.buckets()[2].labels(), &[2, 2]);
    }

    #[test]
    fn test_unknown_gesture_has_no_slot() {
        let session = TrainingSession::new("s1", SessionRole::Regular, None, vocabulary(), 1);
        assert!(session.slot_for("Happy").is_none());
    }

    #[test]
    fn test_stale_slot_is_ignored() {
        let mut session = TrainingSession::new("s2", SessionRole::Regular, None, vocabulary(), 2);
        let stale = SampleSlot {
            generation: 1,
            index: 0,
        };

        assert_eq!(session.record(stale, FeatureVector::new(vec![0.1])), None);
        assert_eq!(session.total_samples(), 0);
    }

    #[test]
    fn test_regular_session_drops_lesson_id() {
        let lesson = LessonId::new("lesson_2").unwrap();
        let session =
            TrainingSession::new("s1", SessionRole::Regular, Some(lesson), vocabulary(), 1);

        assert!(session.lesson_id().is_none());
        assert_eq!(session.owner(), ModelOwner::Default);
    }

    #[test]
    fn test_admin_session_owns_lesson() {
        let lesson = LessonId::new("lesson_2").unwrap();
        let session = TrainingSession::new(
            "admin_level_1",
            SessionRole::Admin,
            Some(lesson.clone()),
            vocabulary(),
            1,
        );

        assert_eq!(session.owner(), ModelOwner::Lesson(lesson));
        assert_eq!(session.role().to_string(), "admin");
    }

    #[test]
    fn test_discard_trained_keeps_later_samples() {
        let mut session = TrainingSession::new("s1", SessionRole::Regular, None, vocabulary(), 1);
        let hello = session.slot_for("Hello").unwrap();
        let yes = session.slot_for("Yes").unwrap();
        session.record(hello, FeatureVector::new(vec![0.1]));
        session.record(yes, FeatureVector::new(vec![0.2]));
        let trained = session.bucket_sizes();

        session.record(hello, FeatureVector::new(vec![0.3]));

        assert_eq!(session.discard_trained(&trained), 1);
        assert_eq!(session.buckets()[0].features(), &[FeatureVector::new(vec![0.3])]);
        assert!(session.buckets()[2].is_empty());
    }
}
