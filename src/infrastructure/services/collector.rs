//! Training collector - owns the single current collection session

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::extractor::FeatureVector;
use crate::domain::gesture::{GestureCatalog, GestureVocabulary, LessonId, ModelOwner};
use crate::domain::training::{SampleSlot, SessionRole, TrainingSession};
use crate::domain::DomainError;

/// Read-only view of the current session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub role: SessionRole,
    pub lesson_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub vocabulary: GestureVocabulary,
    pub counts: Vec<(String, usize)>,
}

impl SessionSummary {
    fn of(session: &TrainingSession) -> Self {
        Self {
            session_id: session.id().to_string(),
            role: session.role(),
            lesson_id: session.lesson_id().map(LessonId::to_string),
            created_at: session.created_at(),
            vocabulary: session.vocabulary().clone(),
            counts: session.counts(),
        }
    }
}

/// Holds at most one current session; starting a session replaces the
/// previous one wholesale.
#[derive(Debug)]
pub struct TrainingCollector {
    catalog: Arc<GestureCatalog>,
    current: Mutex<Option<TrainingSession>>,
    generations: AtomicU64,
}

impl TrainingCollector {
    pub fn new(catalog: Arc<GestureCatalog>) -> Self {
        Self {
            catalog,
            current: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<TrainingSession>>, DomainError> {
        self.current
            .lock()
            .map_err(|e| DomainError::internal(format!("Training session lock poisoned: {}", e)))
    }

    fn new_session(
        &self,
        session_id: &str,
        role: SessionRole,
        lesson_id: Option<LessonId>,
    ) -> TrainingSession {
        let owner = match (role, &lesson_id) {
            (SessionRole::Admin, Some(id)) => ModelOwner::Lesson(id.clone()),
            _ => ModelOwner::Default,
        };
        let vocabulary = self.catalog.resolve(&owner);

        if vocabulary.is_empty() {
            warn!(session_id, owner = %owner, "Session vocabulary is empty, samples will be rejected");
        }

        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        TrainingSession::new(session_id, role, lesson_id, vocabulary, generation)
    }

    /// Start a session, discarding the previous one and its buffers
    pub fn start(
        &self,
        session_id: &str,
        role: SessionRole,
        lesson_id: Option<LessonId>,
    ) -> Result<SessionSummary, DomainError> {
        let session = self.new_session(session_id, role, lesson_id);
        let summary = SessionSummary::of(&session);

        let previous = self.lock()?.replace(session);

        if let Some(previous) = previous {
            info!(
                previous_session = previous.id(),
                discarded_samples = previous.total_samples(),
                "Replacing training session"
            );
        }

        info!(
            session_id,
            role = %role,
            lesson_id = ?summary.lesson_id,
            gestures = summary.vocabulary.len(),
            "Training session started"
        );

        Ok(summary)
    }

    /// Id of the current session, if any
    pub fn current_id(&self) -> Result<Option<String>, DomainError> {
        Ok(self.lock()?.as_ref().map(|s| s.id().to_string()))
    }

    pub fn summary(&self) -> Result<Option<SessionSummary>, DomainError> {
        Ok(self.lock()?.as_ref().map(SessionSummary::of))
    }

    /// Resolve where a sample for `gesture` goes.
    ///
    /// A different (or absent) current session is replaced by a new regular
    /// session for `session_id`. Returns `None` when the gesture is outside
    /// the session vocabulary.
    pub fn slot_for(&self, session_id: &str, gesture: &str) -> Result<Option<SampleSlot>, DomainError> {
        let mut current = self.lock()?;

        if current.as_ref().map(TrainingSession::id) != Some(session_id) {
            let session = self.new_session(session_id, SessionRole::Regular, None);
            info!(session_id, "Implicitly starting regular training session");
            *current = Some(session);
        }

        let slot = current.as_ref().and_then(|s| s.slot_for(gesture));

        if slot.is_none() {
            warn!(session_id, gesture, "Gesture is not in the session vocabulary");
        }

        Ok(slot)
    }

    /// Current count for a slot, 0 if its session has been replaced
    pub fn count(&self, slot: SampleSlot) -> Result<usize, DomainError> {
        Ok(self
            .lock()?
            .as_ref()
            .filter(|s| s.generation() == slot.generation)
            .map(|s| s.count(slot.index))
            .unwrap_or(0))
    }

    /// Append a sample; returns the new count, or 0 if the session is gone
    pub fn record(&self, slot: SampleSlot, features: FeatureVector) -> Result<usize, DomainError> {
        let mut current = self.lock()?;

        let recorded = current.as_mut().and_then(|s| s.record(slot, features));

        if recorded.is_none() {
            warn!("Dropping sample for a session that is no longer current");
        }

        Ok(recorded.unwrap_or(0))
    }

    /// Copy of the current session when its id matches
    pub fn snapshot(&self, session_id: &str) -> Result<Option<TrainingSession>, DomainError> {
        Ok(self
            .lock()?
            .as_ref()
            .filter(|s| s.id() == session_id)
            .cloned())
    }

    /// Clear the samples a successful training run consumed.
    ///
    /// `trained` holds the bucket sizes of the trained snapshot. Samples added
    /// while training ran are kept and the session stays current; otherwise
    /// the session is dropped. Returns `false` when the session was replaced
    /// meanwhile.
    pub fn finish(&self, generation: u64, trained: &[usize]) -> Result<bool, DomainError> {
        let mut current = self.lock()?;

        let Some(session) = current.as_mut().filter(|s| s.generation() == generation) else {
            return Ok(false);
        };

        let remaining = session.discard_trained(trained);

        if remaining == 0 {
            *current = None;
        } else {
            info!(
                session_id = session.id(),
                remaining,
                "Keeping samples added during training"
            );
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn collector() -> TrainingCollector {
        let mut lessons = BTreeMap::new();
        lessons.insert(
            LessonId::new("lesson_2").unwrap(),
            GestureVocabulary::new(["Happy", "Sad", "Angry", "Love"]).unwrap(),
        );
        let catalog = GestureCatalog::new(
            GestureVocabulary::new(["Yes", "No", "I Love You", "Hello", "Thank You"]).unwrap(),
            lessons,
        );
        TrainingCollector::new(Arc::new(catalog))
    }

    fn vector() -> FeatureVector {
        FeatureVector::new(vec![0.1, 0.2, 0.3])
    }

    #[test]
    fn test_start_precreates_empty_buckets() {
        let collector = collector();
        let summary = collector.start("s1", SessionRole::Regular, None).unwrap();

        assert_eq!(summary.counts.len(), 5);
        assert!(summary.counts.iter().all(|(_, c)| *c == 0));
    }

    #[test]
    fn test_admin_session_uses_lesson_vocabulary() {
        let collector = collector();
        let lesson = LessonId::new("lesson_2").unwrap();
        let summary = collector
            .start("admin_level_1", SessionRole::Admin, Some(lesson))
            .unwrap();

        assert_eq!(summary.vocabulary.get(0), Some("Happy"));
        assert_eq!(summary.lesson_id.as_deref(), Some("lesson_2"));
    }

    #[test]
    fn test_admin_session_with_unknown_lesson_is_empty() {
        let collector = collector();
        let lesson = LessonId::new("lesson_42").unwrap();
        let summary = collector
            .start("admin_level_1", SessionRole::Admin, Some(lesson))
            .unwrap();

        assert!(summary.vocabulary.is_empty());
        assert!(collector.slot_for("admin_level_1", "Happy").unwrap().is_none());
    }

    #[test]
    fn test_samples_accumulate() {
        let collector = collector();
        collector.start("s1", SessionRole::Regular, None).unwrap();

        let slot = collector.slot_for("s1", "Hello").unwrap().unwrap();
        assert_eq!(collector.record(slot, vector()).unwrap(), 1);
        assert_eq!(collector.record(slot, vector()).unwrap(), 2);
        assert_eq!(collector.count(slot).unwrap(), 2);
    }

    #[test]
    fn test_unknown_gesture_leaves_buffers_unchanged() {
        let collector = collector();
        collector.start("s1", SessionRole::Regular, None).unwrap();
        let slot = collector.slot_for("s1", "Yes").unwrap().unwrap();
        collector.record(slot, vector()).unwrap();

        assert!(collector.slot_for("s1", "Happy").unwrap().is_none());

        let summary = collector.summary().unwrap().unwrap();
        assert_eq!(summary.counts.iter().map(|(_, c)| c).sum::<usize>(), 1);
    }

    #[test]
    fn test_new_session_discards_previous_samples() {
        let collector = collector();
        collector.start("a", SessionRole::Regular, None).unwrap();
        let slot = collector.slot_for("a", "Yes").unwrap().unwrap();
        collector.record(slot, vector()).unwrap();

        let summary = collector.start("b", SessionRole::Regular, None).unwrap();

        assert!(summary.counts.iter().all(|(_, c)| *c == 0));
        assert!(collector.snapshot("a").unwrap().is_none());
        // A slot issued for the old session cannot write into the new one
        assert_eq!(collector.record(slot, vector()).unwrap(), 0);
        assert_eq!(collector.snapshot("b").unwrap().unwrap().total_samples(), 0);
    }

    #[test]
    fn test_different_session_id_implicitly_starts_regular_session() {
        let collector = collector();
        let lesson = LessonId::new("lesson_2").unwrap();
        collector
            .start("admin_level_1", SessionRole::Admin, Some(lesson))
            .unwrap();

        let slot = collector.slot_for("user_7", "Hello").unwrap();

        assert!(slot.is_some());
        let summary = collector.summary().unwrap().unwrap();
        assert_eq!(summary.session_id, "user_7");
        assert_eq!(summary.role, SessionRole::Regular);
    }

    #[test]
    fn test_finish_ignores_replaced_generation() {
        let collector = collector();
        collector.start("a", SessionRole::Regular, None).unwrap();
        let generation = collector.snapshot("a").unwrap().unwrap().generation();
        collector.start("b", SessionRole::Regular, None).unwrap();

        assert!(!collector.finish(generation, &[]).unwrap());
        assert_eq!(collector.current_id().unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_finish_clears_fully_trained_session() {
        let collector = collector();
        collector.start("s1", SessionRole::Regular, None).unwrap();
        let slot = collector.slot_for("s1", "Yes").unwrap().unwrap();
        collector.record(slot, vector()).unwrap();

        let trained = collector.snapshot("s1").unwrap().unwrap();
        assert!(collector.finish(trained.generation(), &trained.bucket_sizes()).unwrap());
        assert!(collector.summary().unwrap().is_none());
    }

    #[test]
    fn test_finish_keeps_samples_recorded_during_training() {
        let collector = collector();
        collector.start("s1", SessionRole::Regular, None).unwrap();
        let yes = collector.slot_for("s1", "Yes").unwrap().unwrap();
        collector.record(yes, vector()).unwrap();
        collector.record(yes, vector()).unwrap();

        let trained = collector.snapshot("s1").unwrap().unwrap();

        // Arrives after the snapshot was handed to the trainer
        let hello = collector.slot_for("s1", "Hello").unwrap().unwrap();
        assert_eq!(collector.record(hello, vector()).unwrap(), 1);

        assert!(collector.finish(trained.generation(), &trained.bucket_sizes()).unwrap());

        let summary = collector.summary().unwrap().unwrap();
        assert_eq!(summary.session_id, "s1");
        let counts: Vec<usize> = summary.counts.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![0, 0, 0, 1, 0]);
    }
}
