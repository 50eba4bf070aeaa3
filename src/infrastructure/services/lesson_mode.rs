//! Lesson mode manager - Inactive / Active(lesson) state machine

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::domain::artifact::{ArtifactLoad, ArtifactMetadata, ArtifactStore};
use crate::domain::classifier::{ClassifierKind, ClassifierSet, Prediction};
use crate::domain::gesture::{GestureVocabulary, LessonId, ModelOwner};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_lesson_transition;

/// Immutable snapshot of an active lesson. Vocabulary and classifiers come
/// from the same artifact and are swapped together.
#[derive(Debug)]
pub struct LessonContext {
    lesson_id: LessonId,
    vocabulary: GestureVocabulary,
    classifiers: ClassifierSet,
    metadata: ArtifactMetadata,
    entered_at: DateTime<Utc>,
}

impl LessonContext {
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    pub fn vocabulary(&self) -> &GestureVocabulary {
        &self.vocabulary
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    pub fn entered_at(&self) -> DateTime<Utc> {
        self.entered_at
    }

    pub fn kinds(&self) -> Vec<ClassifierKind> {
        self.classifiers.kinds()
    }

    /// Predict against the lesson vocabulary; `None` is a miss
    pub fn predict(&self, features: &[f32]) -> Option<Prediction> {
        match self.classifiers.predict(features) {
            Ok(prediction) => prediction,
            Err(e) => {
                debug!(lesson_id = %self.lesson_id, error = %e, "Lesson prediction miss");
                None
            }
        }
    }
}

/// Pure read of the lesson state
#[derive(Debug, Clone, Serialize)]
pub struct LessonStatus {
    pub active: bool,
    pub lesson_id: Option<String>,
    pub vocabulary: GestureVocabulary,
    pub has_model: bool,
    pub metadata: Option<ArtifactMetadata>,
}

/// Owns the active lesson context, if any
pub struct LessonModeManager {
    store: Arc<dyn ArtifactStore>,
    active: RwLock<Option<Arc<LessonContext>>>,
}

impl std::fmt::Debug for LessonModeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LessonModeManager").finish_non_exhaustive()
    }
}

impl LessonModeManager {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            active: RwLock::new(None),
        }
    }

    async fn load_context(&self, lesson_id: &LessonId) -> Result<LessonContext, DomainError> {
        let owner = ModelOwner::Lesson(lesson_id.clone());

        let models = match self.store.load(&owner).await? {
            ArtifactLoad::Found(models) => models,
            ArtifactLoad::NotFound => {
                return Err(DomainError::not_found(format!(
                    "Level model not found for {}. Please create it first.",
                    lesson_id
                )));
            }
            ArtifactLoad::Corrupt { reason } => {
                error!(lesson_id = %lesson_id, reason = %reason, "Lesson artifact is corrupt");
                return Err(DomainError::artifact(format!(
                    "Level model for {} could not be loaded: {}",
                    lesson_id, reason
                )));
            }
        };

        let metadata = models.metadata.clone();

        Ok(LessonContext {
            lesson_id: lesson_id.clone(),
            vocabulary: metadata.gestures.clone(),
            classifiers: models.into_classifier_set(),
            metadata,
            entered_at: Utc::now(),
        })
    }

    fn swap(&self, next: Option<Arc<LessonContext>>) -> Result<Option<Arc<LessonContext>>, DomainError> {
        let mut active = self
            .active
            .write()
            .map_err(|e| DomainError::internal(format!("Lesson mode lock poisoned: {}", e)))?;
        Ok(std::mem::replace(&mut *active, next))
    }

    /// Enter (or switch to) a lesson. On failure the prior state is unchanged.
    pub async fn enter(&self, lesson_id: &LessonId) -> Result<Arc<LessonContext>, DomainError> {
        let context = Arc::new(self.load_context(lesson_id).await?);

        let previous = self.swap(Some(Arc::clone(&context)))?;
        record_lesson_transition("enter");

        info!(
            lesson_id = %lesson_id,
            previous = ?previous.as_ref().map(|c| c.lesson_id().to_string()),
            gestures = context.vocabulary().len(),
            kinds = ?context.kinds(),
            "Lesson mode entered"
        );

        Ok(context)
    }

    /// Leave lesson mode; a no-op when already inactive
    pub fn exit(&self) -> Result<(), DomainError> {
        if let Some(previous) = self.swap(None)? {
            record_lesson_transition("exit");
            info!(lesson_id = %previous.lesson_id(), "Lesson mode exited");
        }
        Ok(())
    }

    pub fn current(&self) -> Result<Option<Arc<LessonContext>>, DomainError> {
        self.active
            .read()
            .map(|a| a.clone())
            .map_err(|e| DomainError::internal(format!("Lesson mode lock poisoned: {}", e)))
    }

    pub fn status(&self) -> Result<LessonStatus, DomainError> {
        Ok(match self.current()? {
            Some(context) => LessonStatus {
                active: true,
                lesson_id: Some(context.lesson_id().to_string()),
                vocabulary: context.vocabulary().clone(),
                has_model: !context.kinds().is_empty(),
                metadata: Some(context.metadata().clone()),
            },
            None => LessonStatus {
                active: false,
                lesson_id: None,
                vocabulary: GestureVocabulary::empty(),
                has_model: false,
                metadata: None,
            },
        })
    }

    /// Reload the context after its lesson was retrained, only if that lesson is still active
    pub async fn refresh_if_active(&self, lesson_id: &LessonId) -> Result<bool, DomainError> {
        let is_active = self
            .current()?
            .is_some_and(|c| c.lesson_id() == lesson_id);
        if !is_active {
            return Ok(false);
        }

        let context = Arc::new(self.load_context(lesson_id).await?);

        let mut active = self
            .active
            .write()
            .map_err(|e| DomainError::internal(format!("Lesson mode lock poisoned: {}", e)))?;

        // Lesson may have been exited or switched while the artifact was loading
        if active.as_ref().is_some_and(|c| c.lesson_id() == lesson_id) {
            *active = Some(context);
            drop(active);
            record_lesson_transition("refresh");
            info!(lesson_id = %lesson_id, "Active lesson model refreshed");
            Ok(true)
        } else {
            warn!(lesson_id = %lesson_id, "Lesson changed during refresh, keeping current state");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::{MockArtifactStore, TrainedModels};
    use crate::domain::training::SessionRole;
    use crate::infrastructure::services::trainer::fit_models;
    use crate::infrastructure::services::trainer::tests::{filled_session, quick_config};

    fn lesson_models(lesson: &str) -> TrainedModels {
        let session = filled_session(
            "admin_level_1",
            SessionRole::Admin,
            Some(lesson),
            &["Happy", "Sad", "Angry", "Love"],
            8,
        );
        fit_models(&session, &quick_config()).unwrap()
    }

    fn store_with_lesson(lesson: &'static str) -> MockArtifactStore {
        let models = lesson_models(lesson);
        let mut store = MockArtifactStore::new();
        store.expect_load().returning(move |owner| match owner {
            ModelOwner::Lesson(id) if id.as_str() == lesson => {
                Ok(ArtifactLoad::Found(models.clone()))
            }
            ModelOwner::Lesson(id) if id.as_str() == "lesson_9" => Ok(ArtifactLoad::Corrupt {
                reason: "metadata unreadable".to_string(),
            }),
            _ => Ok(ArtifactLoad::NotFound),
        });
        store
    }

    fn lesson(id: &str) -> LessonId {
        LessonId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_enter_activates_lesson_vocabulary() {
        let manager = LessonModeManager::new(Arc::new(store_with_lesson("lesson_2")));

        manager.enter(&lesson("lesson_2")).await.unwrap();

        let status = manager.status().unwrap();
        assert!(status.active);
        assert_eq!(status.lesson_id.as_deref(), Some("lesson_2"));
        assert_eq!(status.vocabulary.len(), 4);
        assert!(status.has_model);
    }

    #[tokio::test]
    async fn test_enter_missing_lesson_keeps_state() {
        let manager = LessonModeManager::new(Arc::new(store_with_lesson("lesson_2")));

        let result = manager.enter(&lesson("lesson_3")).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
        assert!(!manager.status().unwrap().active);

        manager.enter(&lesson("lesson_2")).await.unwrap();
        let result = manager.enter(&lesson("lesson_9")).await;
        assert!(matches!(result, Err(DomainError::Artifact { .. })));
        assert_eq!(
            manager.status().unwrap().lesson_id.as_deref(),
            Some("lesson_2")
        );
    }

    #[tokio::test]
    async fn test_exit_is_idempotent() {
        let manager = LessonModeManager::new(Arc::new(store_with_lesson("lesson_2")));
        manager.enter(&lesson("lesson_2")).await.unwrap();

        manager.exit().unwrap();
        let first = manager.status().unwrap();
        manager.exit().unwrap();
        let second = manager.status().unwrap();

        assert!(!first.active);
        assert!(!second.active);
        assert!(second.vocabulary.is_empty());
        assert!(manager.current().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_predict_resolves_against_lesson_vocabulary() {
        let manager = LessonModeManager::new(Arc::new(store_with_lesson("lesson_2")));
        let context = manager.enter(&lesson("lesson_2")).await.unwrap();

        // Second gesture in the lesson: dimension 1 high, dimension 4 mid
        let prediction = context.predict(&[0.0, 1.0, 0.0, 0.0, 0.5, 0.0]).unwrap();
        assert_eq!(prediction.gesture, "Sad");
    }

    #[tokio::test]
    async fn test_predict_with_wrong_width_is_miss() {
        let manager = LessonModeManager::new(Arc::new(store_with_lesson("lesson_2")));
        let context = manager.enter(&lesson("lesson_2")).await.unwrap();

        assert!(context.predict(&[0.1; 63]).is_none());
    }

    #[tokio::test]
    async fn test_refresh_only_applies_to_active_lesson() {
        let manager = LessonModeManager::new(Arc::new(store_with_lesson("lesson_2")));

        assert!(!manager.refresh_if_active(&lesson("lesson_2")).await.unwrap());

        let before = manager.enter(&lesson("lesson_2")).await.unwrap();
        assert!(!manager.refresh_if_active(&lesson("lesson_3")).await.unwrap());
        assert!(manager.refresh_if_active(&lesson("lesson_2")).await.unwrap());

        let after = manager.current().unwrap().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }
}
