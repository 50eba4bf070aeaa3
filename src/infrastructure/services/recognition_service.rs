//! Recognition service - the boundary operations the transport layer calls

use std::sync::Arc;

use tracing::{error, info, warn};

use super::collector::{SessionSummary, TrainingCollector};
use super::default_dispatcher::DefaultDispatcher;
use super::dispatch::{DispatchEngine, FrameResult};
use super::lesson_mode::{LessonContext, LessonModeManager, LessonStatus};
use super::trainer::ModelTrainer;
use crate::config::{InferenceConfig, TrainingConfig};
use crate::domain::artifact::{ArtifactMetadata, ArtifactStore};
use crate::domain::extractor::FeatureExtractor;
use crate::domain::gesture::{validate_session_id, GestureCatalog, LessonId, ModelOwner};
use crate::domain::training::{SessionRole, TrainingOutcome};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_training_run;

/// Collaborators a [`RecognitionService`] is built from
pub struct RecognitionServiceDeps {
    pub catalog: Arc<GestureCatalog>,
    pub store: Arc<dyn ArtifactStore>,
    pub extractor: Box<dyn FeatureExtractor>,
    pub inference: InferenceConfig,
    pub training: TrainingConfig,
}

/// Owns the collector, trainer, dispatchers and engine for one process
pub struct RecognitionService {
    catalog: Arc<GestureCatalog>,
    store: Arc<dyn ArtifactStore>,
    collector: TrainingCollector,
    trainer: ModelTrainer,
    engine: DispatchEngine,
}

impl std::fmt::Debug for RecognitionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionService")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl RecognitionService {
    pub fn new(deps: RecognitionServiceDeps) -> Self {
        let default = Arc::new(DefaultDispatcher::new(Arc::clone(&deps.store)));
        let lessons = Arc::new(LessonModeManager::new(Arc::clone(&deps.store)));

        Self {
            collector: TrainingCollector::new(Arc::clone(&deps.catalog)),
            trainer: ModelTrainer::new(Arc::clone(&deps.store), deps.training),
            engine: DispatchEngine::new(deps.extractor, default, lessons, &deps.inference),
            catalog: deps.catalog,
            store: deps.store,
        }
    }

    /// Load the default artifact. A corrupt artifact leaves the rule-based fallback in place.
    pub async fn initialize(&self) -> bool {
        match self.engine.default_dispatcher().reload().await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(error = %e, "Failed to load default model, using rule-based fallback");
                false
            }
        }
    }

    pub fn catalog(&self) -> &GestureCatalog {
        &self.catalog
    }

    /// Start a collection session, replacing the current one
    pub fn begin_collection(
        &self,
        session_id: &str,
        role: SessionRole,
        lesson_id: Option<LessonId>,
    ) -> Result<SessionSummary, DomainError> {
        validate_session_id(session_id).map_err(|e| DomainError::validation(e.to_string()))?;
        self.collector.start(session_id, role, lesson_id)
    }

    /// Extract a frame and add it under `gesture`; returns the gesture's sample count.
    ///
    /// Unknown gestures return 0; a frame without a hand returns the count unchanged.
    pub async fn submit_frame(
        &self,
        session_id: &str,
        gesture: &str,
        frame: Vec<u8>,
    ) -> Result<usize, DomainError> {
        validate_session_id(session_id).map_err(|e| DomainError::validation(e.to_string()))?;

        let Some(slot) = self.collector.slot_for(session_id, gesture)? else {
            return Ok(0);
        };

        match self.engine.extract(frame).await?.into_features() {
            Some(features) => self.collector.record(slot, features),
            None => self.collector.count(slot),
        }
    }

    /// Train on the current session and install the result.
    ///
    /// Failures are reported in the outcome; previously installed models stay loaded.
    pub async fn finish_collection(
        &self,
        session_id: &str,
        role: SessionRole,
        lesson_id: Option<&LessonId>,
    ) -> Result<TrainingOutcome, DomainError> {
        let Some(session) = self.collector.snapshot(session_id)? else {
            warn!(session_id, "No current training session with this id");
            return Ok(TrainingOutcome::failed());
        };

        let matches_caller = session.role() == role
            && (role == SessionRole::Regular || session.lesson_id() == lesson_id);
        if !matches_caller {
            warn!(
                session_id,
                role = %role,
                session_role = %session.role(),
                "Training session does not match the caller's role or lesson"
            );
            return Ok(TrainingOutcome::failed());
        }

        let owner = session.owner();
        let generation = session.generation();
        let trained = session.bucket_sizes();

        let models = match self.trainer.train(session).await {
            Ok(models) => models,
            Err(e) => {
                error!(session_id, owner = %owner, error = %e, "Training failed");
                record_training_run(&owner.to_string(), false);
                return Ok(TrainingOutcome::failed());
            }
        };

        record_training_run(&owner.to_string(), true);
        self.collector.finish(generation, &trained)?;

        // Artifact is already persisted; a failed reload only means the old models keep serving
        let installed = match &owner {
            ModelOwner::Default => self.engine.default_dispatcher().reload().await.map(|_| ()),
            ModelOwner::Lesson(id) => self.engine.lessons().refresh_if_active(id).await.map(|_| ()),
        };
        if let Err(e) = installed {
            error!(owner = %owner, error = %e, "Trained model saved but could not be loaded");
        }

        info!(
            session_id,
            owner = %owner,
            accuracy = models.metadata.accuracy,
            "Training session finished"
        );

        Ok(TrainingOutcome::succeeded(models.metadata.accuracy))
    }

    pub async fn predict_frame(&self, frame: Vec<u8>) -> Result<FrameResult, DomainError> {
        self.engine.predict_frame(frame).await
    }

    pub async fn enter_lesson(&self, lesson_id: &LessonId) -> Result<Arc<LessonContext>, DomainError> {
        self.engine.lessons().enter(lesson_id).await
    }

    pub fn exit_lesson(&self) -> Result<(), DomainError> {
        self.engine.lessons().exit()
    }

    pub fn lesson_status(&self) -> Result<LessonStatus, DomainError> {
        self.engine.lessons().status()
    }

    pub async fn list_lesson_artifacts(&self) -> Result<Vec<ArtifactMetadata>, DomainError> {
        self.store.list_lessons().await
    }

    pub fn current_session(&self) -> Result<Option<SessionSummary>, DomainError> {
        self.collector.summary()
    }

    pub fn has_default_model(&self) -> bool {
        self.engine.default_dispatcher().has_trained_model()
    }
}
