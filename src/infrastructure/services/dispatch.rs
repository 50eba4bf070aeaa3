//! Dispatch engine - per-frame extraction and model selection

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::default_dispatcher::{DefaultDispatcher, DefaultModelSnapshot};
use super::lesson_mode::{LessonContext, LessonModeManager};
use crate::config::InferenceConfig;
use crate::domain::classifier::ClassifierKind;
use crate::domain::extractor::{Detection, FeatureExtractor, Landmark};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_frame;

/// Gesture reported when no hand is in the frame
pub const NO_GESTURE: &str = "None";
/// Gesture reported when the active lesson cannot classify a frame
pub const NO_MODEL: &str = "No model";

/// Shared, serialized access to the extractor
pub type SharedExtractor = Arc<Mutex<Box<dyn FeatureExtractor>>>;

/// Result of one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameResult {
    pub timestamp: f64,
    pub hand_detected: bool,
    pub landmarks: Vec<Landmark>,
    pub gesture: String,
    pub confidence: f32,
    pub restricted_mode: bool,
    pub lesson_id: Option<String>,
    pub source: Option<ClassifierKind>,
}

impl FrameResult {
    fn empty(restricted_mode: bool, lesson_id: Option<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            hand_detected: false,
            landmarks: Vec::new(),
            gesture: NO_GESTURE.to_string(),
            confidence: 0.0,
            restricted_mode,
            lesson_id,
            source: None,
        }
    }
}

/// Model set chosen for one frame, read once at the start of the frame
enum ActiveModel {
    Default(Arc<DefaultModelSnapshot>),
    Lesson(Arc<LessonContext>),
}

impl ActiveModel {
    fn mode(&self) -> &'static str {
        match self {
            Self::Default(_) => "default",
            Self::Lesson(_) => "lesson",
        }
    }
}

/// Runs extraction and prediction on a bounded blocking pool with a per-frame timeout
pub struct DispatchEngine {
    extractor: SharedExtractor,
    default: Arc<DefaultDispatcher>,
    lessons: Arc<LessonModeManager>,
    permits: Arc<Semaphore>,
    frame_timeout: Duration,
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("available_workers", &self.permits.available_permits())
            .field("frame_timeout", &self.frame_timeout)
            .finish()
    }
}

impl DispatchEngine {
    pub fn new(
        extractor: Box<dyn FeatureExtractor>,
        default: Arc<DefaultDispatcher>,
        lessons: Arc<LessonModeManager>,
        config: &InferenceConfig,
    ) -> Self {
        Self {
            extractor: Arc::new(Mutex::new(extractor)),
            default,
            lessons,
            permits: Arc::new(Semaphore::new(config.workers.max(1))),
            frame_timeout: Duration::from_millis(config.frame_timeout_ms),
        }
    }

    pub fn default_dispatcher(&self) -> &Arc<DefaultDispatcher> {
        &self.default
    }

    pub fn lessons(&self) -> &Arc<LessonModeManager> {
        &self.lessons
    }

    /// Run CPU-bound work off the async threads.
    ///
    /// The timeout covers both the wait for a worker and the work itself. A
    /// job that outlives it fails its caller but keeps its permit until it
    /// actually finishes.
    async fn run_blocking<F, T>(&self, job: F) -> Result<T, DomainError>
    where
        F: FnOnce() -> Result<T, DomainError> + Send + 'static,
        T: Send + 'static,
    {
        let started = Instant::now();
        let permits = Arc::clone(&self.permits);

        let work = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| DomainError::internal(format!("Worker pool closed: {}", e)))?;

            let joined = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                job()
            })
            .await
            .map_err(|e| DomainError::internal(format!("Frame task failed: {}", e)))?;

            joined
        };

        match tokio::time::timeout(self.frame_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(elapsed_ms, "Frame processing timed out");
                Err(DomainError::timeout(elapsed_ms))
            }
        }
    }

    /// Run only the extractor on a frame
    pub async fn extract(&self, frame: Vec<u8>) -> Result<Detection, DomainError> {
        let extractor = Arc::clone(&self.extractor);
        self.run_blocking(move || lock_extractor(&extractor)?.extract(&frame))
            .await
    }

    fn active_model(&self) -> Result<ActiveModel, DomainError> {
        match self.lessons.current()? {
            Some(context) => Ok(ActiveModel::Lesson(context)),
            None => Ok(ActiveModel::Default(self.default.snapshot()?)),
        }
    }

    /// Extract and classify one frame against the mode current at its start
    pub async fn predict_frame(&self, frame: Vec<u8>) -> Result<FrameResult, DomainError> {
        let started = Instant::now();
        let active = self.active_model()?;
        let mode = active.mode();
        let extractor = Arc::clone(&self.extractor);

        let result = self
            .run_blocking(move || {
                let detection = lock_extractor(&extractor)?.extract(&frame)?;
                classify(&active, detection)
            })
            .await;

        let outcome = match &result {
            Ok(frame) if !frame.hand_detected => "no_hand",
            Ok(frame) if frame.gesture == NO_MODEL => "miss",
            Ok(_) => "hand",
            Err(DomainError::Timeout { .. }) => "timeout",
            Err(_) => "error",
        };
        record_frame(mode, outcome, started.elapsed());

        result
    }
}

fn lock_extractor(
    extractor: &Mutex<Box<dyn FeatureExtractor>>,
) -> Result<std::sync::MutexGuard<'_, Box<dyn FeatureExtractor>>, DomainError> {
    extractor
        .lock()
        .map_err(|e| DomainError::internal(format!("Extractor lock poisoned: {}", e)))
}

fn classify(active: &ActiveModel, detection: Detection) -> Result<FrameResult, DomainError> {
    let (restricted_mode, lesson_id) = match active {
        ActiveModel::Default(_) => (false, None),
        ActiveModel::Lesson(context) => (true, Some(context.lesson_id().to_string())),
    };

    let mut result = FrameResult::empty(restricted_mode, lesson_id);

    let Some(features) = detection.into_features() else {
        return Ok(result);
    };

    result.hand_detected = true;
    result.landmarks = features.landmarks();

    match active {
        ActiveModel::Default(snapshot) => {
            let prediction = snapshot.predict(features.as_slice())?;
            result.gesture = prediction.gesture;
            result.confidence = prediction.confidence;
            result.source = Some(prediction.source);
        }
        ActiveModel::Lesson(context) => match context.predict(features.as_slice()) {
            Some(prediction) => {
                result.gesture = prediction.gesture;
                result.confidence = prediction.confidence;
                result.source = Some(prediction.source);
            }
            None => {
                debug!(lesson_id = %context.lesson_id(), "No lesson prediction for frame");
                result.gesture = NO_MODEL.to_string();
            }
        },
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::{ArtifactLoad, MockArtifactStore};
    use crate::domain::extractor::{FeatureVector, MockFeatureExtractor};
    use crate::domain::gesture::{LessonId, ModelOwner};
    use crate::domain::training::SessionRole;
    use crate::infrastructure::services::trainer::fit_models;
    use crate::infrastructure::services::trainer::tests::{filled_session, quick_config};

    fn config(workers: usize, frame_timeout_ms: u64) -> InferenceConfig {
        InferenceConfig {
            workers,
            frame_timeout_ms,
        }
    }

    fn empty_store() -> Arc<MockArtifactStore> {
        let mut store = MockArtifactStore::new();
        store.expect_load().returning(|_| Ok(ArtifactLoad::NotFound));
        Arc::new(store)
    }

    fn engine_with(extractor: MockFeatureExtractor, store: Arc<MockArtifactStore>) -> DispatchEngine {
        DispatchEngine::new(
            Box::new(extractor),
            Arc::new(DefaultDispatcher::new(store.clone())),
            Arc::new(LessonModeManager::new(store)),
            &config(2, 2000),
        )
    }

    fn hand_extractor(values: Vec<f32>) -> MockFeatureExtractor {
        let mut extractor = MockFeatureExtractor::new();
        extractor
            .expect_extract()
            .returning(move |_| Ok(Detection::Hand(FeatureVector::new(values.clone()))));
        extractor.expect_feature_len().return_const(63usize);
        extractor
    }

    #[tokio::test]
    async fn test_no_hand_reports_none() {
        let mut extractor = MockFeatureExtractor::new();
        extractor.expect_extract().returning(|_| Ok(Detection::NoHand));
        let engine = engine_with(extractor, empty_store());

        let result = engine.predict_frame(vec![1, 2, 3]).await.unwrap();

        assert!(!result.hand_detected);
        assert_eq!(result.gesture, NO_GESTURE);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.restricted_mode);
    }

    #[tokio::test]
    async fn test_default_mode_falls_back_to_rules() {
        let engine = engine_with(hand_extractor(vec![0.5; 63]), empty_store());

        let result = engine.predict_frame(vec![0]).await.unwrap();

        assert!(result.hand_detected);
        assert_eq!(result.landmarks.len(), 21);
        assert_eq!(result.source, Some(ClassifierKind::RuleBased));
        assert!(result.lesson_id.is_none());
    }

    #[tokio::test]
    async fn test_extractor_error_fails_the_frame_only() {
        let mut extractor = MockFeatureExtractor::new();
        let mut calls = 0;
        extractor.expect_extract().returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(DomainError::extraction("bad image"))
            } else {
                Ok(Detection::NoHand)
            }
        });
        let engine = engine_with(extractor, empty_store());

        assert!(engine.predict_frame(vec![0]).await.is_err());
        assert!(engine.predict_frame(vec![0]).await.is_ok());
    }

    #[tokio::test]
    async fn test_slow_frame_times_out() {
        let mut extractor = MockFeatureExtractor::new();
        extractor.expect_extract().returning(|_| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(Detection::NoHand)
        });
        let store = empty_store();
        let engine = DispatchEngine::new(
            Box::new(extractor),
            Arc::new(DefaultDispatcher::new(store.clone())),
            Arc::new(LessonModeManager::new(store)),
            &config(1, 20),
        );

        let result = engine.predict_frame(vec![0]).await;
        assert!(matches!(result, Err(DomainError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_lesson_mode_governs_until_exit() {
        let session = filled_session(
            "admin_level_1",
            SessionRole::Admin,
            Some("lesson_2"),
            &["Happy", "Sad", "Angry", "Love"],
            8,
        );
        let models = fit_models(&session, &quick_config()).unwrap();
        let mut store = MockArtifactStore::new();
        store.expect_load().returning(move |owner| match owner {
            ModelOwner::Lesson(_) => Ok(ArtifactLoad::Found(models.clone())),
            ModelOwner::Default => Ok(ArtifactLoad::NotFound),
        });

        let engine = engine_with(
            hand_extractor(vec![1.0, 0.0, 0.0, 0.5, 0.0, 0.0]),
            Arc::new(store),
        );
        let lesson = LessonId::new("lesson_2").unwrap();

        let before = engine.predict_frame(vec![0]).await.unwrap();

        engine.lessons().enter(&lesson).await.unwrap();
        let during = engine.predict_frame(vec![0]).await.unwrap();
        assert!(during.restricted_mode);
        assert_eq!(during.lesson_id.as_deref(), Some("lesson_2"));
        assert_eq!(during.gesture, "Happy");

        engine.lessons().exit().unwrap();
        let after = engine.predict_frame(vec![0]).await.unwrap();
        assert!(!after.restricted_mode);
        assert_eq!(after.gesture, before.gesture);
        assert_eq!(after.source, before.source);
    }

    #[tokio::test]
    async fn test_lesson_miss_reports_no_model() {
        let session = filled_session(
            "admin_level_1",
            SessionRole::Admin,
            Some("lesson_2"),
            &["Happy", "Sad"],
            8,
        );
        let models = fit_models(&session, &quick_config()).unwrap();
        let mut store = MockArtifactStore::new();
        store
            .expect_load()
            .returning(move |_| Ok(ArtifactLoad::Found(models.clone())));

        // 63 features against models trained on 6
        let engine = engine_with(hand_extractor(vec![0.2; 63]), Arc::new(store));
        engine
            .lessons()
            .enter(&LessonId::new("lesson_2").unwrap())
            .await
            .unwrap();

        let result = engine.predict_frame(vec![0]).await.unwrap();
        assert!(result.hand_detected);
        assert_eq!(result.gesture, NO_MODEL);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_waiting_for_a_busy_worker_counts_against_the_timeout() {
        let mut extractor = MockFeatureExtractor::new();
        extractor.expect_extract().returning(|_| {
            std::thread::sleep(Duration::from_millis(400));
            Ok(Detection::NoHand)
        });
        let store = empty_store();
        let engine = DispatchEngine::new(
            Box::new(extractor),
            Arc::new(DefaultDispatcher::new(store.clone())),
            Arc::new(LessonModeManager::new(store)),
            &config(1, 20),
        );

        let first = engine.predict_frame(vec![0]).await;
        assert!(matches!(first, Err(DomainError::Timeout { .. })));

        // The only worker is still busy with the first frame
        let started = Instant::now();
        let second = engine.predict_frame(vec![0]).await;
        let waited = started.elapsed();

        let Err(DomainError::Timeout { elapsed_ms }) = second else {
            panic!("expected timeout, got {:?}", second);
        };
        assert!(waited < Duration::from_millis(200), "waited {:?}", waited);
        assert!(elapsed_ms >= 20);
        assert!(elapsed_ms < 200);
    }
}
