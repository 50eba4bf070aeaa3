//! Infrastructure services

mod collector;
mod connections;
mod default_dispatcher;
mod dispatch;
mod lesson_mode;
mod recognition_service;
mod trainer;

pub use collector::{SessionSummary, TrainingCollector};
pub use connections::{ConnectionGuard, ConnectionRegistry};
pub use default_dispatcher::{DefaultDispatcher, DefaultModelSnapshot};
pub use dispatch::{DispatchEngine, FrameResult, SharedExtractor, NO_GESTURE, NO_MODEL};
pub use lesson_mode::{LessonContext, LessonModeManager, LessonStatus};
pub use recognition_service::{RecognitionService, RecognitionServiceDeps};
pub use trainer::{fit_models, ModelTrainer};
