//! Domain layer - Core business logic and entities

pub mod artifact;
pub mod classifier;
pub mod error;
pub mod extractor;
pub mod gesture;
pub mod training;

pub use artifact::{ArtifactLoad, ArtifactMetadata, ArtifactStore, TrainedModels};
pub use classifier::{
    BoundClassifier, Classifier, ClassifierKind, ClassifierSet, ForestParams, NeuralParams,
    Prediction,
};
pub use error::DomainError;
pub use extractor::{Detection, FeatureExtractor, FeatureVector, Landmark};
pub use gesture::{GestureCatalog, GestureVocabulary, LessonId, ModelOwner};
pub use training::{SessionRole, TrainingOutcome, TrainingSession};
