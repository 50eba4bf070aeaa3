//! Classifier domain - ensemble, neural-network and rule-based models

mod bound;
mod forest;
mod model;
mod neural;
mod rules;

pub use bound::{BoundClassifier, ClassifierSet, Prediction};
pub use forest::{ForestParams, RandomForest};
pub use model::{ClassScore, Classifier, ClassifierKind};
pub use neural::{NeuralNetwork, NeuralParams};
pub use rules::{FingerPatternRules, HAND_LANDMARKS};
