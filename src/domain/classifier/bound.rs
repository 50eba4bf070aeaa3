//! Classifiers bound to the vocabulary they were trained against

use std::sync::Mutex;

use serde::Serialize;
use tracing::warn;

use super::model::{Classifier, ClassifierKind};
use super::rules::FingerPatternRules;
use crate::domain::gesture::GestureVocabulary;
use crate::domain::DomainError;

/// Resolved prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub gesture: String,
    pub confidence: f32,
    pub source: ClassifierKind,
}

/// A classifier plus the vocabulary ordering used to train it.
///
/// The model sits behind a mutex held only for the predict call, since
/// inference mutates internal buffers.
#[derive(Debug)]
pub struct BoundClassifier {
    kind: ClassifierKind,
    vocabulary: GestureVocabulary,
    accuracy: Option<f32>,
    model: Mutex<Classifier>,
}

impl BoundClassifier {
    pub fn new(classifier: Classifier, vocabulary: GestureVocabulary, accuracy: Option<f32>) -> Self {
        Self {
            kind: classifier.kind(),
            vocabulary,
            accuracy,
            model: Mutex::new(classifier),
        }
    }

    /// The finger-pattern heuristic with its own label table
    pub fn rule_based() -> Self {
        Self::new(
            Classifier::RuleBased(FingerPatternRules),
            FingerPatternRules::vocabulary(),
            None,
        )
    }

    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }

    pub fn vocabulary(&self) -> &GestureVocabulary {
        &self.vocabulary
    }

    pub fn accuracy(&self) -> Option<f32> {
        self.accuracy
    }

    /// Predict and resolve the class index against the bound vocabulary.
    ///
    /// An index outside the vocabulary is an inference error, never a panic.
    pub fn predict(&self, features: &[f32]) -> Result<Prediction, DomainError> {
        let score = {
            let mut model = self
                .model
                .lock()
                .map_err(|e| DomainError::internal(format!("Classifier lock poisoned: {}", e)))?;
            model.predict(features)?
        };

        let gesture = self.vocabulary.get(score.index).ok_or_else(|| {
            DomainError::inference(format!(
                "Class index {} outside vocabulary of {} gestures",
                score.index,
                self.vocabulary.len()
            ))
        })?;

        Ok(Prediction {
            gesture: gesture.to_string(),
            confidence: score.confidence,
            source: self.kind,
        })
    }
}

/// Classifiers in preference order (neural, ensemble, rule-based)
#[derive(Debug, Default)]
pub struct ClassifierSet {
    classifiers: Vec<BoundClassifier>,
}

impl ClassifierSet {
    pub fn new(mut classifiers: Vec<BoundClassifier>) -> Self {
        classifiers.sort_by_key(|c| c.kind().preference());
        Self { classifiers }
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    pub fn kinds(&self) -> Vec<ClassifierKind> {
        self.classifiers.iter().map(BoundClassifier::kind).collect()
    }

    /// True when at least one trained (non-heuristic) model is present
    pub fn has_trained_model(&self) -> bool {
        self.classifiers
            .iter()
            .any(|c| c.kind() != ClassifierKind::RuleBased)
    }

    pub fn into_inner(self) -> Vec<BoundClassifier> {
        self.classifiers
    }

    pub fn get(&self, kind: ClassifierKind) -> Option<&BoundClassifier> {
        self.classifiers.iter().find(|c| c.kind() == kind)
    }

    /// Try each classifier in turn; `Ok(None)` when the set is empty,
    /// the last error when every classifier fails.
    pub fn predict(&self, features: &[f32]) -> Result<Option<Prediction>, DomainError> {
        let mut last_error = None;

        for classifier in &self.classifiers {
            match classifier.predict(features) {
                Ok(prediction) => return Ok(Some(prediction)),
                Err(e) => {
                    warn!(kind = %classifier.kind(), error = %e, "Classifier failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}
