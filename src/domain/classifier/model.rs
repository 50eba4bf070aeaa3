//! Classifier variants and their common predict contract

use serde::{Deserialize, Serialize};

use super::forest::RandomForest;
use super::neural::NeuralNetwork;
use super::rules::FingerPatternRules;
use crate::domain::DomainError;

/// Model family of a classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    Ensemble,
    NeuralNet,
    RuleBased,
}

impl ClassifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ensemble => "ensemble",
            Self::NeuralNet => "neural_net",
            Self::RuleBased => "rule_based",
        }
    }

    /// Lower rank is tried first
    pub fn preference(&self) -> u8 {
        match self {
            Self::NeuralNet => 0,
            Self::Ensemble => 1,
            Self::RuleBased => 2,
        }
    }
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Winning class index and its confidence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScore {
    pub index: usize,
    pub confidence: f32,
}

/// One trained (or built-in) model
#[derive(Debug, Clone)]
pub enum Classifier {
    Ensemble(RandomForest),
    NeuralNet(NeuralNetwork),
    RuleBased(FingerPatternRules),
}

impl Classifier {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            Self::Ensemble(_) => ClassifierKind::Ensemble,
            Self::NeuralNet(_) => ClassifierKind::NeuralNet,
            Self::RuleBased(_) => ClassifierKind::RuleBased,
        }
    }

    pub fn predict(&mut self, features: &[f32]) -> Result<ClassScore, DomainError> {
        match self {
            Self::Ensemble(forest) => argmax(&forest.predict_proba(features)?),
            Self::NeuralNet(network) => argmax(&network.predict_proba(features)?),
            Self::RuleBased(rules) => {
                let (index, confidence) = rules.classify(features);
                Ok(ClassScore { index, confidence })
            }
        }
    }
}

fn argmax(distribution: &[f32]) -> Result<ClassScore, DomainError> {
    distribution
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(index, &confidence)| ClassScore { index, confidence })
        .ok_or_else(|| DomainError::inference("Classifier produced an empty distribution"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_picks_highest() {
        let score = argmax(&[0.1, 0.7, 0.2]).unwrap();
        assert_eq!(score.index, 1);
        assert!((score.confidence - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_argmax_empty_is_error() {
        assert!(argmax(&[]).is_err());
    }

    #[test]
    fn test_preference_order() {
        let mut kinds = [
            ClassifierKind::RuleBased,
            ClassifierKind::Ensemble,
            ClassifierKind::NeuralNet,
        ];
        kinds.sort_by_key(ClassifierKind::preference);
        assert_eq!(
            kinds,
            [
                ClassifierKind::NeuralNet,
                ClassifierKind::Ensemble,
                ClassifierKind::RuleBased
            ]
        );
    }

    #[test]
    fn test_rule_based_variant_predicts() {
        let mut classifier = Classifier::RuleBased(FingerPatternRules);
        assert_eq!(classifier.kind(), ClassifierKind::RuleBased);
        assert_eq!(classifier.predict(&[]).unwrap().confidence, 0.3);
    }
}
