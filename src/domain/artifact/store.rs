//! Artifact store trait and load outcome

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::metadata::ArtifactMetadata;
use crate::domain::classifier::{
    BoundClassifier, Classifier, ClassifierSet, NeuralNetwork, RandomForest,
};
use crate::domain::gesture::ModelOwner;
use crate::domain::DomainError;

/// Models of one artifact plus the metadata they were trained with
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub metadata: ArtifactMetadata,
    pub ensemble: Option<RandomForest>,
    pub neural: Option<NeuralNetwork>,
}

impl TrainedModels {
    pub fn has_model(&self) -> bool {
        self.ensemble.is_some() || self.neural.is_some()
    }

    /// Bind every model to the metadata vocabulary
    pub fn into_classifier_set(self) -> ClassifierSet {
        let Self {
            metadata,
            ensemble,
            neural,
        } = self;
        let mut classifiers = Vec::new();

        if let Some(forest) = ensemble {
            classifiers.push(BoundClassifier::new(
                Classifier::Ensemble(forest),
                metadata.gestures.clone(),
                metadata.ensemble_accuracy,
            ));
        }

        if let Some(network) = neural {
            classifiers.push(BoundClassifier::new(
                Classifier::NeuralNet(network),
                metadata.gestures.clone(),
                metadata.neural_accuracy,
            ));
        }

        ClassifierSet::new(classifiers)
    }
}

/// Typed outcome of loading an artifact
#[derive(Debug)]
pub enum ArtifactLoad {
    /// No artifact directory for this owner
    NotFound,
    /// Directory exists but metadata or every model file is unusable
    Corrupt { reason: String },
    Found(TrainedModels),
}

/// Persistence of trained artifacts
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Load the artifact of an owner
    async fn load(&self, owner: &ModelOwner) -> Result<ArtifactLoad, DomainError>;

    /// Replace the artifact of an owner; the previous artifact survives a failed save
    async fn save(&self, owner: &ModelOwner, models: &TrainedModels) -> Result<(), DomainError>;

    /// Metadata of every readable lesson artifact
    async fn list_lessons(&self) -> Result<Vec<ArtifactMetadata>, DomainError>;
}
