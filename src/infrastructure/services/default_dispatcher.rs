//! Default dispatcher - the model set serving frames outside lesson mode

use std::sync::{Arc, RwLock};

use tracing::{debug, error, info, warn};

use crate::domain::artifact::{ArtifactLoad, ArtifactMetadata, ArtifactStore};
use crate::domain::classifier::{BoundClassifier, ClassifierKind, ClassifierSet, Prediction};
use crate::domain::gesture::ModelOwner;
use crate::domain::DomainError;

/// Immutable default-mode snapshot: trained models (if any) followed by the
/// rule-based fallback
#[derive(Debug)]
pub struct DefaultModelSnapshot {
    classifiers: ClassifierSet,
    metadata: Option<ArtifactMetadata>,
}

impl DefaultModelSnapshot {
    fn rule_based_only() -> Self {
        Self {
            classifiers: ClassifierSet::new(vec![BoundClassifier::rule_based()]),
            metadata: None,
        }
    }

    pub fn metadata(&self) -> Option<&ArtifactMetadata> {
        self.metadata.as_ref()
    }

    pub fn has_trained_model(&self) -> bool {
        self.classifiers.has_trained_model()
    }

    pub fn kinds(&self) -> Vec<ClassifierKind> {
        self.classifiers.kinds()
    }

    /// Neural, then ensemble, then the finger-pattern table
    pub fn predict(&self, features: &[f32]) -> Result<Prediction, DomainError> {
        let prediction = self
            .classifiers
            .predict(features)?
            .ok_or_else(|| DomainError::inference("No default classifier available"))?;

        if prediction.source == ClassifierKind::RuleBased {
            debug!(gesture = %prediction.gesture, "Rule-based fallback prediction");
        }

        Ok(prediction)
    }
}

/// Holds the current default snapshot; reload swaps it in one step
pub struct DefaultDispatcher {
    store: Arc<dyn ArtifactStore>,
    snapshot: RwLock<Arc<DefaultModelSnapshot>>,
}

impl std::fmt::Debug for DefaultDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultDispatcher").finish_non_exhaustive()
    }
}

impl DefaultDispatcher {
    /// Starts with only the rule-based fallback; call [`Self::reload`] to load the artifact
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            snapshot: RwLock::new(Arc::new(DefaultModelSnapshot::rule_based_only())),
        }
    }

    pub fn snapshot(&self) -> Result<Arc<DefaultModelSnapshot>, DomainError> {
        self.snapshot
            .read()
            .map(|s| Arc::clone(&s))
            .map_err(|e| DomainError::internal(format!("Default model lock poisoned: {}", e)))
    }

    pub fn has_trained_model(&self) -> bool {
        self.snapshot()
            .map(|s| s.has_trained_model())
            .unwrap_or(false)
    }

    /// Re-read the default artifact and swap it in.
    ///
    /// Returns whether a trained model is now installed. A missing artifact
    /// keeps the current snapshot; a corrupt one is an error and also keeps it.
    pub async fn reload(&self) -> Result<bool, DomainError> {
        let models = match self.store.load(&ModelOwner::Default).await? {
            ArtifactLoad::Found(models) => models,
            ArtifactLoad::NotFound => {
                warn!("No default model artifact, serving rule-based fallback");
                return Ok(self.has_trained_model());
            }
            ArtifactLoad::Corrupt { reason } => {
                error!(reason = %reason, "Default model artifact is corrupt");
                return Err(DomainError::artifact(format!(
                    "Default model artifact is corrupt: {}",
                    reason
                )));
            }
        };

        let metadata = models.metadata.clone();
        let mut bound = models.into_classifier_set().into_inner();
        bound.push(BoundClassifier::rule_based());
        let classifiers = ClassifierSet::new(bound);
        let kinds = classifiers.kinds();

        let snapshot = Arc::new(DefaultModelSnapshot {
            classifiers,
            metadata: Some(metadata.clone()),
        });

        *self
            .snapshot
            .write()
            .map_err(|e| DomainError::internal(format!("Default model lock poisoned: {}", e)))? =
            snapshot;

        info!(
            kinds = ?kinds,
            accuracy = metadata.accuracy,
            gestures = metadata.num_classes,
            "Default model reloaded"
        );

        Ok(true)
    }
}
