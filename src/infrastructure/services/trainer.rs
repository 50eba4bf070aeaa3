//! Model trainer - fits both classifier kinds and persists the artifact

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::TrainingConfig;
use crate::domain::artifact::{ArtifactMetadata, ArtifactStore, TrainedModels};
use crate::domain::classifier::{NeuralNetwork, RandomForest};
use crate::domain::training::{LabeledDataset, SessionRole, TrainingSession};
use crate::domain::DomainError;

/// Fits and persists models; one run at a time
pub struct ModelTrainer {
    store: Arc<dyn ArtifactStore>,
    config: TrainingConfig,
    running: Mutex<()>,
}

impl std::fmt::Debug for ModelTrainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelTrainer")
            .field("config", &self.config)
            .finish()
    }
}

impl ModelTrainer {
    pub fn new(store: Arc<dyn ArtifactStore>, config: TrainingConfig) -> Self {
        Self {
            store,
            config,
            running: Mutex::new(()),
        }
    }

    /// Train on a session snapshot and persist to the session owner's artifact.
    ///
    /// The previous artifact is left untouched unless the new one is fully written.
    pub async fn train(&self, session: TrainingSession) -> Result<TrainedModels, DomainError> {
        let _running = self.running.lock().await;
        let owner = session.owner();
        let config = self.config.clone();

        info!(
            session_id = session.id(),
            owner = %owner,
            samples = session.total_samples(),
            "Training started"
        );

        let models = tokio::task::spawn_blocking(move || fit_models(&session, &config))
            .await
            .map_err(|e| DomainError::internal(format!("Training task failed: {}", e)))??;

        self.store.save(&owner, &models).await?;

        info!(
            owner = %owner,
            accuracy = models.metadata.accuracy,
            samples = models.metadata.samples_count,
            "Training complete"
        );

        Ok(models)
    }
}

/// Flatten, split, fit both kinds and evaluate on the held-out rows
pub fn fit_models(
    session: &TrainingSession,
    config: &TrainingConfig,
) -> Result<TrainedModels, DomainError> {
    let vocabulary = session.vocabulary();
    let dataset = LabeledDataset::from_buckets(vocabulary, session.buckets());

    if dataset.is_empty() {
        return Err(DomainError::training("No training samples collected"));
    }

    let present = dataset.classes_present();
    if present < 2 {
        warn!(
            session_id = session.id(),
            classes = present,
            "Insufficient class diversity for training"
        );
        return Err(DomainError::training(format!(
            "Insufficient class diversity: {} gesture(s) with samples, at least 2 required",
            present
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let split = dataset.split(config.test_ratio, &mut rng);
    let (train_x, train_y) = dataset.select(&split.train);
    let (test_x, test_y) = dataset.select(&split.test);
    let n_classes = vocabulary.len();

    let ensemble = match RandomForest::fit(&train_x, &train_y, n_classes, &config.ensemble, &mut rng)
    {
        Ok(forest) => {
            let accuracy = evaluate(&test_x, &test_y, |x| forest.predict_proba(x));
            info!(accuracy, "Ensemble classifier trained");
            Some((forest, accuracy))
        }
        Err(e) => {
            error!(error = %e, "Ensemble classifier failed to train");
            None
        }
    };

    let neural = match NeuralNetwork::fit(&train_x, &train_y, n_classes, &config.neural, &mut rng) {
        Ok(mut network) => {
            let accuracy = evaluate(&test_x, &test_y, |x| network.predict_proba(x));
            info!(accuracy, "Neural network classifier trained");
            Some((network, accuracy))
        }
        Err(e) => {
            error!(error = %e, "Neural network classifier failed to train");
            None
        }
    };

    let best = ensemble
        .iter()
        .map(|(_, a)| *a)
        .chain(neural.iter().map(|(_, a)| *a))
        .fold(None, |best: Option<f32>, a| Some(best.map_or(a, |b| b.max(a))))
        .ok_or_else(|| DomainError::training("Every classifier failed to train"))?;

    let admin_session = match session.role() {
        SessionRole::Admin => Some(session.id().to_string()),
        SessionRole::Regular => None,
    };

    let mut metadata = ArtifactMetadata::new(
        &session.owner(),
        vocabulary.clone(),
        dataset.len(),
        best,
        admin_session,
    );
    metadata.ensemble_accuracy = ensemble.as_ref().map(|(_, a)| *a);
    metadata.neural_accuracy = neural.as_ref().map(|(_, a)| *a);

    Ok(TrainedModels {
        metadata,
        ensemble: ensemble.map(|(forest, _)| forest),
        neural: neural.map(|(network, _)| network),
    })
}

/// Fraction of rows whose argmax matches the label
fn evaluate<F>(rows: &[&[f32]], labels: &[usize], mut predict: F) -> f32
where
    F: FnMut(&[f32]) -> Result<Vec<f32>, DomainError>,
{
    if rows.is_empty() {
        return 0.0;
    }

    let mut correct = 0;

    for (row, label) in rows.iter().zip(labels) {
        let predicted = predict(*row).ok().and_then(|distribution| {
            distribution
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(index, _)| index)
        });

        if predicted == Some(*label) {
            correct += 1;
        }
    }

    correct as f32 / rows.len() as f32
}
