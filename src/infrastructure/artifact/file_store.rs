//! Filesystem artifact store
//!
//! Layout per artifact directory:
//! - `ensemble_model.json`
//! - `neural_model/network.json`
//! - `training_metadata.json`
//!
//! The default artifact lives directly in the default model directory, lesson
//! artifacts in `<lessons_dir>/<lesson_id>/`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::artifact::{ArtifactLoad, ArtifactMetadata, ArtifactStore, TrainedModels};
use crate::domain::classifier::{NeuralNetwork, RandomForest};
use crate::domain::gesture::{LessonId, ModelOwner};
use crate::domain::DomainError;

pub const ENSEMBLE_FILE: &str = "ensemble_model.json";
pub const NEURAL_DIR: &str = "neural_model";
pub const NEURAL_FILE: &str = "network.json";
pub const METADATA_FILE: &str = "training_metadata.json";

/// Artifact store rooted at two directories
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    default_dir: PathBuf,
    lessons_dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(default_dir: impl Into<PathBuf>, lessons_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
            lessons_dir: lessons_dir.into(),
        }
    }

    /// Create both root directories
    pub fn ensure_directories(&self) -> Result<(), DomainError> {
        for dir in [&self.default_dir, &self.lessons_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                DomainError::storage(format!("Cannot create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    pub fn directory_for(&self, owner: &ModelOwner) -> PathBuf {
        match owner {
            ModelOwner::Default => self.default_dir.clone(),
            ModelOwner::Lesson(id) => self.lessons_dir.join(id.as_str()),
        }
    }

    async fn write_staged(&self, staging: &Path, models: &TrainedModels) -> Result<(), DomainError> {
        fs::create_dir_all(staging).await?;

        if let Some(forest) = &models.ensemble {
            fs::write(staging.join(ENSEMBLE_FILE), serde_json::to_vec(forest)?).await?;
        }

        if let Some(network) = &models.neural {
            let neural_dir = staging.join(NEURAL_DIR);
            fs::create_dir_all(&neural_dir).await?;
            fs::write(neural_dir.join(NEURAL_FILE), serde_json::to_vec(network)?).await?;
        }

        fs::write(
            staging.join(METADATA_FILE),
            serde_json::to_vec_pretty(&models.metadata)?,
        )
        .await?;

        Ok(())
    }

    /// Replace the artifact files in `target` with the staged ones.
    ///
    /// Live files are parked in a sibling backup directory and moved back if
    /// any step fails. Metadata leaves first and arrives last, so an
    /// interrupted swap never looks like a complete artifact.
    async fn swap_into_place(&self, staging: &Path, target: &Path) -> Result<(), DomainError> {
        fs::create_dir_all(target).await?;

        let backup = staging.with_file_name(format!(".backup-{}", Uuid::new_v4()));
        fs::create_dir_all(&backup).await?;

        let mut parked = Vec::new();
        let mut installed = Vec::new();

        let result = async {
            for name in [METADATA_FILE, ENSEMBLE_FILE, NEURAL_DIR] {
                if move_entry(target, &backup, name).await? {
                    parked.push(name);
                }
            }

            for name in [ENSEMBLE_FILE, NEURAL_DIR, METADATA_FILE] {
                if move_entry(staging, target, name).await? {
                    installed.push(name);
                }
            }

            Ok::<(), DomainError>(())
        }
        .await;

        if let Err(e) = result {
            match restore_backup(&backup, target, &parked, &installed).await {
                Ok(()) => remove_backup(&backup).await,
                Err(restore) => error!(
                    path = %backup.display(),
                    error = %restore,
                    "Failed to restore previous artifact, backup left in place"
                ),
            }
            return Err(e);
        }

        remove_backup(&backup).await;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn load(&self, owner: &ModelOwner) -> Result<ArtifactLoad, DomainError> {
        let dir = self.directory_for(owner);

        if !fs::try_exists(&dir).await? {
            return Ok(ArtifactLoad::NotFound);
        }

        let ensemble_path = dir.join(ENSEMBLE_FILE);
        let neural_path = dir.join(NEURAL_DIR).join(NEURAL_FILE);
        let has_ensemble = fs::try_exists(&ensemble_path).await?;
        let has_neural = fs::try_exists(&neural_path).await?;

        let Some(metadata_bytes) = read_optional(&dir.join(METADATA_FILE)).await? else {
            if has_ensemble || has_neural {
                return Ok(corrupt(owner, "model files present without metadata"));
            }
            return Ok(ArtifactLoad::NotFound);
        };

        let metadata: ArtifactMetadata = match serde_json::from_slice(&metadata_bytes) {
            Ok(metadata) => metadata,
            Err(e) => return Ok(corrupt(owner, &format!("unreadable metadata: {}", e))),
        };

        if let Err(e) = metadata.validate() {
            return Ok(corrupt(owner, &e.to_string()));
        }

        if !has_ensemble && !has_neural {
            return Ok(corrupt(owner, "no model files"));
        }

        let ensemble = if has_ensemble {
            read_model::<RandomForest>(&ensemble_path)
                .await
                .filter(|forest| structure_valid(owner, "ensemble", forest.validate()))
                .filter(|forest| class_count_matches(owner, "ensemble", forest.n_classes(), &metadata))
        } else {
            None
        };

        let neural = if has_neural {
            read_model::<NeuralNetwork>(&neural_path)
                .await
                .filter(|network| structure_valid(owner, "neural", network.validate()))
                .filter(|network| class_count_matches(owner, "neural", network.n_classes(), &metadata))
        } else {
            None
        };

        let models = TrainedModels {
            metadata,
            ensemble,
            neural,
        };

        if !models.has_model() {
            return Ok(corrupt(owner, "no loadable model"));
        }

        debug!(
            owner = %owner,
            ensemble = models.ensemble.is_some(),
            neural = models.neural.is_some(),
            "Artifact loaded"
        );

        Ok(ArtifactLoad::Found(models))
    }

    async fn save(&self, owner: &ModelOwner, models: &TrainedModels) -> Result<(), DomainError> {
        if !models.has_model() {
            return Err(DomainError::artifact("Refusing to save an artifact without models"));
        }

        let target = self.directory_for(owner);
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent).await?;

        let staging = parent.join(format!(".staging-{}", Uuid::new_v4()));

        let result = match self.write_staged(&staging, models).await {
            Ok(()) => self.swap_into_place(&staging, &target).await,
            Err(e) => Err(e),
        };

        if let Err(e) = fs::remove_dir_all(&staging).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %staging.display(), error = %e, "Failed to remove staging directory");
            }
        }

        match &result {
            Ok(()) => info!(owner = %owner, path = %target.display(), "Artifact saved"),
            Err(e) => warn!(owner = %owner, error = %e, "Artifact save failed"),
        }

        result
    }

    async fn list_lessons(&self) -> Result<Vec<ArtifactMetadata>, DomainError> {
        let mut entries = match fs::read_dir(&self.lessons_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut lessons = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(lesson_id) = LessonId::new(name) else {
                continue;
            };

            match self.read_metadata(&lesson_id).await {
                Ok(Some(metadata)) => lessons.push(metadata),
                Ok(None) => {}
                Err(e) => warn!(lesson_id = %lesson_id, error = %e, "Skipping unreadable lesson metadata"),
            }
        }

        lessons.sort_by(|a, b| a.lesson_id.cmp(&b.lesson_id));
        Ok(lessons)
    }
}

impl FileArtifactStore {
    async fn read_metadata(&self, lesson_id: &LessonId) -> Result<Option<ArtifactMetadata>, DomainError> {
        let path = self.lessons_dir.join(lesson_id.as_str()).join(METADATA_FILE);

        match read_optional(&path).await? {
            Some(bytes) => {
                let metadata: ArtifactMetadata = serde_json::from_slice(&bytes)?;
                metadata.validate()?;
                Ok(Some(metadata))
            }
            None => Ok(None),
        }
    }
}

fn corrupt(owner: &ModelOwner, reason: &str) -> ArtifactLoad {
    warn!(owner = %owner, reason, "Artifact is corrupt");
    ArtifactLoad::Corrupt {
        reason: reason.to_string(),
    }
}

fn structure_valid(owner: &ModelOwner, kind: &str, check: Result<(), DomainError>) -> bool {
    match check {
        Ok(()) => true,
        Err(e) => {
            warn!(owner = %owner, kind, error = %e, "Model file is malformed, ignoring model");
            false
        }
    }
}

fn class_count_matches(
    owner: &ModelOwner,
    kind: &str,
    n_classes: usize,
    metadata: &ArtifactMetadata,
) -> bool {
    if n_classes != metadata.num_classes {
        warn!(
            owner = %owner,
            kind,
            model_classes = n_classes,
            metadata_classes = metadata.num_classes,
            "Model class count does not match metadata, ignoring model"
        );
        return false;
    }
    true
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, DomainError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn read_model<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read model file");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(model) => Some(model),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse model file");
            None
        }
    }
}

/// Move `from/name` to `to/name`; `false` when there is nothing to move
async fn move_entry(from: &Path, to: &Path, name: &str) -> Result<bool, DomainError> {
    let source = from.join(name);

    if !fs::try_exists(&source).await? {
        return Ok(false);
    }

    fs::rename(&source, to.join(name)).await?;
    Ok(true)
}

/// Undo a partial swap: drop what was installed, then bring the parked files back
async fn restore_backup(
    backup: &Path,
    target: &Path,
    parked: &[&str],
    installed: &[&str],
) -> Result<(), DomainError> {
    for name in installed.iter().rev() {
        remove_if_exists(&target.join(name)).await?;
    }

    for name in parked.iter().rev() {
        fs::rename(backup.join(name), target.join(name)).await?;
    }

    Ok(())
}

async fn remove_backup(backup: &Path) {
    if let Err(e) = fs::remove_dir_all(backup).await {
        warn!(path = %backup.display(), error = %e, "Failed to remove artifact backup");
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), DomainError> {
    let result = match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
