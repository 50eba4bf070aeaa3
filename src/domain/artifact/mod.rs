//! Artifact domain - persisted models plus their metadata

mod metadata;
mod store;

pub use metadata::{ArtifactMetadata, DEFAULT_ARTIFACT_LESSON_ID};
pub use store::{ArtifactLoad, ArtifactStore, TrainedModels};

#[cfg(test)]
pub use store::MockArtifactStore;
