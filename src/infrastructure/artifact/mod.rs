//! Artifact persistence implementations

mod file_store;

pub use file_store::{FileArtifactStore, ENSEMBLE_FILE, METADATA_FILE, NEURAL_DIR, NEURAL_FILE};
