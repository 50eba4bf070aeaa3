//! Gesture Gateway
//!
//! Real-time gesture recognition over a WebSocket stream with:
//! - Live training sample collection and model retraining
//! - Atomic model swap without restarting the service
//! - Lesson modes restricting recognition to a gesture subset

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use infrastructure::{
    artifact::FileArtifactStore,
    extractor::LandmarkPayloadExtractor,
    services::{RecognitionService, RecognitionServiceDeps},
};
use tracing::info;

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration.
///
/// Fails when the vocabulary configuration is invalid or the artifact
/// directories cannot be created.
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let catalog = Arc::new(config.vocabulary.build_catalog()?);

    let store = FileArtifactStore::new(
        &config.storage.default_model_dir,
        &config.storage.lessons_dir,
    );
    store
        .ensure_directories()
        .map_err(|e| anyhow::anyhow!("Cannot prepare model directories: {}", e))?;

    info!(
        default_model_dir = %config.storage.default_model_dir,
        lessons_dir = %config.storage.lessons_dir,
        lessons = catalog.lesson_ids().count(),
        "Artifact storage ready"
    );

    let recognition = RecognitionService::new(RecognitionServiceDeps {
        catalog,
        store: Arc::new(store),
        extractor: Box::new(LandmarkPayloadExtractor::new(config.extractor.feature_len)),
        inference: config.inference.clone(),
        training: config.training.clone(),
    });

    let model_loaded = recognition.initialize().await;
    info!(model_loaded, "Recognition service initialized");

    Ok(AppState::new(Arc::new(recognition)))
}
