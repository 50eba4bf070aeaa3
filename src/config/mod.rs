//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, ExtractorConfig, InferenceConfig, LogFormat, LoggingConfig, MetricsConfig,
    ServerConfig, StorageConfig, TrainingConfig, VocabularyConfig,
};
