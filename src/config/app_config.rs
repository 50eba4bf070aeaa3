use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::classifier::{ForestParams, NeuralParams};
use crate::domain::gesture::{GestureCatalog, GestureVocabulary, LessonId};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub storage: StorageConfig,
    pub vocabulary: VocabularyConfig,
    pub inference: InferenceConfig,
    pub training: TrainingConfig,
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

/// Artifact locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub default_model_dir: String,
    pub lessons_dir: String,
}

/// Default gesture list and lesson curriculum
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub default_gestures: Vec<String>,
    pub lessons: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Maximum concurrent CPU-bound frame jobs
    pub workers: usize,
    pub frame_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub seed: u64,
    pub test_ratio: f32,
    pub ensemble: ForestParams,
    pub neural: NeuralParams,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub feature_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_model_dir: "models".to_string(),
            lessons_dir: "level_models".to_string(),
        }
    }
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        let lesson = |gestures: [&str; 4]| -> Vec<String> {
            gestures.iter().map(|g| g.to_string()).collect()
        };

        let lessons = BTreeMap::from([
            ("lesson_1".to_string(), lesson(["Hello", "Thank You", "Yes", "No"])),
            ("lesson_2".to_string(), lesson(["Happy", "Sad", "Angry", "Love"])),
            ("lesson_3".to_string(), lesson(["Eat", "Drink", "Sleep", "Go"])),
            ("lesson_4".to_string(), lesson(["Book", "Phone", "Car", "Home"])),
            ("lesson_5".to_string(), lesson(["What", "Where", "When", "Who"])),
        ]);

        Self {
            default_gestures: ["Yes", "No", "I Love You", "Hello", "Thank You"]
                .iter()
                .map(|g| g.to_string())
                .collect(),
            lessons,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            frame_timeout_ms: 2000,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_ratio: 0.2,
            ensemble: ForestParams::default(),
            neural: NeuralParams::default(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self { feature_len: 63 }
    }
}

impl VocabularyConfig {
    /// Validate the configured vocabularies into a catalog
    pub fn build_catalog(&self) -> anyhow::Result<GestureCatalog> {
        let default_vocabulary = GestureVocabulary::new(self.default_gestures.iter().cloned())
            .map_err(|e| anyhow::anyhow!("Invalid default vocabulary: {}", e))?;

        let mut lessons = BTreeMap::new();
        for (id, gestures) in &self.lessons {
            let lesson_id = LessonId::new(id.as_str())
                .map_err(|e| anyhow::anyhow!("Invalid lesson id '{}': {}", id, e))?;
            let vocabulary = GestureVocabulary::new(gestures.iter().cloned())
                .map_err(|e| anyhow::anyhow!("Invalid vocabulary for lesson '{}': {}", id, e))?;
            lessons.insert(lesson_id, vocabulary);
        }

        Ok(GestureCatalog::new(default_vocabulary, lessons))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
