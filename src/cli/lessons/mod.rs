//! Lessons command - prints the lesson models present on disk

use chrono::{TimeZone, Utc};
use clap::Args;

use crate::config::AppConfig;
use crate::domain::artifact::{ArtifactMetadata, ArtifactStore};
use crate::infrastructure::artifact::FileArtifactStore;

/// Arguments for the lessons command
#[derive(Args, Clone)]
pub struct LessonsArgs {
    /// Print the metadata records as JSON
    #[arg(long)]
    pub json: bool,

    /// Lesson model directory (overrides config)
    #[arg(long)]
    pub dir: Option<String>,
}

pub async fn run(args: LessonsArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    let lessons_dir = args.dir.unwrap_or(config.storage.lessons_dir);

    let store = FileArtifactStore::new(config.storage.default_model_dir, lessons_dir);
    let lessons = store
        .list_lessons()
        .await
        .map_err(|e| anyhow::anyhow!("Cannot list lesson models: {}", e))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&lessons)?);
    } else {
        print!("{}", render_table(&lessons));
    }

    Ok(())
}

fn render_table(lessons: &[ArtifactMetadata]) -> String {
    if lessons.is_empty() {
        return "No lesson models found\n".to_string();
    }

    let mut out = format!(
        "{:<16} {:>9} {:>8}  {:<20} {}\n",
        "LESSON", "ACCURACY", "SAMPLES", "CREATED", "GESTURES"
    );
    for meta in lessons {
        let created = Utc
            .timestamp_opt(meta.created_at, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| meta.created_at.to_string());

        out.push_str(&format!(
            "{:<16} {:>8.1}% {:>8}  {:<20} {}\n",
            meta.lesson_id,
            meta.accuracy * 100.0,
            meta.samples_count,
            created,
            meta.gestures.as_slice().join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gesture::{GestureVocabulary, LessonId, ModelOwner};

    #[test]
    fn test_render_empty() {
        assert_eq!(render_table(&[]), "No lesson models found\n");
    }

    #[test]
    fn test_render_row() {
        let owner = ModelOwner::Lesson(LessonId::new("lesson_2").unwrap());
        let gestures = GestureVocabulary::new(["Happy", "Sad"]).unwrap();
        let mut meta = ArtifactMetadata::new(&owner, gestures, 40, 0.875, None);
        meta.created_at = 0;

        let table = render_table(&[meta]);
        let row = table.lines().nth(1).unwrap();

        assert!(row.starts_with("lesson_2"));
        assert!(row.contains("87.5%"));
        assert!(row.contains("1970-01-01 00:00:00"));
        assert!(row.ends_with("Happy, Sad"));
    }
}
