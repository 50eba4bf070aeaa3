//! Gesture catalog - default vocabulary plus per-lesson vocabularies

use std::collections::BTreeMap;

use super::vocabulary::{GestureVocabulary, LessonId};

/// Which model family a training session or artifact belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOwner {
    Default,
    Lesson(LessonId),
}

impl ModelOwner {
    pub fn lesson_id(&self) -> Option<&LessonId> {
        match self {
            Self::Default => None,
            Self::Lesson(id) => Some(id),
        }
    }
}

impl std::fmt::Display for ModelOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Lesson(id) => write!(f, "{}", id),
        }
    }
}

/// Known vocabularies: the full default set and the lesson subsets
#[derive(Debug, Clone)]
pub struct GestureCatalog {
    default_vocabulary: GestureVocabulary,
    lessons: BTreeMap<LessonId, GestureVocabulary>,
}

impl GestureCatalog {
    pub fn new(
        default_vocabulary: GestureVocabulary,
        lessons: BTreeMap<LessonId, GestureVocabulary>,
    ) -> Self {
        Self {
            default_vocabulary,
            lessons,
        }
    }

    pub fn default_vocabulary(&self) -> &GestureVocabulary {
        &self.default_vocabulary
    }

    /// Vocabulary for a lesson, `None` when the lesson is not in the curriculum
    pub fn lesson_vocabulary(&self, lesson_id: &LessonId) -> Option<&GestureVocabulary> {
        self.lessons.get(lesson_id)
    }

    pub fn lesson_ids(&self) -> impl Iterator<Item = &LessonId> {
        self.lessons.keys()
    }

    /// Effective vocabulary for an owner. Unknown lessons resolve to an empty vocabulary.
    pub fn resolve(&self, owner: &ModelOwner) -> GestureVocabulary {
        match owner {
            ModelOwner::Default => self.default_vocabulary.clone(),
            ModelOwner::Lesson(id) => self
                .lesson_vocabulary(id)
                .cloned()
                .unwrap_or_else(GestureVocabulary::empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> GestureCatalog {
        let mut lessons = BTreeMap::new();
        lessons.insert(
            LessonId::new("lesson_2").unwrap(),
            GestureVocabulary::new(["Happy", "Sad", "Angry", "Love"]).unwrap(),
        );

        GestureCatalog::new(
            GestureVocabulary::new(["Yes", "No", "I Love You", "Hello", "Thank You"]).unwrap(),
            lessons,
        )
    }

    #[test]
    fn test_resolve_default() {
        let vocabulary = catalog().resolve(&ModelOwner::Default);
        assert_eq!(vocabulary.len(), 5);
        assert_eq!(vocabulary.get(0), Some("Yes"));
    }

    #[test]
    fn test_resolve_known_lesson() {
        let owner = ModelOwner::Lesson(LessonId::new("lesson_2").unwrap());
        let vocabulary = catalog().resolve(&owner);
        assert_eq!(vocabulary.index_of("Love"), Some(3));
    }

    #[test]
    fn test_resolve_unknown_lesson_is_empty() {
        let owner = ModelOwner::Lesson(LessonId::new("lesson_99").unwrap());
        assert!(catalog().resolve(&owner).is_empty());
    }

    #[test]
    fn test_owner_display() {
        assert_eq!(ModelOwner::Default.to_string(), "default");
        let owner = ModelOwner::Lesson(LessonId::new("lesson_2").unwrap());
        assert_eq!(owner.to_string(), "lesson_2");
    }
}
