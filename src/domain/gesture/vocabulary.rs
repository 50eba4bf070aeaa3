//! Gesture vocabulary and lesson identifiers

use serde::{Deserialize, Serialize};

use super::validation::{validate_lesson_id, GestureValidationError};

/// Lesson identifier - letters, digits, '_' and '-', max 128 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LessonId(String);

impl LessonId {
    /// Create a new LessonId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, GestureValidationError> {
        let id = id.into();
        validate_lesson_id(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LessonId {
    type Error = GestureValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LessonId> for String {
    fn from(id: LessonId) -> Self {
        id.0
    }
}

impl std::fmt::Display for LessonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered set of gesture labels.
///
/// The position of a gesture is its class index. Every classifier trained
/// against a vocabulary must be resolved against that same ordering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct GestureVocabulary(Vec<String>);

impl GestureVocabulary {
    /// Build a vocabulary, rejecting blank or duplicated gestures
    pub fn new<I, S>(gestures: I) -> Result<Self, GestureValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();

        for gesture in gestures {
            let gesture = gesture.into();
            let trimmed = gesture.trim();

            if trimmed.is_empty() {
                return Err(GestureValidationError::EmptyGesture);
            }

            if names.iter().any(|existing| existing == trimmed) {
                return Err(GestureValidationError::DuplicateGesture {
                    name: trimmed.to_string(),
                });
            }

            names.push(trimmed.to_string());
        }

        Ok(Self(names))
    }

    /// A vocabulary with no gestures; sessions resolved against it collect nothing
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Class index of a gesture (surrounding whitespace ignored)
    pub fn index_of(&self, gesture: &str) -> Option<usize> {
        let gesture = gesture.trim();
        self.0.iter().position(|g| g == gesture)
    }

    pub fn contains(&self, gesture: &str) -> bool {
        self.index_of(gesture).is_some()
    }

    /// Gesture at a class index, `None` when out of range
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for GestureVocabulary {
    type Error = GestureValidationError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GestureVocabulary> for Vec<String> {
    fn from(vocabulary: GestureVocabulary) -> Self {
        vocabulary.0
    }
}
