//! Gesture domain - vocabularies, lessons and identifiers

mod catalog;
mod validation;
mod vocabulary;

pub use catalog::{GestureCatalog, ModelOwner};
pub use validation::{
    validate_lesson_id, validate_session_id, GestureValidationError, MAX_IDENTIFIER_LENGTH,
};
pub use vocabulary::{GestureVocabulary, LessonId};
