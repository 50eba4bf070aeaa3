//! Identifier validation for lessons and sessions

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length for lesson and session identifiers
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Identifiers double as directory names, so path separators and dots are rejected
static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("identifier pattern is valid"));

/// Gesture and identifier validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum GestureValidationError {
    /// Identifier is empty
    EmptyId { kind: &'static str },
    /// Identifier exceeds maximum length
    IdTooLong {
        kind: &'static str,
        length: usize,
        max: usize,
    },
    /// Identifier contains invalid characters
    InvalidIdFormat { kind: &'static str, id: String },
    /// Gesture name is blank
    EmptyGesture,
    /// Gesture listed twice in one vocabulary
    DuplicateGesture { name: String },
}

impl fmt::Display for GestureValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId { kind } => write!(f, "{} ID cannot be empty", kind),
            Self::IdTooLong { kind, length, max } => {
                write!(f, "{} ID too long: {} characters (max {})", kind, length, max)
            }
            Self::InvalidIdFormat { kind, id } => {
                write!(
                    f,
                    "Invalid {} ID format '{}': only letters, digits, '_' and '-' are allowed",
                    kind.to_lowercase(),
                    id
                )
            }
            Self::EmptyGesture => write!(f, "Gesture name cannot be empty"),
            Self::DuplicateGesture { name } => {
                write!(f, "Gesture '{}' appears more than once in vocabulary", name)
            }
        }
    }
}

impl std::error::Error for GestureValidationError {}

fn validate_identifier(kind: &'static str, id: &str) -> Result<(), GestureValidationError> {
    if id.is_empty() {
        return Err(GestureValidationError::EmptyId { kind });
    }

    if id.len() > MAX_IDENTIFIER_LENGTH {
        return Err(GestureValidationError::IdTooLong {
            kind,
            length: id.len(),
            max: MAX_IDENTIFIER_LENGTH,
        });
    }

    if !IDENTIFIER_PATTERN.is_match(id) {
        return Err(GestureValidationError::InvalidIdFormat {
            kind,
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Validate a lesson identifier
pub fn validate_lesson_id(id: &str) -> Result<(), GestureValidationError> {
    validate_identifier("Lesson", id)
}

/// Validate a training session identifier
pub fn validate_session_id(id: &str) -> Result<(), GestureValidationError> {
    validate_identifier("Session", id)
}
