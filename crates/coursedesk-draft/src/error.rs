use coursedesk_shared::DeskError;
use thiserror::Error;

/// Errors produced by the draft editor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DraftError {
    /// A field path could not be parsed or does not address anything.
    #[error("Invalid path `{0}`")]
    InvalidPath(String),

    #[error("Index {index} out of range for `{path}` (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    /// The value given for a field has the wrong JSON type.
    #[error("`{path}` expects a {expected}")]
    FieldType { path: String, expected: &'static str },

    /// Removing would take a collection below its floor.
    #[error("`{collection}` must keep at least {min} item(s)")]
    Cardinality { collection: String, min: usize },

    #[error("Correct answer {0:?} is not exactly one of the options")]
    CorrectAnswer(String),

    #[error("Marks must not be negative (got {0})")]
    NegativeMarks(f64),

    /// A required field is empty.
    #[error("`{0}` is required")]
    MissingField(&'static str),

    #[error("Attachment too large: {size} bytes (max {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    /// The attachment key points at a node that does not exist.
    #[error("No node for attachment {0}")]
    UnknownNode(String),

    /// A numeric field coerced to an infinite value.
    #[error("`{field}` is not a finite number: {input:?}")]
    NonFinite { field: String, input: String },

    #[error("JSON error: {0}")]
    Json(String),

    /// The operation is not allowed in the current submission state.
    #[error("Cannot {action} while {state}")]
    State {
        state: &'static str,
        action: &'static str,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DraftError>;

impl From<serde_json::Error> for DraftError {
    fn from(e: serde_json::Error) -> Self {
        DraftError::Json(e.to_string())
    }
}

impl From<DraftError> for DeskError {
    fn from(e: DraftError) -> Self {
        match e {
            DraftError::InvalidPath(_) | DraftError::NonFinite { .. } | DraftError::Json(_) => {
                DeskError::Serialization(e.to_string())
            }
            _ => DeskError::Validation(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_errors_keep_their_kind() {
        let e: DeskError = DraftError::Cardinality {
            collection: "modules[0].topics".into(),
            min: 1,
        }
        .into();
        assert!(matches!(e, DeskError::Validation(_)));

        let e: DeskError = DraftError::NonFinite {
            field: "marks".into(),
            input: "1e999".into(),
        }
        .into();
        assert!(matches!(e, DeskError::Serialization(_)));
        assert!(!e.is_retryable());
    }
}
