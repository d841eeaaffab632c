use coursedesk_shared::DeskError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A path string did not have the collection/document shape.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A document addressed by a write does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The store refused access to a path.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A live subscription was terminated by the store.
    #[error("Subscription closed: {0}")]
    SubscriptionClosed(String),

    /// A document field did not have the shape a typed projection expects.
    #[error("Field `{field}` is not a {expected}")]
    Shape { field: String, expected: &'static str },

    /// A patch could not be applied to the stored value.
    #[error("Patch error: {0}")]
    Patch(String),

    /// A write was refused before reaching the store.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for DeskError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidPath(_) | StoreError::Patch(_) | StoreError::InvalidInput(_) => {
                DeskError::Validation(e.to_string())
            }
            StoreError::NotFound(_) | StoreError::PermissionDenied(_) | StoreError::Unavailable(_) => {
                DeskError::Transport(e.to_string())
            }
            StoreError::SubscriptionClosed(_) => DeskError::Subscription(e.to_string()),
            StoreError::Shape { .. } => DeskError::Serialization(e.to_string()),
        }
    }
}
