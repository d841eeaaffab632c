use thiserror::Error;

/// The four error kinds every layer reports to the UI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeskError {
    /// Network or HTTP failure. Retrying the same operation may succeed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A local precondition failed. Never sent to the network.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A live subscription ended with an error. The consumer must subscribe again.
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// A submission payload could not be built.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification of a [`DeskError`], handy for UI payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Transport,
    Validation,
    Subscription,
    Serialization,
}

impl DeskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DeskError::Transport(_) => ErrorKind::Transport,
            DeskError::Validation(_) => ErrorKind::Validation,
            DeskError::Subscription(_) => ErrorKind::Subscription,
            DeskError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Only transport failures are worth re-invoking unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeskError::Transport(_))
    }

    /// The bare message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            DeskError::Transport(m)
            | DeskError::Validation(m)
            | DeskError::Subscription(m)
            | DeskError::Serialization(m) => m,
        }
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(e: serde_json::Error) -> Self {
        DeskError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_is_retryable() {
        assert!(DeskError::Transport("timeout".into()).is_retryable());
        assert!(!DeskError::validation("title required").is_retryable());
        assert!(!DeskError::Subscription("denied".into()).is_retryable());
        assert!(!DeskError::Serialization("nan".into()).is_retryable());
    }

    #[test]
    fn message_strips_kind_prefix() {
        let err = DeskError::validation("title required");
        assert_eq!(err.message(), "title required");
        assert_eq!(err.to_string(), "Validation error: title required");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
