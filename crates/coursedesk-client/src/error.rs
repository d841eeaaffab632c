use thiserror::Error;

use coursedesk_draft::DraftError;
use coursedesk_shared::DeskError;
use coursedesk_store::StoreError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer. `message` is what the backend said, ready for display.
    #[error("Backend responded {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("No {0} is open")]
    NotOpen(&'static str),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Draft(#[from] DraftError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<ClientError> for DeskError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http(e) => DeskError::Transport(e.to_string()),
            ClientError::Backend { message, .. } => DeskError::Transport(message),
            ClientError::Decode(m) => DeskError::Serialization(m),
            ClientError::Config(m) | ClientError::Invalid(m) => DeskError::Validation(m),
            ClientError::NotOpen(what) => DeskError::Validation(format!("no {what} is open")),
            ClientError::Io(e) => DeskError::Validation(e.to_string()),
            ClientError::Store(e) => e.into(),
            ClientError::Draft(e) => e.into(),
        }
    }
}
