use serde::Serialize;
use tokio::sync::broadcast;

use coursedesk_draft::SubmissionState;
use coursedesk_shared::{DeskError, ErrorKind};

pub const EVENT_SNAPSHOT: &str = "snapshot";
pub const EVENT_SUBMISSION_STATE: &str = "submission-state";
pub const EVENT_ERROR: &str = "error";

/// Live streams a controller can publish.
pub const STREAM_DISCUSSIONS: &str = "discussions";
pub const STREAM_REPLIES: &str = "replies";
pub const STREAM_MESSAGES: &str = "messages";

/// A fresh, complete, ordered list for one live stream.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub stream: &'static str,
    pub sequence: u64,
    pub records: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatePayload {
    #[serde(flatten)]
    pub state: SubmissionState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// What failed: a stream name or an operation.
    pub source: String,
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ErrorPayload {
    pub fn new(source: impl Into<String>, error: &DeskError) -> Self {
        Self {
            source: source.into(),
            kind: error.kind(),
            message: error.message().to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Everything the UI layer is told about.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum UiEvent {
    Snapshot(SnapshotPayload),
    SubmissionState(SubmissionStatePayload),
    Error(ErrorPayload),
}

impl UiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::Snapshot(_) => EVENT_SNAPSHOT,
            UiEvent::SubmissionState(_) => EVENT_SUBMISSION_STATE,
            UiEvent::Error(_) => EVENT_ERROR,
        }
    }
}

/// Fan-out of [`UiEvent`]s to any number of UI listeners.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UiEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: UiEvent) {
        emit_event(&self.tx, event);
    }

    pub fn snapshot<T: Serialize>(&self, stream: &'static str, sequence: u64, records: &[T]) {
        let records = records
            .iter()
            .filter_map(|r| match serde_json::to_value(r) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::error!(stream, error = %e, "Failed to serialize record");
                    None
                }
            })
            .collect();
        self.emit(UiEvent::Snapshot(SnapshotPayload {
            stream,
            sequence,
            records,
        }));
    }

    pub fn submission_state(&self, state: &SubmissionState) {
        self.emit(UiEvent::SubmissionState(SubmissionStatePayload {
            state: state.clone(),
        }));
    }

    pub fn error(&self, source: impl Into<String>, error: &DeskError) {
        self.emit(UiEvent::Error(ErrorPayload::new(source, error)));
    }
}

pub fn emit_event(tx: &broadcast::Sender<UiEvent>, event: UiEvent) {
    let name = event.name();
    // Sending only fails when nobody listens, which is normal before the UI attaches.
    if tx.send(event).is_err() {
        tracing::debug!(event = name, "No listener for event");
    }
}
