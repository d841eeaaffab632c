//! # coursedesk-draft
//!
//! Nested Draft Tree Editor for course authoring: a structurally shared
//! draft tree (modules, topics, quizzes, resources) edited through
//! path-addressed operations, a side-table of pending binary attachments,
//! and the multipart submission built from both.

pub mod attachments;
pub mod editor;
pub mod model;
pub mod numeric;
pub mod path;
pub mod state;
pub mod submission;

mod error;

pub use attachments::{AttachmentKey, PendingBinary, PreviewHandle};
pub use editor::DraftEditor;
pub use error::{DraftError, Result};
pub use model::{Draft, Item};
pub use path::Collection;
pub use state::{SubmissionState, SubmissionTracker};
pub use submission::{BinaryPart, CourseSubmission};
