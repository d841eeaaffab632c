//! Course authoring: the draft editor wired to the upload endpoint.

use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use coursedesk_draft::attachments::file_extension;
use coursedesk_draft::{AttachmentKey, DraftEditor, DraftError, PendingBinary, PreviewHandle};
use coursedesk_shared::{DeskError, Session};

use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::events::EventBus;

pub struct CourseComposer {
    editor: DraftEditor,
    api: ApiClient,
    session: Session,
    events: EventBus,
}

impl CourseComposer {
    pub fn new(api: ApiClient, session: Session, events: EventBus) -> Self {
        let editor = fresh_editor(&api, &session);
        Self {
            editor,
            api,
            session,
            events,
        }
    }

    pub fn editor(&self) -> &DraftEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut DraftEditor {
        &mut self.editor
    }

    /// Read a file from disk and attach it to `key`.
    pub async fn attach_file(
        &mut self,
        key: AttachmentKey,
        path: impl AsRef<Path>,
    ) -> Result<PreviewHandle> {
        let path = path.as_ref();
        let limit = self.api.config().max_upload_bytes;

        let size = tokio::fs::metadata(path).await?.len();
        if size > limit as u64 {
            return Err(DraftError::PayloadTooLarge {
                size: usize::try_from(size).unwrap_or(usize::MAX),
                limit,
            }
            .into());
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Invalid(format!("no file name in {}", path.display())))?
            .to_string();
        let data = tokio::fs::read(path).await?;
        let binary = PendingBinary::new(file_name.as_str(), content_type_for(&file_name), data);

        Ok(self.editor.attach(key, binary)?)
    }

    /// Validate, upload, and record the outcome. The draft and its
    /// attachments survive a failed upload for a retry.
    pub async fn submit(&mut self) -> Result<Value> {
        let submission = match self.editor.begin_submission() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "draft not submitted");
                self.events.error("submit", &DeskError::from(e.clone()));
                return Err(e.into());
            }
        };
        self.events.submission_state(self.editor.state());

        match self.api.submit_course(&submission).await {
            Ok(created) => {
                self.editor.finish_submission(Ok(()))?;
                self.events.submission_state(self.editor.state());
                info!(instructor = %self.session.instructor_id, "course created");
                Ok(created)
            }
            Err(e) => {
                let message = match &e {
                    ClientError::Backend { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                self.editor.finish_submission(Err(message))?;
                self.events.submission_state(self.editor.state());
                Err(e)
            }
        }
    }

    /// Start a new, empty draft. Pending attachments of the old one are
    /// released.
    pub fn reset(&mut self) {
        self.editor = fresh_editor(&self.api, &self.session);
    }
}

fn fresh_editor(api: &ApiClient, session: &Session) -> DraftEditor {
    DraftEditor::new(Some(session.instructor_id), api.config().max_upload_bytes)
}

/// MIME type sent with an uploaded file, from its extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    match file_extension(file_name).to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "zip" => "application/zip",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
