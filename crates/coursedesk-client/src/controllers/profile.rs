use tracing::info;

use coursedesk_draft::{DraftError, PendingBinary};
use coursedesk_shared::Session;

use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::models::{Instructor, ProfileUpdate};

/// The instructor's own profile: load, edit, save with an optional new
/// picture.
pub struct ProfileEditor {
    api: ApiClient,
    session: Session,
    current: Option<Instructor>,
    image: Option<PendingBinary>,
}

impl ProfileEditor {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self {
            api,
            session,
            current: None,
            image: None,
        }
    }

    pub async fn load(&mut self) -> Result<&Instructor> {
        let ins = self.api.instructor(self.session.instructor_id).await?;
        Ok(&*self.current.insert(ins))
    }

    pub fn current(&self) -> Option<&Instructor> {
        self.current.as_ref()
    }

    /// Form contents: the loaded profile, or the session's name and email.
    pub fn form(&self) -> ProfileUpdate {
        match &self.current {
            Some(ins) => ProfileUpdate::from(ins),
            None => ProfileUpdate {
                name: self.session.display_name.clone(),
                email: self.session.email.clone(),
                ..ProfileUpdate::default()
            },
        }
    }

    /// Where the stored picture is served from.
    pub fn image_url(&self) -> Option<String> {
        let image = self.current.as_ref()?.image.as_deref()?;
        Some(self.api.config().endpoint(&format!("/instructor_images/{image}")))
    }

    /// Pick a new picture, sent with the next [`save`](Self::save).
    pub fn set_image(&mut self, image: PendingBinary) -> Result<()> {
        let limit = self.api.config().max_upload_bytes;
        if image.size() > limit {
            return Err(DraftError::PayloadTooLarge {
                size: image.size(),
                limit,
            }
            .into());
        }
        if !image.content_type.starts_with("image/") {
            return Err(ClientError::Invalid(format!(
                "{} is not an image",
                image.file_name
            )));
        }
        self.image = Some(image);
        Ok(())
    }

    pub fn clear_image(&mut self) {
        self.image = None;
    }

    pub fn pending_image(&self) -> Option<&PendingBinary> {
        self.image.as_ref()
    }

    pub async fn save(&mut self, update: ProfileUpdate) -> Result<&Instructor> {
        if update.name.trim().is_empty() {
            return Err(ClientError::Invalid("name is required".into()));
        }
        if !update.email.contains('@') {
            return Err(ClientError::Invalid(format!("invalid email: {}", update.email)));
        }

        let saved = self
            .api
            .update_profile(self.session.instructor_id, &update, self.image.as_ref())
            .await?;
        self.image = None;
        info!(instructor = %saved.id, "profile saved");
        Ok(&*self.current.insert(saved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use coursedesk_shared::types::{InstructorId, UserUid};

    fn editor(max_upload_bytes: usize) -> ProfileEditor {
        let config = ClientConfig {
            max_upload_bytes,
            ..ClientConfig::default()
        };
        ProfileEditor::new(
            ApiClient::new(config).unwrap(),
            Session::new(InstructorId(2), UserUid::new("u2"), "Dr. K", "k@example.org"),
        )
    }

    #[test]
    fn form_defaults_to_session_identity() {
        let form = editor(16).form();
        assert_eq!(form.name, "Dr. K");
        assert_eq!(form.email, "k@example.org");
        assert!(form.bio.is_empty());
    }

    #[test]
    fn image_must_be_a_small_image() {
        let mut ed = editor(4);
        assert!(ed
            .set_image(PendingBinary::new("cv.pdf", "application/pdf", vec![1u8]))
            .is_err());
        assert!(matches!(
            ed.set_image(PendingBinary::new("me.png", "image/png", vec![0u8; 5])),
            Err(ClientError::Draft(DraftError::PayloadTooLarge { .. }))
        ));
        ed.set_image(PendingBinary::new("me.png", "image/png", vec![0u8; 4]))
            .unwrap();
        assert_eq!(ed.pending_image().unwrap().file_name, "me.png");
    }

    #[tokio::test]
    async fn blank_name_is_not_sent() {
        let mut ed = editor(16);
        let update = ProfileUpdate {
            name: " ".into(),
            email: "k@example.org".into(),
            ..ProfileUpdate::default()
        };
        assert!(matches!(ed.save(update).await, Err(ClientError::Invalid(_))));
    }
}
