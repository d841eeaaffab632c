//! Application state shared by the dashboard screens.
//!
//! Holds the configuration, the REST client, the live store synchronizer,
//! the UI event bus and, once signed in, the [`Session`]. Controllers are
//! built from it with the session passed in explicitly.

use tracing::info;

use coursedesk_shared::types::UserUid;
use coursedesk_shared::Session;
use coursedesk_store::{DocumentStore, Synchronizer};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::controllers::announcements::AnnouncementDesk;
use crate::controllers::composer::CourseComposer;
use crate::controllers::conversation::ConversationPanel;
use crate::controllers::discussion_board::DiscussionBoard;
use crate::controllers::profile::ProfileEditor;
use crate::controllers::roster::Roster;
use crate::error::{ClientError, Result};
use crate::events::EventBus;

/// Central application state.
pub struct AppState<S: DocumentStore> {
    pub api: ApiClient,
    pub sync: Synchronizer<S>,
    pub events: EventBus,

    /// The signed-in instructor. `None` until [`login`](Self::login).
    session: Option<Session>,
}

impl<S: DocumentStore> AppState<S> {
    pub fn new(config: ClientConfig, store: S) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            sync: Synchronizer::new(store),
            events: EventBus::default(),
            session: None,
        })
    }

    /// Open a session for an instructor the auth provider has accepted.
    pub async fn login(&mut self, email: &str, uid: UserUid) -> Result<&Session> {
        if let Some(previous) = self.session.take() {
            previous.end();
        }
        let session = self.api.open_session(email, uid).await?;
        Ok(&*self.session.insert(session))
    }

    /// End the session. Controllers built from it keep their copy until
    /// dropped.
    pub fn logout(&mut self) {
        match self.session.take() {
            Some(session) => session.end(),
            None => info!("logout without a session"),
        }
    }

    pub fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(ClientError::NotOpen("session"))
    }

    // ------------------------------------------------------------------
    // Controllers
    // ------------------------------------------------------------------

    pub fn discussion_board(&self) -> Result<DiscussionBoard<S>> {
        Ok(DiscussionBoard::new(
            self.sync.clone(),
            self.session()?.clone(),
            self.events.clone(),
        ))
    }

    pub fn conversation_panel(&self) -> Result<ConversationPanel<S>> {
        Ok(ConversationPanel::new(
            self.sync.clone(),
            self.session()?.clone(),
            self.events.clone(),
        ))
    }

    pub fn course_composer(&self) -> Result<CourseComposer> {
        Ok(CourseComposer::new(
            self.api.clone(),
            self.session()?.clone(),
            self.events.clone(),
        ))
    }

    pub async fn roster(&self) -> Result<Roster> {
        Roster::load(&self.api, self.session()?).await
    }

    pub fn announcement_desk(&self) -> Result<AnnouncementDesk> {
        Ok(AnnouncementDesk::new(self.api.clone(), self.session()?.clone()))
    }

    pub fn profile_editor(&self) -> Result<ProfileEditor> {
        Ok(ProfileEditor::new(self.api.clone(), self.session()?.clone()))
    }
}
