//! Announcements sent by the instructor.

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate};
use tracing::info;

use coursedesk_shared::constants::RECENT_ANNOUNCEMENTS;
use coursedesk_shared::types::{AnnouncementId, StudentId};
use coursedesk_shared::Session;

use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::models::{Announcement, NewAnnouncement, TargetType};

pub const DEFAULT_ANNOUNCE_TYPE: &str = "Course Update";

/// Who an announcement goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Audience {
    #[default]
    All,
    InstructorStudents,
    Student(StudentId),
}

/// The "new announcement" form.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementDraft {
    pub title: String,
    pub message: String,
    pub announce_type: String,
    pub audience: Audience,
}

impl Default for AnnouncementDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            message: String::new(),
            announce_type: DEFAULT_ANNOUNCE_TYPE.to_string(),
            audience: Audience::All,
        }
    }
}

impl AnnouncementDraft {
    /// The request body, or a validation error if title or message is blank.
    pub fn to_request(&self, session: &Session) -> Result<NewAnnouncement> {
        let title = self.title.trim();
        let message = self.message.trim();
        if title.is_empty() || message.is_empty() {
            return Err(ClientError::Invalid(
                "title and message are required".into(),
            ));
        }

        let (target_type, target_id) = match self.audience {
            Audience::All => (TargetType::All, None),
            Audience::InstructorStudents => {
                (TargetType::InstructorStudents, Some(session.instructor_id.0))
            }
            Audience::Student(id) => (TargetType::Student, Some(id.0)),
        };

        Ok(NewAnnouncement {
            title: title.to_string(),
            message: message.to_string(),
            announce_type: self.announce_type.clone(),
            sender_type: "Instructor".into(),
            sender_id: session.instructor_id,
            target_type,
            target_id,
            kind: "course".into(),
        })
    }
}

/// Date an announcement was posted: the part of its timestamp before
/// `" | "`.
pub fn posted_on(timestamp: &str) -> Option<NaiveDate> {
    let date = timestamp.split(" | ").next()?.trim();
    ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(date)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// The `limit` most recently posted, newest first. Undated ones come last.
pub fn most_recent(items: &[Announcement], limit: usize) -> Vec<&Announcement> {
    let mut sorted: Vec<&Announcement> = items.iter().collect();
    sorted.sort_by_key(|a| Reverse(a.timestamp.as_deref().and_then(posted_on)));
    sorted.truncate(limit);
    sorted
}

/// Case-insensitive search over title, message and announcement type.
pub fn search<'a>(items: &'a [Announcement], query: &str) -> Vec<&'a Announcement> {
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|a| {
            a.title.to_lowercase().contains(&needle)
                || a.message.to_lowercase().contains(&needle)
                || a.announce_type.to_lowercase().contains(&needle)
        })
        .collect()
}

pub struct AnnouncementDesk {
    api: ApiClient,
    session: Session,
    items: Vec<Announcement>,
}

impl AnnouncementDesk {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self {
            api,
            session,
            items: Vec::new(),
        }
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.items = self.api.announcements_by(self.session.instructor_id).await?;
        info!(count = self.items.len(), "announcements loaded");
        Ok(())
    }

    pub fn items(&self) -> &[Announcement] {
        &self.items
    }

    /// Validate and send, then reload the list. Nothing is sent if the
    /// draft is invalid.
    pub async fn send(&mut self, draft: &AnnouncementDraft) -> Result<()> {
        let request = draft.to_request(&self.session)?;
        self.api.send_announcement(&request).await?;
        self.refresh().await
    }

    pub async fn delete(&mut self, id: AnnouncementId) -> Result<()> {
        self.api.delete_announcement(id).await?;
        self.items.retain(|a| a.id != id);
        Ok(())
    }

    pub fn search(&self, query: &str) -> Vec<&Announcement> {
        search(&self.items, query)
    }

    pub fn recent(&self) -> Vec<&Announcement> {
        most_recent(&self.items, RECENT_ANNOUNCEMENTS)
    }
}
