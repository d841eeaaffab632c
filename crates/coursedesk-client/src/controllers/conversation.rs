//! Private "doubt clarification" conversations between the instructor and
//! one student about one course.

use futures::future::join_all;
use tracing::{info, warn};

use coursedesk_shared::types::{CourseId, DocumentId, UserUid};
use coursedesk_shared::Session;
use coursedesk_store::messages::{Conversation, PrivateMessage};
use coursedesk_store::{DocumentStore, SubscriptionSlot, Synchronizer};

use super::{watch, LiveList};
use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::events::{EventBus, STREAM_MESSAGES};
use crate::models::{Course, StudentSummary};

/// A student the instructor can message, with the instructor's courses the
/// student is enrolled in.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub student: StudentSummary,
    pub courses: Vec<Course>,
}

/// Students of the signed-in instructor and their shared courses. A student
/// whose enrollments cannot be fetched is listed with no courses.
pub async fn load_contacts(api: &ApiClient, session: &Session) -> Result<Vec<Contact>> {
    let details = api.instructor_details(&session.email).await?;

    let lookups = details.students.iter().map(|s| api.enrollments(&s.email));
    let enrollments = join_all(lookups).await;

    let contacts = details
        .students
        .iter()
        .zip(enrollments)
        .map(|(student, enrolled)| {
            let enrolled = enrolled.unwrap_or_else(|e| {
                warn!(student = %student.email, error = %e, "enrollments unavailable");
                Vec::new()
            });
            let courses = details
                .courses
                .iter()
                .filter(|c| enrolled.iter().any(|e| e.course.id == c.id))
                .cloned()
                .collect();
            Contact {
                student: student.clone(),
                courses,
            }
        })
        .collect();
    Ok(contacts)
}

struct Open {
    conversation: Conversation,
    student_name: String,
}

pub struct ConversationPanel<S: DocumentStore> {
    sync: Synchronizer<S>,
    session: Session,
    events: EventBus,
    open: Option<Open>,
    messages: LiveList<PrivateMessage>,
    slot: SubscriptionSlot,
}

impl<S: DocumentStore> ConversationPanel<S> {
    pub fn new(sync: Synchronizer<S>, session: Session, events: EventBus) -> Self {
        Self {
            sync,
            session,
            events,
            open: None,
            messages: LiveList::default(),
            slot: SubscriptionSlot::new("conversation"),
        }
    }

    /// Show the conversation with `student` about `course`, replacing the
    /// one currently open.
    pub fn open(
        &mut self,
        student: UserUid,
        student_name: impl Into<String>,
        course: CourseId,
    ) -> Result<()> {
        let conversation = Conversation::new(course, self.session.instructor_uid.clone(), student);
        let query = conversation.query()?;

        self.slot.clear();
        self.messages.clear();

        let sync = &self.sync;
        let list = self.messages.clone();
        let events = self.events.clone();
        let scope = conversation.clone();
        self.slot.replace(|| {
            watch(sync, query, STREAM_MESSAGES, list, events, move |snap| {
                scope.project(snap)
            })
        });

        info!(course = %course, student = %conversation.student, "conversation opened");
        self.open = Some(Open {
            conversation,
            student_name: student_name.into(),
        });
        Ok(())
    }

    pub fn close(&mut self) {
        self.slot.clear();
        self.messages.clear();
        self.open = None;
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.open.as_ref().map(|o| &o.conversation)
    }

    pub fn messages(&self) -> Vec<PrivateMessage> {
        self.messages.items()
    }

    pub fn message_list(&self) -> &LiveList<PrivateMessage> {
        &self.messages
    }

    /// Send `content` to the student. The store stamps the time.
    pub async fn send(&self, content: &str) -> Result<DocumentId> {
        let open = self.open.as_ref().ok_or(ClientError::NotOpen("conversation"))?;
        Ok(self
            .sync
            .send_private_message(
                &open.conversation,
                &self.session.display_name,
                &open.student_name,
                content,
            )
            .await?)
    }
}
