//! Course discussion threads and their replies.
//!
//! Threads live at `courses/{courseId}/discussions`, newest activity first.
//! Replies live in each thread's `replies` subcollection, oldest first.
//! Announcements carry the same reply shape under
//! `announcements/{announcementId}/replies`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use coursedesk_shared::constants::{
    COLLECTION_ANNOUNCEMENTS, COLLECTION_COURSES, COLLECTION_DISCUSSIONS, COLLECTION_REPLIES,
    FIELD_TIMESTAMP,
};
use coursedesk_shared::types::{AnnouncementId, CourseId, DocumentId, UserUid};

use crate::error::{Result, StoreError};
use crate::likes::Toggle;
use crate::models::{fields, Document};
use crate::path::{CollectionPath, DocumentPath};
use crate::patch::FieldPatch;
use crate::query::{Direction, Query};
use crate::store::DocumentStore;
use crate::sync::{Snapshot, Synchronizer};

/// Field holding the set of uids that liked a reply.
pub const FIELD_LIKES: &str = "likes";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    pub id: DocumentId,
    pub course_id: CourseId,
    pub message: String,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Date part (`YYYY-MM-DD`) of the last activity.
    pub last_activity: Option<String>,
    pub solved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: DocumentId,
    pub message: String,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub role: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub likes: Vec<String>,
}

impl Reply {
    pub fn liked_by(&self, uid: &UserUid) -> bool {
        self.likes.iter().any(|l| l == uid.as_str())
    }
}

/// A reply about to be posted.
#[derive(Debug, Clone)]
pub struct NewReply {
    pub message: String,
    pub sender_id: UserUid,
    pub sender_name: String,
    pub role: String,
}

impl NewReply {
    /// A reply posted from the instructor dashboard.
    pub fn from_instructor(message: impl Into<String>, sender_id: UserUid) -> Self {
        Self {
            message: message.into(),
            sender_id,
            sender_name: "Instructor".to_string(),
            role: "Instructor".to_string(),
        }
    }
}

// ------------------------------------------------------------------
// Paths and queries
// ------------------------------------------------------------------

pub fn discussions_path(course: CourseId) -> Result<CollectionPath> {
    CollectionPath::root(COLLECTION_COURSES)?
        .doc(course.to_string())
        .collection(COLLECTION_DISCUSSIONS)
}

pub fn discussion_doc(course: CourseId, discussion: &DocumentId) -> Result<DocumentPath> {
    Ok(discussions_path(course)?.doc(discussion.clone()))
}

pub fn replies_path(course: CourseId, discussion: &DocumentId) -> Result<CollectionPath> {
    discussion_doc(course, discussion)?.collection(COLLECTION_REPLIES)
}

pub fn announcement_replies_path(announcement: AnnouncementId) -> Result<CollectionPath> {
    CollectionPath::root(COLLECTION_ANNOUNCEMENTS)?
        .doc(announcement.to_string())
        .collection(COLLECTION_REPLIES)
}

/// Threads of a course, most recent activity first.
pub fn discussions_query(course: CourseId) -> Result<Query> {
    Ok(Query::new(discussions_path(course)?).order_by(FIELD_TIMESTAMP, Direction::Descending))
}

/// Replies of a thread (or announcement), oldest first.
pub fn replies_query(replies: CollectionPath) -> Query {
    Query::new(replies).order_by(FIELD_TIMESTAMP, Direction::Ascending)
}

// ------------------------------------------------------------------
// Projections
// ------------------------------------------------------------------

pub fn doc_to_discussion(course: CourseId, doc: &Document) -> Result<Discussion> {
    let timestamp = doc.timestamp_field(FIELD_TIMESTAMP)?;
    Ok(Discussion {
        id: doc.id.clone(),
        course_id: course,
        message: doc.str_field("message")?.unwrap_or_default().to_string(),
        sender_id: doc.str_field("senderId")?.map(str::to_string),
        sender_name: doc.str_field("senderName")?.map(str::to_string),
        timestamp,
        last_activity: timestamp.map(|ts| ts.format("%Y-%m-%d").to_string()),
        solved: doc.bool_field("solved")?.unwrap_or(false),
    })
}

pub fn doc_to_reply(doc: &Document) -> Result<Reply> {
    Ok(Reply {
        id: doc.id.clone(),
        message: doc.str_field("message")?.unwrap_or_default().to_string(),
        sender_id: doc.str_field("senderId")?.map(str::to_string),
        sender_name: doc.str_field("senderName")?.map(str::to_string),
        role: doc.str_field("role")?.map(str::to_string),
        timestamp: doc.timestamp_field(FIELD_TIMESTAMP)?,
        likes: doc.string_list(FIELD_LIKES)?,
    })
}

/// Threads of a snapshot. Malformed documents are skipped.
pub fn snapshot_to_discussions(course: CourseId, snapshot: &Snapshot) -> Vec<Discussion> {
    snapshot.project(|d| doc_to_discussion(course, d))
}

pub fn snapshot_to_replies(snapshot: &Snapshot) -> Vec<Reply> {
    snapshot.project(doc_to_reply)
}

/// Case-insensitive substring search over thread messages.
pub fn filter_discussions<'a>(items: &'a [Discussion], search: &str) -> Vec<&'a Discussion> {
    let needle = search.to_lowercase();
    items
        .iter()
        .filter(|d| d.message.to_lowercase().contains(&needle))
        .collect()
}

// ------------------------------------------------------------------
// Writes
// ------------------------------------------------------------------

impl<S: DocumentStore> Synchronizer<S> {
    /// Post a reply into `replies` (a thread's or an announcement's reply
    /// collection).
    pub async fn post_reply_to(&self, replies: &CollectionPath, reply: &NewReply) -> Result<DocumentId> {
        if reply.message.trim().is_empty() {
            return Err(StoreError::InvalidInput("reply message is empty".into()));
        }

        self.append(
            replies,
            fields([
                ("message", json!(reply.message)),
                ("senderId", json!(reply.sender_id.as_str())),
                ("senderName", json!(reply.sender_name)),
                ("role", json!(reply.role)),
                (FIELD_LIKES, json!([])),
            ]),
        )
        .await
    }

    /// Reply in a course thread and refresh the thread's last activity.
    pub async fn post_reply(
        &self,
        course: CourseId,
        discussion: &DocumentId,
        reply: &NewReply,
    ) -> Result<DocumentId> {
        let id = self
            .post_reply_to(&replies_path(course, discussion)?, reply)
            .await?;

        self.mutate(
            &discussion_doc(course, discussion)?,
            FieldPatch::new().server_timestamp(FIELD_TIMESTAMP),
        )
        .await?;

        info!(course = %course, discussion = %discussion, reply = %id, "reply posted");
        Ok(id)
    }

    pub async fn mark_solved(&self, course: CourseId, discussion: &DocumentId) -> Result<()> {
        self.mutate(
            &discussion_doc(course, discussion)?,
            FieldPatch::new().set("solved", true),
        )
        .await?;
        info!(course = %course, discussion = %discussion, "discussion marked solved");
        Ok(())
    }

    /// Like or unlike a reply as `actor`, based on the reply as last seen.
    pub async fn toggle_reply_like(
        &self,
        replies: &CollectionPath,
        reply: &Reply,
        actor: &UserUid,
    ) -> Result<Toggle> {
        self.toggle_membership(&replies.doc(reply.id.clone()), FIELD_LIKES, &reply.likes, actor)
            .await
    }
}
