use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use coursedesk_shared::constants::{COLLECTION_PRIVATE_MESSAGES, FIELD_TIMESTAMP};
use coursedesk_shared::types::{CourseId, DocumentId, UserUid};

use crate::error::{Result, StoreError};
use crate::models::{fields, Document};
use crate::path::CollectionPath;
use crate::query::{Direction, Query};
use crate::store::DocumentStore;
use crate::sync::{Snapshot, Synchronizer};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessage {
    pub id: DocumentId,
    pub content: String,
    pub sender_id: UserUid,
    pub sender_name: Option<String>,
    pub recipient_id: Option<UserUid>,
    pub recipient_name: Option<String>,
    pub course_id: Option<CourseId>,
    pub user_ids: Vec<UserUid>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A one-to-one "doubt clarification" thread between an instructor and a
/// student about one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub course_id: CourseId,
    pub instructor: UserUid,
    pub student: UserUid,
}

impl Conversation {
    pub fn new(course_id: CourseId, instructor: UserUid, student: UserUid) -> Self {
        Self {
            course_id,
            instructor,
            student,
        }
    }

    /// Store-side query: every message of the instructor in this course.
    /// Narrowed to this student by [`Conversation::project`].
    pub fn query(&self) -> Result<Query> {
        Ok(Query::new(CollectionPath::root(COLLECTION_PRIVATE_MESSAGES)?)
            .where_array_contains("userIds", self.instructor.as_str())
            .where_eq("courseId", self.course_id.0)
            .order_by(FIELD_TIMESTAMP, Direction::Ascending))
    }

    pub fn includes(&self, message: &PrivateMessage) -> bool {
        message.user_ids.contains(&self.instructor) && message.user_ids.contains(&self.student)
    }

    /// Whether the raw document's `userIds` name both participants.
    fn includes_doc(&self, doc: &Document) -> bool {
        match doc.string_list("userIds") {
            Ok(ids) => {
                ids.iter().any(|id| id == self.instructor.as_str())
                    && ids.iter().any(|id| id == self.student.as_str())
            }
            Err(_) => false,
        }
    }

    /// Messages of this conversation, in snapshot order. Other students'
    /// documents are never parsed; malformed ones of this conversation are
    /// skipped.
    pub fn project(&self, snapshot: &Snapshot) -> Vec<PrivateMessage> {
        let kept = snapshot.project(|doc| {
            if self.includes_doc(doc) {
                doc_to_message(doc).map(Some)
            } else {
                Ok(None)
            }
        });
        kept.into_iter().flatten().collect()
    }
}

pub fn doc_to_message(doc: &Document) -> Result<PrivateMessage> {
    let course_id = match doc.get("courseId") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => Some(CourseId(v.as_i64().ok_or_else(|| StoreError::Shape {
            field: "courseId".into(),
            expected: "integer",
        })?)),
    };

    Ok(PrivateMessage {
        id: doc.id.clone(),
        content: doc.str_field("content")?.unwrap_or_default().to_string(),
        sender_id: UserUid::new(doc.required_str("senderId")?),
        sender_name: doc.str_field("senderName")?.map(str::to_string),
        recipient_id: doc.str_field("recipientId")?.map(UserUid::new),
        recipient_name: doc.str_field("recipientName")?.map(str::to_string),
        course_id,
        user_ids: doc
            .string_list("userIds")?
            .into_iter()
            .map(UserUid)
            .collect(),
        timestamp: doc.timestamp_field(FIELD_TIMESTAMP)?,
    })
}

impl<S: DocumentStore> Synchronizer<S> {
    /// Send a message from the instructor to the student of `conversation`.
    pub async fn send_private_message(
        &self,
        conversation: &Conversation,
        sender_name: &str,
        recipient_name: &str,
        content: &str,
    ) -> Result<DocumentId> {
        if content.trim().is_empty() {
            return Err(StoreError::InvalidInput("message is empty".into()));
        }

        let id = self
            .append(
                &CollectionPath::root(COLLECTION_PRIVATE_MESSAGES)?,
                fields([
                    ("content", json!(content)),
                    ("senderId", json!(conversation.instructor.as_str())),
                    ("senderName", json!(sender_name)),
                    ("recipientId", json!(conversation.student.as_str())),
                    ("recipientName", json!(recipient_name)),
                    ("courseId", json!(conversation.course_id.0)),
                    (
                        "userIds",
                        json!([conversation.instructor.as_str(), conversation.student.as_str()]),
                    ),
                ]),
            )
            .await?;

        info!(
            course = %conversation.course_id,
            student = %conversation.student,
            message = %id,
            "private message sent"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SnapshotEvent;
    use crate::memory::MemoryStore;
    use std::time::Duration;
    use tokio::time::timeout;

    fn conversation(student: &str) -> Conversation {
        Conversation::new(CourseId(5), UserUid::new("ins"), UserUid::new(student))
    }

    async fn next(rx: &mut tokio::sync::mpsc::UnboundedReceiver<SnapshotEvent>) -> Snapshot {
        match timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Some(SnapshotEvent::Snapshot(s))) => s,
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn conversation_only_shows_its_student() {
        let store = MemoryStore::new();
        let sync = Synchronizer::new(store.clone());
        let alice = conversation("alice");
        let bob = conversation("bob");

        sync.send_private_message(&alice, "Dr. Ins", "Alice", "hi alice")
            .await
            .unwrap();
        sync.send_private_message(&bob, "Dr. Ins", "Bob", "hi bob")
            .await
            .unwrap();
        sync.send_private_message(&alice, "Dr. Ins", "Alice", "second")
            .await
            .unwrap();

        let (_sub, mut rx) = sync.subscribe_channel(alice.query().unwrap());
        let messages = alice.project(&next(&mut rx).await);
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hi alice", "second"]);
        assert!(messages.iter().all(|m| m.course_id == Some(CourseId(5))));
    }

    #[tokio::test]
    async fn other_course_messages_are_filtered_by_store_query() {
        let store = MemoryStore::new();
        let sync = Synchronizer::new(store.clone());
        let other = Conversation::new(CourseId(9), UserUid::new("ins"), UserUid::new("alice"));
        sync.send_private_message(&other, "Dr. Ins", "Alice", "elsewhere")
            .await
            .unwrap();

        let (_sub, mut rx) = sync.subscribe_channel(conversation("alice").query().unwrap());
        assert!(next(&mut rx).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_message_does_not_hide_the_conversation() {
        let store = MemoryStore::new();
        let sync = Synchronizer::new(store.clone());
        let stud = conversation("stud");
        let collection = CollectionPath::root(COLLECTION_PRIVATE_MESSAGES).unwrap();

        store.put(
            &collection.doc("other-no-sender"),
            fields([
                ("content", json!("broken")),
                ("courseId", json!(5)),
                ("userIds", json!(["ins", "other"])),
            ]),
        );
        store.put(
            &collection.doc("stud-no-sender"),
            fields([
                ("content", json!("also broken")),
                ("courseId", json!(5)),
                ("userIds", json!(["ins", "stud"])),
            ]),
        );
        sync.send_private_message(&stud, "Dr. Ins", "Stud", "  hello  ")
            .await
            .unwrap();

        let (_sub, mut rx) = sync.subscribe_channel(stud.query().unwrap());
        let messages = stud.project(&next(&mut rx).await);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "  hello  ");
    }

    #[tokio::test]
    async fn blank_message_is_not_sent() {
        let store = MemoryStore::new();
        let sync = Synchronizer::new(store.clone());
        let err = sync
            .send_private_message(&conversation("alice"), "Dr. Ins", "Alice", "  \n")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(
            store.len(&CollectionPath::root(COLLECTION_PRIVATE_MESSAGES).unwrap()),
            0
        );
    }
}
