//! Course discussion board: live thread list for the selected course, one
//! open thread with live replies, and the instructor's actions on them.

use tracing::info;

use coursedesk_shared::types::{CourseId, DocumentId};
use coursedesk_shared::Session;
use coursedesk_store::discussions::{
    discussions_query, filter_discussions, replies_path, replies_query, snapshot_to_discussions,
    snapshot_to_replies, Discussion, NewReply, Reply,
};
use coursedesk_store::likes::Toggle;
use coursedesk_store::{DocumentStore, SubscriptionSlot, Synchronizer};

use super::{watch, CourseSelection, LiveList};
use crate::error::{ClientError, Result};
use crate::events::{EventBus, STREAM_DISCUSSIONS, STREAM_REPLIES};

pub struct DiscussionBoard<S: DocumentStore> {
    sync: Synchronizer<S>,
    session: Session,
    events: EventBus,
    selection: CourseSelection,
    open_thread: Option<DocumentId>,
    discussions: LiveList<Discussion>,
    replies: LiveList<Reply>,
    discussion_slot: SubscriptionSlot,
    reply_slot: SubscriptionSlot,
}

impl<S: DocumentStore> DiscussionBoard<S> {
    pub fn new(sync: Synchronizer<S>, session: Session, events: EventBus) -> Self {
        Self {
            sync,
            session,
            events,
            selection: CourseSelection::All,
            open_thread: None,
            discussions: LiveList::default(),
            replies: LiveList::default(),
            discussion_slot: SubscriptionSlot::new("discussions"),
            reply_slot: SubscriptionSlot::new("replies"),
        }
    }

    pub fn selection(&self) -> CourseSelection {
        self.selection
    }

    /// Switch course. Closes the open thread; `All` shows no threads and
    /// keeps no subscription.
    pub fn select_course(&mut self, selection: CourseSelection) -> Result<()> {
        let query = selection.course().map(discussions_query).transpose()?;

        self.close_thread();
        self.discussion_slot.clear();
        self.discussions.clear();
        self.selection = selection;

        if let (Some(query), CourseSelection::Course(course)) = (query, selection) {
            let sync = &self.sync;
            let list = self.discussions.clone();
            let events = self.events.clone();
            self.discussion_slot.replace(|| {
                watch(sync, query, STREAM_DISCUSSIONS, list, events, move |snap| {
                    snapshot_to_discussions(course, snap)
                })
            });
        }

        info!(course = %selection, "discussion board course selected");
        Ok(())
    }

    /// Threads of the selected course whose message contains `search`.
    pub fn discussions(&self, search: &str) -> Vec<Discussion> {
        let items = self.discussions.items();
        filter_discussions(&items, search).into_iter().cloned().collect()
    }

    pub fn discussion_list(&self) -> &LiveList<Discussion> {
        &self.discussions
    }

    pub fn open_thread(&mut self, discussion: DocumentId) -> Result<()> {
        let course = self.course()?;
        let query = replies_query(replies_path(course, &discussion)?);

        self.reply_slot.clear();
        self.replies.clear();

        let sync = &self.sync;
        let list = self.replies.clone();
        let events = self.events.clone();
        self.reply_slot.replace(|| {
            watch(sync, query, STREAM_REPLIES, list, events, snapshot_to_replies)
        });

        info!(course = %course, discussion = %discussion, "thread opened");
        self.open_thread = Some(discussion);
        Ok(())
    }

    pub fn close_thread(&mut self) {
        self.reply_slot.clear();
        self.replies.clear();
        self.open_thread = None;
    }

    pub fn current_thread(&self) -> Option<&DocumentId> {
        self.open_thread.as_ref()
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.replies.items()
    }

    pub fn reply_list(&self) -> &LiveList<Reply> {
        &self.replies
    }

    /// Reply in the open thread as the instructor.
    pub async fn post_reply(&self, message: &str) -> Result<DocumentId> {
        let (course, thread) = self.thread()?;
        let reply = NewReply::from_instructor(message, self.session.instructor_uid.clone());
        Ok(self.sync.post_reply(course, thread, &reply).await?)
    }

    pub async fn mark_solved(&self, discussion: &DocumentId) -> Result<()> {
        let course = self.course()?;
        Ok(self.sync.mark_solved(course, discussion).await?)
    }

    /// Like or unlike a reply of the open thread, based on the replies as
    /// currently shown.
    pub async fn toggle_like(&self, reply: &DocumentId) -> Result<Toggle> {
        let (course, thread) = self.thread()?;
        let shown = self
            .replies
            .items()
            .into_iter()
            .find(|r| &r.id == reply)
            .ok_or_else(|| ClientError::Invalid(format!("reply {reply} is not shown")))?;

        let path = replies_path(course, thread)?;
        Ok(self
            .sync
            .toggle_reply_like(&path, &shown, &self.session.instructor_uid)
            .await?)
    }

    fn course(&self) -> Result<CourseId> {
        self.selection.course().ok_or(ClientError::NotOpen("course"))
    }

    fn thread(&self) -> Result<(CourseId, &DocumentId)> {
        let course = self.course()?;
        let thread = self.open_thread.as_ref().ok_or(ClientError::NotOpen("thread"))?;
        Ok((course, thread))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use coursedesk_shared::types::{InstructorId, UserUid};
    use coursedesk_store::discussions::{discussion_doc, discussions_path};
    use coursedesk_store::models::fields;
    use coursedesk_store::MemoryStore;
    use serde_json::json;

    const COURSE: CourseId = CourseId(7);

    fn session() -> Session {
        Session::new(InstructorId(1), UserUid::new("ins-uid"), "Dr. K", "k@example.org")
    }

    fn seed(store: &MemoryStore, id: &str, message: &str, ts: &str) {
        store.put(
            &discussion_doc(COURSE, &id.into()).unwrap(),
            fields([
                ("message", json!(message)),
                ("senderName", json!("Student")),
                ("timestamp", json!(ts)),
            ]),
        );
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    fn board(store: &MemoryStore) -> DiscussionBoard<MemoryStore> {
        DiscussionBoard::new(
            Synchronizer::new(store.clone()),
            session(),
            EventBus::default(),
        )
    }

    #[tokio::test]
    async fn selecting_a_course_streams_its_threads() {
        let store = MemoryStore::new();
        seed(&store, "a", "How do lifetimes work?", "2024-05-01T10:00:00Z");
        seed(&store, "b", "Borrow checker error", "2024-05-02T10:00:00Z");

        let mut board = board(&store);
        board.select_course(CourseSelection::Course(COURSE)).unwrap();
        eventually(|| board.discussion_list().len() == 2).await;

        let ids: Vec<_> = board.discussions("").into_iter().map(|d| d.id.0).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(board.discussions("LIFETIME").len(), 1);
    }

    #[tokio::test]
    async fn selecting_all_clears_and_unsubscribes() {
        let store = MemoryStore::new();
        seed(&store, "a", "question", "2024-05-01T10:00:00Z");

        let mut board = board(&store);
        board.select_course(CourseSelection::Course(COURSE)).unwrap();
        eventually(|| board.discussion_list().len() == 1).await;

        board.select_course(CourseSelection::All).unwrap();
        assert!(board.discussions("").is_empty());
        let path = discussions_path(COURSE).unwrap();
        eventually(|| store.watcher_count(&path) == 0).await;

        // Later writes do not resurrect the list.
        seed(&store, "b", "another", "2024-05-03T10:00:00Z");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(board.discussions("").is_empty());
    }

    #[tokio::test]
    async fn thread_actions_require_an_open_thread() {
        let store = MemoryStore::new();
        let board = board(&store);
        let err = board.post_reply("hello").await.unwrap_err();
        assert!(matches!(err, ClientError::NotOpen("course")));
    }

    #[tokio::test]
    async fn replying_and_liking_in_an_open_thread() {
        let store = MemoryStore::new();
        seed(&store, "a", "question", "2024-05-01T10:00:00Z");

        let mut board = board(&store);
        board.select_course(CourseSelection::Course(COURSE)).unwrap();
        board.open_thread("a".into()).unwrap();

        let reply = board.post_reply("  Use references.  ").await.unwrap();
        eventually(|| board.replies().len() == 1).await;
        let shown = &board.replies()[0];
        assert_eq!(shown.message, "Use references.");
        assert_eq!(shown.sender_name.as_deref(), Some("Instructor"));

        assert_eq!(board.toggle_like(&reply).await.unwrap(), Toggle::Added);
        eventually(|| board.replies()[0].likes == vec!["ins-uid".to_string()]).await;
        assert_eq!(board.toggle_like(&reply).await.unwrap(), Toggle::Removed);
        eventually(|| board.replies()[0].likes.is_empty()).await;

        board.mark_solved(&"a".into()).await.unwrap();
        eventually(|| board.discussions("").first().is_some_and(|d| d.solved)).await;
    }

    #[tokio::test]
    async fn switching_course_closes_the_thread() {
        let store = MemoryStore::new();
        seed(&store, "a", "question", "2024-05-01T10:00:00Z");

        let mut board = board(&store);
        board.select_course(CourseSelection::Course(COURSE)).unwrap();
        board.open_thread("a".into()).unwrap();
        assert!(board.current_thread().is_some());

        board.select_course(CourseSelection::Course(CourseId(8))).unwrap();
        assert!(board.current_thread().is_none());
        assert!(board.replies().is_empty());
    }
}
