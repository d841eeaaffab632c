//! Instructor-facing controllers.
//!
//! Each sub-module holds the state and operations behind one dashboard
//! screen. Controllers receive the [`Session`](coursedesk_shared::Session)
//! explicitly and report to the UI through the
//! [`EventBus`](crate::events::EventBus).

pub mod announcements;
pub mod composer;
pub mod conversation;
pub mod discussion_board;
pub mod profile;
pub mod roster;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, error};

use coursedesk_shared::types::CourseId;
use coursedesk_shared::DeskError;
use coursedesk_store::{DocumentStore, Query, Snapshot, Subscription, Synchronizer};

use crate::error::ClientError;
use crate::events::EventBus;

/// Course filter of a screen: everything, or one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CourseSelection {
    #[default]
    All,
    Course(CourseId),
}

impl CourseSelection {
    pub fn matches(self, course: CourseId) -> bool {
        match self {
            CourseSelection::All => true,
            CourseSelection::Course(id) => id == course,
        }
    }

    pub fn course(self) -> Option<CourseId> {
        match self {
            CourseSelection::All => None,
            CourseSelection::Course(id) => Some(id),
        }
    }
}

/// Parses select-box values: `all` or a numeric course id.
impl FromStr for CourseSelection {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(CourseSelection::All);
        }
        s.parse::<i64>()
            .map(|id| CourseSelection::Course(CourseId(id)))
            .map_err(|_| ClientError::Invalid(format!("not a course selection: {s:?}")))
    }
}

impl fmt::Display for CourseSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseSelection::All => write!(f, "all"),
            CourseSelection::Course(id) => write!(f, "{id}"),
        }
    }
}

// ------------------------------------------------------------------
// Live lists
// ------------------------------------------------------------------

#[derive(Debug)]
struct Live<T> {
    items: Vec<T>,
    sequence: u64,
    error: Option<DeskError>,
}

/// The latest projection of a subscription, readable from the controller
/// while the subscription task writes to it.
#[derive(Debug)]
pub struct LiveList<T> {
    inner: Arc<Mutex<Live<T>>>,
}

impl<T> Clone for LiveList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for LiveList<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Live {
                items: Vec::new(),
                sequence: 0,
                error: None,
            })),
        }
    }
}

impl<T: Clone> LiveList<T> {
    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    /// Sequence of the snapshot currently shown (0 before the first one).
    pub fn sequence(&self) -> u64 {
        self.lock().sequence
    }

    /// The error that ended the subscription, if any.
    pub fn error(&self) -> Option<DeskError> {
        self.lock().error.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    fn set(&self, sequence: u64, items: Vec<T>) {
        let mut live = self.lock();
        live.items = items;
        live.sequence = sequence;
        live.error = None;
    }

    fn fail(&self, error: DeskError) {
        self.lock().error = Some(error);
    }

    fn clear(&self) {
        let mut live = self.lock();
        live.items.clear();
        live.sequence = 0;
        live.error = None;
    }

    fn lock(&self) -> MutexGuard<'_, Live<T>> {
        // Updates replace whole fields, so a poisoned list is still consistent.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Subscribe to `query`, projecting each snapshot into `list` and
/// publishing it on `events` under `stream`.
fn watch<S, T, P>(
    sync: &Synchronizer<S>,
    query: Query,
    stream: &'static str,
    list: LiveList<T>,
    events: EventBus,
    project: P,
) -> Subscription
where
    S: DocumentStore,
    T: Clone + Serialize + Send + 'static,
    P: Fn(&Snapshot) -> Vec<T> + Send + 'static,
{
    let on_snapshot = {
        let list = list.clone();
        let events = events.clone();
        move |snapshot: Snapshot| {
            let items = project(&snapshot);
            debug!(stream, sequence = snapshot.sequence, count = items.len(), "snapshot");
            events.snapshot(stream, snapshot.sequence, &items);
            list.set(snapshot.sequence, items);
        }
    };
    let on_error = move |err: DeskError| {
        error!(stream, error = %err, "live stream ended");
        events.error(stream, &err);
        list.fail(err);
    };
    sync.subscribe_fn(query, on_snapshot, on_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_selection_parses_select_values() {
        assert_eq!("all".parse::<CourseSelection>().unwrap(), CourseSelection::All);
        assert_eq!(
            " 42 ".parse::<CourseSelection>().unwrap(),
            CourseSelection::Course(CourseId(42))
        );
        assert!("rust".parse::<CourseSelection>().is_err());
        assert_eq!(CourseSelection::Course(CourseId(7)).to_string(), "7");
    }

    #[test]
    fn selection_matching() {
        assert!(CourseSelection::All.matches(CourseId(1)));
        assert!(!CourseSelection::Course(CourseId(2)).matches(CourseId(1)));
    }
}
