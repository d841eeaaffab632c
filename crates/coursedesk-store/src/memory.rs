//! In-process document store.
//!
//! [`MemoryStore`] implements [`DocumentStore`] over a mutex-guarded map of
//! collections. It backs the test-suite and local demos, and can simulate the
//! two failure modes the UI has to survive: an unreachable store and a
//! revoked read permission.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use coursedesk_shared::types::DocumentId;

use crate::error::{Result, StoreError};
use crate::models::{format_timestamp, Document, Fields};
use crate::path::{CollectionPath, DocumentPath};
use crate::patch::FieldPatch;
use crate::query::Query;
use crate::store::{ChangeKind, DocumentStore, StoreEvent};

/// Buffered notifications per collection before a slow watcher lags.
const WATCH_CAPACITY: usize = 64;

#[derive(Default)]
struct State {
    collections: HashMap<CollectionPath, BTreeMap<DocumentId, Document>>,
    watchers: HashMap<CollectionPath, broadcast::Sender<StoreEvent>>,
    denied: HashSet<CollectionPath>,
    offline: bool,
    last_stamp: Option<DateTime<Utc>>,
}

impl State {
    fn notify(&self, path: &CollectionPath, event: StoreEvent) {
        if let Some(tx) = self.watchers.get(path) {
            // No receivers is fine: nobody is watching right now.
            let _ = tx.send(event);
        }
    }

    /// Strictly increasing store clock, so appends never tie.
    fn stamp(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        format_timestamp(now)
    }

    fn check_writable(&self, path: &CollectionPath) -> Result<()> {
        if self.offline {
            return Err(StoreError::Unavailable("store is offline".into()));
        }
        if self.denied.contains(path) {
            return Err(StoreError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }
}

/// Cheaply cloneable handle to a shared in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave a half-applied write
        // (patches are staged), so a poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or overwrite a document verbatim. Watchers are notified.
    pub fn put(&self, doc: &DocumentPath, fields: Fields) {
        let mut state = self.lock();
        let collection = state
            .collections
            .entry(doc.collection_path().clone())
            .or_default();
        let kind = if collection.contains_key(doc.id()) {
            ChangeKind::Modified
        } else {
            ChangeKind::Added
        };
        collection.insert(doc.id().clone(), Document::new(doc.id().clone(), fields));
        state.notify(
            doc.collection_path(),
            StoreEvent::Changed {
                id: doc.id().clone(),
                kind,
            },
        );
    }

    /// Current stored copy of a document.
    pub fn get(&self, doc: &DocumentPath) -> Option<Document> {
        self.lock()
            .collections
            .get(doc.collection_path())
            .and_then(|c| c.get(doc.id()))
            .cloned()
    }

    /// Number of documents in a collection.
    pub fn len(&self, path: &CollectionPath) -> usize {
        self.lock()
            .collections
            .get(path)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Number of live watchers on a collection.
    pub fn watcher_count(&self, path: &CollectionPath) -> usize {
        self.lock()
            .watchers
            .get(path)
            .map(broadcast::Sender::receiver_count)
            .unwrap_or(0)
    }

    /// Revoke access to a collection: current watchers are terminated and
    /// later reads and writes are refused.
    pub fn deny(&self, path: &CollectionPath) {
        let mut state = self.lock();
        state.denied.insert(path.clone());
        state.notify(path, StoreEvent::Terminated(format!("permission denied on {path}")));
        warn!(path = %path, "access revoked");
    }

    pub fn allow(&self, path: &CollectionPath) {
        self.lock().denied.remove(path);
    }

    /// While offline every write fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }
}

impl DocumentStore for MemoryStore {
    fn watch(&self, path: &CollectionPath) -> Result<broadcast::Receiver<StoreEvent>> {
        let mut state = self.lock();
        if state.denied.contains(path) {
            return Err(StoreError::PermissionDenied(path.to_string()));
        }
        let rx = state
            .watchers
            .entry(path.clone())
            .or_insert_with(|| broadcast::channel(WATCH_CAPACITY).0)
            .subscribe();
        debug!(path = %path, "watcher attached");
        Ok(rx)
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<Document>> {
        let state = self.lock();
        if state.denied.contains(&query.path) {
            return Err(StoreError::PermissionDenied(query.path.to_string()));
        }
        Ok(state
            .collections
            .get(&query.path)
            .map(|c| c.values().filter(|d| query.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn create(
        &self,
        path: &CollectionPath,
        mut fields: Fields,
        timestamp_field: &str,
    ) -> Result<DocumentId> {
        let mut state = self.lock();
        state.check_writable(path)?;

        let id = DocumentId::generate();
        let stamp = state.stamp();
        fields.insert(timestamp_field.to_string(), stamp.into());

        state
            .collections
            .entry(path.clone())
            .or_default()
            .insert(id.clone(), Document::new(id.clone(), fields));
        state.notify(
            path,
            StoreEvent::Changed {
                id: id.clone(),
                kind: ChangeKind::Added,
            },
        );

        debug!(path = %path, id = %id, "document created");
        Ok(id)
    }

    async fn patch(&self, doc: &DocumentPath, patch: FieldPatch) -> Result<()> {
        let mut state = self.lock();
        state.check_writable(doc.collection_path())?;

        let stamp = state.stamp();
        let stored = state
            .collections
            .get_mut(doc.collection_path())
            .and_then(|c| c.get_mut(doc.id()))
            .ok_or_else(|| StoreError::NotFound(doc.to_string()))?;
        patch.apply(&mut stored.fields, &stamp)?;

        state.notify(
            doc.collection_path(),
            StoreEvent::Changed {
                id: doc.id().clone(),
                kind: ChangeKind::Modified,
            },
        );
        Ok(())
    }

    async fn delete(&self, doc: &DocumentPath) -> Result<bool> {
        let mut state = self.lock();
        state.check_writable(doc.collection_path())?;

        let removed = state
            .collections
            .get_mut(doc.collection_path())
            .and_then(|c| c.remove(doc.id()))
            .is_some();
        if removed {
            state.notify(
                doc.collection_path(),
                StoreEvent::Changed {
                    id: doc.id().clone(),
                    kind: ChangeKind::Removed,
                },
            );
        }
        Ok(removed)
    }
}
