//! Live Collection Synchronizer.
//!
//! [`Synchronizer::subscribe`] mirrors a remote collection into a locally
//! observable, ordered view. Every change notification triggers a full
//! re-evaluation of the query against the store's current document set, and
//! the complete ordered result is pushed to the subscriber. Snapshots are
//! never patched incrementally, so they cannot drift from the store.
//!
//! Writes (`append`, `mutate`, `toggle_membership`) go straight to the store
//! and never touch a snapshot; the change comes back through the next pushed
//! snapshot like any other remote change.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use coursedesk_shared::constants::FIELD_TIMESTAMP;
use coursedesk_shared::types::{DocumentId, UserUid};
use coursedesk_shared::DeskError;

use crate::error::{Result, StoreError};
use crate::likes::{toggle_patch, Toggle};
use crate::models::{Document, Fields};
use crate::path::{CollectionPath, DocumentPath};
use crate::patch::FieldPatch;
use crate::query::Query;
use crate::store::{DocumentStore, StoreEvent};

/// Full ordered projection of a query's result at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// 1 for the initial snapshot, then increasing by one per delivery.
    pub sequence: u64,
    pub documents: Arc<[Document]>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.id.as_str()).collect()
    }

    /// Convert each document with `convert`, in snapshot order. Documents
    /// that fail to convert are logged and left out.
    pub fn project<T>(&self, convert: impl Fn(&Document) -> Result<T>) -> Vec<T> {
        self.documents
            .iter()
            .filter_map(|doc| match convert(doc) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(
                        sequence = self.sequence,
                        document = %doc.id,
                        error = %e,
                        "skipping malformed document"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Receiver of a subscription's output. Errors arrive on their own channel
/// and end the subscription.
pub trait SnapshotSink: Send + 'static {
    fn on_snapshot(&mut self, snapshot: Snapshot);
    fn on_error(&mut self, error: DeskError);
}

/// Everything a channel-based subscriber receives.
#[derive(Debug, Clone)]
pub enum SnapshotEvent {
    Snapshot(Snapshot),
    Error(DeskError),
}

impl SnapshotSink for mpsc::UnboundedSender<SnapshotEvent> {
    fn on_snapshot(&mut self, snapshot: Snapshot) {
        let _ = self.send(SnapshotEvent::Snapshot(snapshot));
    }

    fn on_error(&mut self, error: DeskError) {
        let _ = self.send(SnapshotEvent::Error(error));
    }
}

/// Adapter turning a pair of closures into a [`SnapshotSink`].
pub struct FnSink<S, E> {
    on_snapshot: S,
    on_error: Option<E>,
}

impl<S, E> FnSink<S, E>
where
    S: FnMut(Snapshot) + Send + 'static,
    E: FnOnce(DeskError) + Send + 'static,
{
    pub fn new(on_snapshot: S, on_error: E) -> Self {
        Self {
            on_snapshot,
            on_error: Some(on_error),
        }
    }
}

impl<S, E> SnapshotSink for FnSink<S, E>
where
    S: FnMut(Snapshot) + Send + 'static,
    E: FnOnce(DeskError) + Send + 'static,
{
    fn on_snapshot(&mut self, snapshot: Snapshot) {
        (self.on_snapshot)(snapshot)
    }

    fn on_error(&mut self, error: DeskError) {
        if let Some(f) = self.on_error.take() {
            f(error)
        }
    }
}

struct Shared {
    sink: Mutex<Option<Box<dyn SnapshotSink>>>,
    closed: AtomicBool,
}

impl Shared {
    fn sink(&self) -> MutexGuard<'_, Option<Box<dyn SnapshotSink>>> {
        self.sink.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Hand a snapshot to the sink. `false` once the subscription is closed.
    fn deliver(&self, snapshot: Snapshot) -> bool {
        let mut guard = self.sink();
        match guard.as_mut() {
            Some(sink) => {
                sink.on_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    /// Report a terminal error and close.
    fn fail(&self, error: DeskError) {
        self.closed.store(true, Ordering::SeqCst);
        let taken = self.sink().take();
        if let Some(mut sink) = taken {
            sink.on_error(error);
        }
    }
}

/// Handle to one live subscription.
///
/// Cancelling is idempotent and is also done on drop, so a handle going out
/// of scope on any path releases the store-side listener. Once
/// [`cancel`](Subscription::cancel) returns, the sink is never invoked again.
/// Do not cancel a subscription from inside its own sink.
pub struct Subscription {
    id: u64,
    query: Query,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Neither cancelled nor terminated by an error.
    pub fn is_active(&self) -> bool {
        !self.shared.closed.load(Ordering::SeqCst)
    }

    /// Stop deliveries and release the listener. Returns `false` if the
    /// subscription was already cancelled.
    pub fn cancel(&self) -> bool {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            // Already closed (cancelled, or failed). Make sure the task is gone.
            if let Some(task) = &self.task {
                task.abort();
            }
            return false;
        }

        // Taking the sink waits for an in-flight delivery to finish.
        drop(self.shared.sink().take());
        if let Some(task) = &self.task {
            task.abort();
        }

        info!(subscription = self.id, query = %self.query, "subscription cancelled");
        true
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("query", &self.query.to_string())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Entry point for live reads and writes against a [`DocumentStore`].
#[derive(Clone)]
pub struct Synchronizer<S: DocumentStore> {
    store: S,
    next_id: Arc<AtomicU64>,
}

impl<S: DocumentStore> Synchronizer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start mirroring `query`. Must be called inside a tokio runtime.
    ///
    /// The sink receives the current result right away (possibly empty) and a
    /// fresh full result after every remote change. A failure to attach (for
    /// example a permission error) is reported through `on_error` before this
    /// returns, and the returned handle is already inactive.
    pub fn subscribe(&self, query: Query, sink: impl SnapshotSink) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::new(Shared {
            sink: Mutex::new(Some(Box::new(sink))),
            closed: AtomicBool::new(false),
        });

        let rx = match self.store.watch(&query.path) {
            Ok(rx) => rx,
            Err(e) => {
                error!(subscription = id, query = %query, error = %e, "subscribe failed");
                shared.fail(DeskError::Subscription(e.to_string()));
                return Subscription {
                    id,
                    query,
                    shared,
                    task: None,
                };
            }
        };

        info!(subscription = id, query = %query, "subscribed");

        let task = tokio::spawn(run_subscription(
            id,
            self.store.clone(),
            query.clone(),
            rx,
            Arc::clone(&shared),
        ));

        Subscription {
            id,
            query,
            shared,
            task: Some(task),
        }
    }

    /// [`subscribe`](Self::subscribe) with closures.
    pub fn subscribe_fn<F, E>(&self, query: Query, on_snapshot: F, on_error: E) -> Subscription
    where
        F: FnMut(Snapshot) + Send + 'static,
        E: FnOnce(DeskError) + Send + 'static,
    {
        self.subscribe(query, FnSink::new(on_snapshot, on_error))
    }

    /// [`subscribe`](Self::subscribe) delivering into a channel.
    pub fn subscribe_channel(
        &self,
        query: Query,
    ) -> (Subscription, mpsc::UnboundedReceiver<SnapshotEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.subscribe(query, tx), rx)
    }

    /// Write a new document. The store stamps its `timestamp` field.
    pub async fn append(&self, path: &CollectionPath, fields: Fields) -> Result<DocumentId> {
        self.store
            .create(path, fields, FIELD_TIMESTAMP)
            .await
            .map_err(|e| {
                error!(path = %path, error = %e, "append failed");
                e
            })
    }

    /// Field-level update of one document.
    pub async fn mutate(&self, doc: &DocumentPath, patch: FieldPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        self.store
            .patch(doc, patch)
            .await
            .map_err(|e| {
                error!(doc = %doc, error = %e, "mutate failed");
                e
            })
    }

    /// Toggle `actor` in the membership array `field`, deciding the direction
    /// from `current` (what the caller's snapshot shows) and writing an
    /// atomic add/remove delta.
    pub async fn toggle_membership(
        &self,
        doc: &DocumentPath,
        field: &str,
        current: &[String],
        actor: &UserUid,
    ) -> Result<Toggle> {
        let (patch, direction) = toggle_patch(field, current, actor);
        self.mutate(doc, patch).await?;
        debug!(doc = %doc, field, actor = %actor, ?direction, "membership toggled");
        Ok(direction)
    }

    pub async fn remove(&self, doc: &DocumentPath) -> Result<bool> {
        self.store
            .delete(doc)
            .await
            .map_err(|e| {
                error!(doc = %doc, error = %e, "delete failed");
                e
            })
    }
}

async fn run_subscription<S: DocumentStore>(
    id: u64,
    store: S,
    query: Query,
    mut rx: broadcast::Receiver<StoreEvent>,
    shared: Arc<Shared>,
) {
    let mut sequence = 0u64;

    loop {
        let documents = match store.fetch(&query).await {
            Ok(docs) => query.evaluate(docs),
            Err(e) => {
                error!(subscription = id, error = %e, "snapshot fetch failed");
                shared.fail(DeskError::Subscription(e.to_string()));
                return;
            }
        };

        sequence += 1;
        debug!(subscription = id, sequence, count = documents.len(), "delivering snapshot");
        let delivered = shared.deliver(Snapshot {
            sequence,
            documents: documents.into(),
        });
        if !delivered {
            return;
        }

        if let Err(e) = wait_for_change(&mut rx).await {
            warn!(subscription = id, error = %e, "subscription terminated by store");
            shared.fail(DeskError::Subscription(e.to_string()));
            return;
        }
    }
}

/// Block until at least one change arrived, then drain whatever else is
/// already queued so a burst yields one re-evaluation.
async fn wait_for_change(rx: &mut broadcast::Receiver<StoreEvent>) -> Result<()> {
    match rx.recv().await {
        Ok(StoreEvent::Changed { .. }) | Err(RecvError::Lagged(_)) => {}
        Ok(StoreEvent::Terminated(reason)) => return Err(StoreError::SubscriptionClosed(reason)),
        Err(RecvError::Closed) => {
            return Err(StoreError::SubscriptionClosed("store shut down".into()))
        }
    }

    loop {
        match rx.try_recv() {
            Ok(StoreEvent::Changed { .. }) | Err(TryRecvError::Lagged(_)) => continue,
            Ok(StoreEvent::Terminated(reason)) => {
                return Err(StoreError::SubscriptionClosed(reason))
            }
            Err(TryRecvError::Empty) => return Ok(()),
            Err(TryRecvError::Closed) => {
                return Err(StoreError::SubscriptionClosed("store shut down".into()))
            }
        }
    }
}
