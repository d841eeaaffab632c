//! The seam to the remote document store.

use std::future::Future;

use tokio::sync::broadcast;

use coursedesk_shared::types::DocumentId;

use crate::error::Result;
use crate::models::{Document, Fields};
use crate::path::{CollectionPath, DocumentPath};
use crate::patch::FieldPatch;
use crate::query::Query;

/// What happened to a document in a watched collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// Notification pushed by the store to collection watchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Changed { id: DocumentId, kind: ChangeKind },
    /// The store will deliver nothing more for this collection.
    Terminated(String),
}

/// Operations the synchronizer needs from a remote document store.
///
/// Implementations must apply each write atomically and notify watchers of
/// the written collection after the write is visible to [`fetch`].
///
/// [`fetch`]: DocumentStore::fetch
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Start receiving change notifications for a collection.
    fn watch(&self, path: &CollectionPath) -> Result<broadcast::Receiver<StoreEvent>>;

    /// The full current document set matching `query`'s filters, unordered.
    fn fetch(&self, query: &Query) -> impl Future<Output = Result<Vec<Document>>> + Send;

    /// Create a document, stamping `timestamp_field` with the store clock.
    fn create(
        &self,
        path: &CollectionPath,
        fields: Fields,
        timestamp_field: &str,
    ) -> impl Future<Output = Result<DocumentId>> + Send;

    /// Apply a field-level patch to an existing document.
    fn patch(&self, doc: &DocumentPath, patch: FieldPatch)
        -> impl Future<Output = Result<()>> + Send;

    /// Delete a document. Returns whether it existed.
    fn delete(&self, doc: &DocumentPath) -> impl Future<Output = Result<bool>> + Send;
}
