//! # coursedesk-store
//!
//! Live Collection Synchronizer for the chat-like parts of the dashboard:
//! discussion threads, replies and private messages.
//!
//! The remote document store is reached through the [`DocumentStore`] trait;
//! [`MemoryStore`] is the in-process implementation. A [`Synchronizer`] turns
//! a [`Query`] into a stream of full, ordered [`Snapshot`]s and forwards
//! writes as atomic creates and field-level patches.

pub mod discussions;
pub mod likes;
pub mod memory;
pub mod messages;
pub mod models;
pub mod patch;
pub mod path;
pub mod query;
pub mod slot;
pub mod store;
pub mod sync;

mod error;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use models::{Document, Fields};
pub use path::{CollectionPath, DocumentPath};
pub use patch::FieldPatch;
pub use query::{Direction, Query};
pub use slot::SubscriptionSlot;
pub use store::DocumentStore;
pub use sync::{Snapshot, SnapshotEvent, SnapshotSink, Subscription, Synchronizer};
