//! One live subscription per consumer context.
//!
//! A [`SubscriptionSlot`] belongs to a single consumer (an open thread, the
//! selected course, an open conversation). Replacing its subscription cancels
//! the previous one before the new one is created, so the consumer never has
//! two listeners at once.

use tracing::debug;

use crate::sync::Subscription;

#[derive(Debug, Default)]
pub struct SubscriptionSlot {
    name: &'static str,
    current: Option<Subscription>,
}

impl SubscriptionSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            current: None,
        }
    }

    /// Cancel the current subscription (if any), then install the one built
    /// by `subscribe`.
    pub fn replace<F>(&mut self, subscribe: F) -> &Subscription
    where
        F: FnOnce() -> Subscription,
    {
        self.clear();
        let sub = subscribe();
        debug!(slot = self.name, subscription = sub.id(), "slot filled");
        self.current.insert(sub)
    }

    /// Cancel and forget the current subscription.
    pub fn clear(&mut self) {
        if let Some(old) = self.current.take() {
            old.cancel();
            debug!(slot = self.name, subscription = old.id(), "slot cleared");
        }
    }

    pub fn current(&self) -> Option<&Subscription> {
        self.current.as_ref()
    }

    /// Whether the slot holds a subscription that is still delivering.
    pub fn is_active(&self) -> bool {
        self.current.as_ref().is_some_and(Subscription::is_active)
    }
}

impl Drop for SubscriptionSlot {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::path::CollectionPath;
    use crate::query::Query;
    use crate::sync::Synchronizer;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn replace_cancels_previous_before_creating_next() {
        let sync = Synchronizer::new(MemoryStore::new());
        let mut slot = SubscriptionSlot::new("discussions");

        let a = CollectionPath::parse("courses/1/discussions").unwrap();
        let b = CollectionPath::parse("courses/2/discussions").unwrap();

        // The first sink owns a flag that flips when the sink is released.
        let released = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(Arc::clone(&released));
        slot.replace(|| {
            sync.subscribe_fn(
                Query::new(a.clone()),
                move |_| {
                    let _held = &guard;
                },
                |_| {},
            )
        });
        assert!(!released.load(Ordering::SeqCst));

        let released_before_factory = Arc::new(AtomicBool::new(false));
        slot.replace(|| {
            released_before_factory.store(released.load(Ordering::SeqCst), Ordering::SeqCst);
            sync.subscribe_fn(Query::new(b.clone()), |_| {}, |_| {})
        });

        assert!(released_before_factory.load(Ordering::SeqCst));
        assert_eq!(slot.current().unwrap().query().path, b);
        assert!(slot.is_active());
    }

    #[tokio::test]
    async fn clear_leaves_slot_empty() {
        let sync = Synchronizer::new(MemoryStore::new());
        let mut slot = SubscriptionSlot::new("replies");
        let path = CollectionPath::parse("courses/1/discussions/d/replies").unwrap();
        slot.replace(|| sync.subscribe_fn(Query::new(path), |_| {}, |_| {}));
        slot.clear();
        assert!(slot.current().is_none());
        assert!(!slot.is_active());
        slot.clear();
    }
}
