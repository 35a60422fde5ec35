//! Multicast delegate fields.
//!
//! A module exposes a `Delegate` as a public event of its own. When the
//! field is marked, discovery registers it as a handler, so every
//! subscriber runs whenever the bound event is dispatched.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

type Subscriber<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Identifies one subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Inner<A: 'static> {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber<A>)>>,
}

/// A cloneable list of subscribers invoked with `&A`.
///
/// Clones share the same subscriber list.
pub struct Delegate<A: 'static> {
    inner: Arc<Inner<A>>,
}

impl<A: 'static> Delegate<A> {
    /// Creates a delegate with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                subscribers: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Adds a subscriber.
    pub fn subscribe<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(f)));
        id
    }

    /// Removes a subscriber. Returns whether it was present.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Invokes every subscriber in subscription order.
    ///
    /// Subscribers added or removed while invoking take effect next time.
    pub fn invoke(&self, args: &A) {
        let subscribers: Vec<Subscriber<A>> = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();

        for subscriber in subscribers {
            subscriber(args);
        }
    }

    /// Returns the number of subscribers.
    pub fn len(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns whether there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A: 'static> Clone for Delegate<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: 'static> Default for Delegate<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> fmt::Debug for Delegate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("subscribers", &self.len())
            .finish()
    }
}
