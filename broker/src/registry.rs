//! The subscription registry.
//!
//! The registry maps each [`EventType`] to the subscriptions interested in it. A single mutex
//! guards the whole map: registration, removal, counting, and the lookup done during dispatch
//! are mutually exclusive. Dispatch never holds that lock while calling listeners; it takes a
//! [`snapshot()`](Registry::snapshot) of the subscription list and releases the lock first.
//!
//! # Identity
//!
//! A subscription is keyed by `(event type, listener identity)`. Registering the same pair twice
//! is reported as [`Registration::AlreadyPresent`] and leaves the original subscription (and its
//! interval) untouched.
use std::{
    collections::{HashMap, HashSet},
    num::NonZeroUsize,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use log::debug;

use crate::{
    event::EventType,
    listener::{self, ListenerRef},
    util::lock,
};

/// Outcome of registering a listener for one event type.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new subscription was created.
    Added,
    /// The listener was already subscribed to this event type. Nothing changed.
    AlreadyPresent,
}

/// Outcome of registering a listener for several event types at once.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkRegistration {
    /// Every event type got a new subscription.
    Added,
    /// `failed` event types were already subscribed. The rest were added and stay added.
    Partial { failed: usize },
}

/// Outcome of removing a listener from one event type.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    NotFound,
}

/// One listener's interest in one event type.
pub(crate) struct Subscription<P> {
    listener: ListenerRef<P>,
    min_interval: Duration,
    /// Only ever written by the dispatch worker.
    last_served_at: Mutex<Option<Instant>>,
}

impl<P> Subscription<P> {
    fn new(listener: ListenerRef<P>, min_interval: Duration) -> Self {
        Self {
            listener,
            min_interval,
            last_served_at: Mutex::new(None),
        }
    }

    #[inline]
    pub(crate) fn listener(&self) -> &ListenerRef<P> {
        &self.listener
    }

    /// Whether enough time has passed since the last delivery for this subscription.
    pub(crate) fn is_due(&self, now: Instant) -> bool {
        match *lock(&self.last_served_at) {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        }
    }

    pub(crate) fn mark_served(&self, now: Instant) {
        *lock(&self.last_served_at) = Some(now);
    }
}

/// Mapping from event type to the subscriptions for it, in registration order.
pub(crate) struct Registry<P> {
    subscriptions: Mutex<HashMap<EventType, Vec<Arc<Subscription<P>>>>>,
}

impl<P> Registry<P> {
    pub(crate) fn new() -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe `listener` to `event_type`.
    pub(crate) fn add(
        &self,
        event_type: EventType,
        listener: &ListenerRef<P>,
        min_interval: Duration,
    ) -> Registration {
        let mut subscriptions = lock(&self.subscriptions);
        let list = subscriptions.entry(event_type).or_default();
        if list
            .iter()
            .any(|sub| listener::same_listener(sub.listener(), listener))
        {
            return Registration::AlreadyPresent;
        }
        list.push(Arc::new(Subscription::new(
            Arc::clone(listener),
            min_interval,
        )));
        Registration::Added
    }

    /// Subscribe `listener` to each of `event_types`. Each type takes the lock on its own, so the
    /// operation as a whole is not atomic and successful additions are never rolled back.
    pub(crate) fn add_all<I>(
        &self,
        event_types: I,
        listener: &ListenerRef<P>,
        min_interval: Duration,
    ) -> BulkRegistration
    where
        I: IntoIterator,
        I::Item: Into<EventType>,
    {
        let failed = event_types
            .into_iter()
            .map(|event_type| self.add(event_type.into(), listener, min_interval))
            .filter(|outcome| *outcome == Registration::AlreadyPresent)
            .count();
        if failed == 0 {
            BulkRegistration::Added
        } else {
            debug!("{failed} event type(s) were already subscribed during bulk registration");
            BulkRegistration::Partial { failed }
        }
    }

    /// Remove the subscription of `listener` to `event_type`.
    pub(crate) fn remove(&self, event_type: &str, listener: &ListenerRef<P>) -> Removal {
        let mut subscriptions = lock(&self.subscriptions);
        let Some(list) = subscriptions.get_mut(event_type) else {
            return Removal::NotFound;
        };
        let Some(index) = list
            .iter()
            .position(|sub| listener::same_listener(sub.listener(), listener))
        else {
            return Removal::NotFound;
        };
        // Keep registration order for the remaining subscriptions.
        list.remove(index);
        if list.is_empty() {
            subscriptions.remove(event_type);
        }
        Removal::Removed
    }

    /// Remove every subscription `listener` holds. Returns `None` if there were none.
    pub(crate) fn remove_everywhere(&self, listener: &ListenerRef<P>) -> Option<NonZeroUsize> {
        let mut subscriptions = lock(&self.subscriptions);
        let mut removed = 0;
        subscriptions.retain(|_, list| {
            let before = list.len();
            list.retain(|sub| !listener::same_listener(sub.listener(), listener));
            removed += before - list.len();
            !list.is_empty()
        });
        NonZeroUsize::new(removed)
    }

    /// Number of distinct listeners across all event types.
    pub(crate) fn listener_count(&self) -> usize {
        let subscriptions = lock(&self.subscriptions);
        subscriptions
            .values()
            .flatten()
            .map(|sub| listener::identity(sub.listener()))
            .collect::<HashSet<_>>()
            .len()
    }

    /// Number of subscriptions for one event type.
    pub(crate) fn subscription_count(&self, event_type: &str) -> usize {
        lock(&self.subscriptions)
            .get(event_type)
            .map_or(0, |list| list.len())
    }

    /// A point-in-time copy of the subscriptions for `event_type`, or `None` if nobody listens.
    pub(crate) fn snapshot(&self, event_type: &str) -> Option<Vec<Arc<Subscription<P>>>> {
        lock(&self.subscriptions)
            .get(event_type)
            .filter(|list| !list.is_empty())
            .cloned()
    }

    /// Drop every subscription.
    pub(crate) fn clear(&self) {
        lock(&self.subscriptions).clear();
    }
}
