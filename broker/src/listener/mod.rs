//! The listener capability and listener identity.
//!
//! Listeners are shared as [`ListenerRef`] handles. Two handles refer to the same listener when
//! they point at the same allocation, regardless of the concrete type behind them. The same
//! handle is used as the `source` of a publish to keep a listener from receiving its own events.
mod channel;

use std::sync::Arc;

use crate::event::EventType;

pub use channel::ChannelListener;

/// Something that wants to be told about events.
///
/// Callbacks are invoked synchronously on the broker's dispatch thread. All calls, across all
/// event types, are serialized: a listener is never invoked concurrently with itself or with any
/// other listener of the same broker. Callbacks should be fast; slow work belongs on the
/// listener's own threads (see [`ChannelListener`]).
pub trait Listener<P>: Send + Sync {
    /// Handle one event. The payload is shared with every other listener of the event.
    fn handle_event(&self, event_type: &EventType, payload: &P);
}

impl<P, F> Listener<P> for F
where
    F: Fn(&EventType, &P) + Send + Sync,
{
    fn handle_event(&self, event_type: &EventType, payload: &P) {
        self(event_type, payload)
    }
}

/// A shared handle to a listener. Identity is the handle's allocation.
pub type ListenerRef<P> = Arc<dyn Listener<P>>;

/// Returns `true` if both handles refer to the same listener.
#[inline]
pub fn same_listener<P>(a: &ListenerRef<P>, b: &ListenerRef<P>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// A hashable key for a listener's identity. Only meaningful while a handle is held.
#[inline]
pub(crate) fn identity<P>(listener: &ListenerRef<P>) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}
