use std::{fmt, sync::Arc};

use crate::{broker::Broker, event::EventType, listener::ListenerRef};

/// A broker handle that always publishes as the same source.
///
/// Components that both listen and publish can hold one of these instead of passing their own
/// listener handle on every call.
pub struct Publisher<P>
where
    P: Send + Sync + 'static,
{
    broker: Arc<Broker<P>>,
    source: Option<ListenerRef<P>>,
}

impl<P> Publisher<P>
where
    P: Send + Sync + 'static,
{
    pub fn new(broker: Arc<Broker<P>>, source: Option<ListenerRef<P>>) -> Self {
        Self { broker, source }
    }

    /// Publish `payload` under `event_type` as this publisher's source.
    pub fn publish(&self, event_type: impl Into<EventType>, payload: P) {
        self.broker
            .publish(event_type, payload, self.source.as_ref());
    }

    pub fn source(&self) -> Option<&ListenerRef<P>> {
        self.source.as_ref()
    }

    pub fn broker(&self) -> &Arc<Broker<P>> {
        &self.broker
    }
}

impl<P> Clone for Publisher<P>
where
    P: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            broker: Arc::clone(&self.broker),
            source: self.source.clone(),
        }
    }
}

impl<P> fmt::Debug for Publisher<P>
where
    P: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("has_source", &self.source.is_some())
            .finish_non_exhaustive()
    }
}
