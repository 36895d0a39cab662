//! The dispatch worker.
//!
//! One [`Worker`] thread exists per running period of a broker. It drains the [`Queue`] in FIFO
//! order and, for each event, calls every eligible listener in turn on its own thread. Only one
//! event is ever being delivered at a time.
use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle, ThreadId},
};

use log::{debug, error, trace};

use crate::{
    config::FailurePolicy,
    error::{BrokerError, panic_message},
    listener::{self, ListenerRef},
    queue::{PendingEvent, Queue},
    registry::{Registry, Subscription},
    time::Clock,
};

/// Everything the dispatch worker shares with the broker's callers.
pub(crate) struct Dispatcher<P> {
    pub(crate) registry: Registry<P>,
    pub(crate) queue: Queue<P>,
    clock: Arc<dyn Clock>,
    failure_policy: FailurePolicy,
}

impl<P> Dispatcher<P> {
    pub(crate) fn new(clock: Arc<dyn Clock>, failure_policy: FailurePolicy) -> Self {
        Self {
            registry: Registry::new(),
            queue: Queue::new(),
            clock,
            failure_policy,
        }
    }

    /// The worker loop: dispatch until the queue reports a stop on an empty queue.
    fn run(&self) {
        while let Some(event) = self.queue.pop() {
            self.dispatch(&event);
        }
    }

    /// Deliver one event to every eligible subscription.
    pub(crate) fn dispatch(&self, event: &PendingEvent<P>) {
        let Some(subscriptions) = self.registry.snapshot(event.event_type.as_str()) else {
            trace!("No listeners for '{}', dropping event", event.event_type);
            return;
        };
        for subscription in &subscriptions {
            if let Some(source) = &event.source
                && listener::same_listener(source, subscription.listener())
            {
                continue;
            }
            let now = self.clock.now();
            if !subscription.is_due(now) {
                trace!("Rate limited delivery of '{}'", event.event_type);
                continue;
            }
            if self.deliver(subscription, event) {
                subscription.mark_served(now);
            }
        }
    }

    /// Invoke one listener. Returns `false` if the listener panicked and the panic was isolated.
    fn deliver(&self, subscription: &Subscription<P>, event: &PendingEvent<P>) -> bool {
        let listener: &ListenerRef<P> = subscription.listener();
        match self.failure_policy {
            FailurePolicy::Propagate => {
                listener.handle_event(&event.event_type, &event.payload);
                true
            }
            FailurePolicy::Isolate => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    listener.handle_event(&event.event_type, &event.payload)
                }));
                match outcome {
                    Ok(()) => true,
                    Err(payload) => {
                        error!(
                            "Listener for '{}' panicked: {}",
                            event.event_type,
                            panic_message(payload.as_ref())
                        );
                        false
                    }
                }
            }
        }
    }
}

/// Handle to a running dispatch thread.
pub(crate) struct Worker {
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawn a named dispatch thread draining `dispatcher`'s queue.
    pub(crate) fn spawn<P>(name: &str, dispatcher: Arc<Dispatcher<P>>) -> io::Result<Self>
    where
        P: Send + Sync + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!("Dispatch worker started");
                dispatcher.run();
                debug!("Dispatch worker drained its queue and is exiting");
            })?;
        Ok(Self { handle })
    }

    #[inline]
    pub(crate) fn thread_id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    /// Block until the worker exits. A worker killed by a listener panic is reported as an error.
    pub(crate) fn join(self) -> Result<(), BrokerError> {
        self.handle.join().map_err(BrokerError::from_panic)
    }
}
