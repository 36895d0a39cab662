//! The event broker and its lifecycle.
//!
//! This module provides [`Broker`], which owns the subscription registry, the pending-event
//! queue, and the dispatch worker. It is the public face of the crate: listeners register with
//! it, publishers publish through it, and the owning application starts and stops it.
//!
//! # Lifecycle
//!
//! A broker starts out [`State::Stopped`]. [`start()`](Broker::start) spawns exactly one dispatch
//! worker; [`stop()`](Broker::stop) lets that worker drain every queued event, joins it, and then
//! discards all subscriptions and any leftover events. A stopped broker can be started again and
//! behaves exactly like a freshly constructed one.
//!
//! Registration does not depend on the lifecycle: listeners can be added and removed whether or
//! not the broker is running. Events published while the broker is stopped wait in the queue for
//! the next start; events published while a stop is in progress are dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! let broker: Broker<Reading> = Broker::new();
//! let (display, readings) = ChannelListener::with_receiver();
//! let display: ListenerRef<Reading> = Arc::new(display);
//!
//! // The display does not need more than four updates a second
//! broker.add_listener("speed", &display, Duration::from_millis(250));
//!
//! broker.start()?;
//! broker.publish("speed", Reading::kph(42.0), None);
//! broker.stop()?;
//! ```
use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex},
    thread::{self, ThreadId},
    time::Duration,
};

use log::{debug, warn};

use crate::{
    config::BrokerConfig,
    error::BrokerError,
    event::EventType,
    listener::ListenerRef,
    publisher::Publisher,
    queue::PendingEvent,
    registry::{BulkRegistration, Registration, Removal},
    state::State,
    util::lock,
    worker::{Dispatcher, Worker},
};

/// Lifecycle bookkeeping readable without waiting on a start or stop in progress.
#[derive(Debug, Default)]
struct Status {
    state: State,
    worker_thread: Option<ThreadId>,
}

/// An in-process publish/subscribe broker for payloads of type `P`.
///
/// All methods take `&self` and may be called from any thread; share a broker with `Arc`.
///
/// # Delivery
///
/// Events are delivered in the global order their publishes completed. For each event the
/// listeners registered for its type at that moment are called one after another on the
/// dispatch thread, in registration order, skipping:
/// - the listener that published the event (its `source`)
/// - listeners whose minimum interval has not yet passed since their last delivery
///
/// A slow listener holds up every other listener and event. Listeners with real work to do
/// should hand it off, e.g. through a [`ChannelListener`](crate::ChannelListener).
pub struct Broker<P>
where
    P: Send + Sync + 'static,
{
    dispatcher: Arc<Dispatcher<P>>,
    worker_name: String,
    /// Serializes start and stop. Holds the worker of the current running period.
    control: Mutex<Option<Worker>>,
    status: Mutex<Status>,
}

impl<P> Broker<P>
where
    P: Send + Sync + 'static,
{
    /// Creates a stopped broker with the default configuration.
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    /// Creates a stopped broker with the given configuration.
    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(config.clock, config.failure_policy)),
            worker_name: config.worker_name,
            control: Mutex::new(None),
            status: Mutex::new(Status::default()),
        }
    }

    // ==================== Lifecycle ====================

    /// Start dispatching. Does nothing if the broker is already running.
    ///
    /// Concurrent calls are safe: exactly one dispatch worker is spawned per running period.
    pub fn start(&self) -> Result<(), BrokerError> {
        // A listener asking to start its own broker: it is running by definition.
        if self.on_worker_thread() {
            return Ok(());
        }
        let mut control = lock(&self.control);
        if control.is_some() {
            return Ok(());
        }
        // Status stays locked until the worker's identity is recorded, so a listener running on
        // the new worker cannot mistake itself for an outside caller.
        let mut status = lock(&self.status);
        status.state = State::Starting;
        match Worker::spawn(&self.worker_name, Arc::clone(&self.dispatcher)) {
            Ok(worker) => {
                status.state = State::Running;
                status.worker_thread = Some(worker.thread_id());
                drop(status);
                *control = Some(worker);
                debug!("Broker started with worker '{}'", self.worker_name);
                Ok(())
            }
            Err(err) => {
                status.state = State::Stopped;
                Err(BrokerError::Spawn(err))
            }
        }
    }

    /// Stop dispatching. Does nothing if the broker is already stopped.
    ///
    /// Blocks until the dispatch worker has delivered every event queued before the stop and
    /// exited. Afterwards all subscriptions are removed and the broker is back in its initial
    /// state.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::WorkerPanicked`] if a listener panic killed the worker during this
    ///   running period. The broker is still fully stopped and reset.
    /// - [`BrokerError::StopFromWorker`] if called from a listener callback. Nothing changes.
    pub fn stop(&self) -> Result<(), BrokerError> {
        if self.on_worker_thread() {
            return Err(BrokerError::StopFromWorker);
        }
        let mut control = lock(&self.control);
        let Some(worker) = control.take() else {
            return Ok(());
        };
        lock(&self.status).state = State::Stopping;
        self.dispatcher.queue.signal_stop();

        let joined = worker.join();

        self.dispatcher.registry.clear();
        let discarded = self.dispatcher.queue.reset();
        if discarded > 0 {
            // Only possible when the worker died before draining.
            warn!("Discarded {discarded} undelivered event(s) on stop");
        }
        self.set_status(State::Stopped, None);
        debug!("Broker stopped");
        joined
    }

    /// The current lifecycle state.
    pub fn state(&self) -> State {
        lock(&self.status).state
    }

    /// Returns `true` while the broker is starting or running.
    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    fn set_status(&self, state: State, worker_thread: Option<ThreadId>) {
        let mut status = lock(&self.status);
        status.state = state;
        status.worker_thread = worker_thread;
    }

    fn on_worker_thread(&self) -> bool {
        lock(&self.status).worker_thread == Some(thread::current().id())
    }

    // ==================== Registration ====================

    /// Subscribe `listener` to `event_type`.
    ///
    /// After a delivery, the listener is skipped for this event type until `min_interval` has
    /// passed; events arriving in that window are dropped for it. Use [`Duration::ZERO`] to
    /// receive everything.
    ///
    /// Returns [`Registration::AlreadyPresent`] without changing anything if the listener is
    /// already subscribed to the type. To change the interval, remove the listener first.
    pub fn add_listener(
        &self,
        event_type: impl Into<EventType>,
        listener: &ListenerRef<P>,
        min_interval: Duration,
    ) -> Registration {
        let event_type = event_type.into();
        let outcome = self
            .dispatcher
            .registry
            .add(event_type.clone(), listener, min_interval);
        if outcome == Registration::Added {
            debug!("Listener subscribed to '{event_type}' (interval {min_interval:?})");
        }
        outcome
    }

    /// Subscribe `listener` to each of `event_types` with the same interval.
    ///
    /// This is not atomic: types that were added stay added even when others were already
    /// present, in which case [`BulkRegistration::Partial`] reports how many.
    pub fn add_listener_for_all<I>(
        &self,
        event_types: I,
        listener: &ListenerRef<P>,
        min_interval: Duration,
    ) -> BulkRegistration
    where
        I: IntoIterator,
        I::Item: Into<EventType>,
    {
        self.dispatcher
            .registry
            .add_all(event_types, listener, min_interval)
    }

    /// Unsubscribe `listener` from `event_type`. Other subscriptions of the listener stay.
    pub fn remove_listener(&self, event_type: &str, listener: &ListenerRef<P>) -> Removal {
        self.dispatcher.registry.remove(event_type, listener)
    }

    /// Unsubscribe `listener` from every event type. Returns the number of subscriptions
    /// removed, or `None` if it had none.
    pub fn remove_listener_everywhere(&self, listener: &ListenerRef<P>) -> Option<NonZeroUsize> {
        self.dispatcher.registry.remove_everywhere(listener)
    }

    /// Number of distinct listeners subscribed to anything.
    pub fn listener_count(&self) -> usize {
        self.dispatcher.registry.listener_count()
    }

    /// Number of listeners subscribed to `event_type`.
    pub fn subscription_count(&self, event_type: &str) -> usize {
        self.dispatcher.registry.subscription_count(event_type)
    }

    // ==================== Publication ====================

    /// Queue an event for delivery to the listeners of `event_type`.
    ///
    /// Never blocks beyond a short critical section. `source` identifies the publisher; if it is
    /// also a listener of `event_type` it will not receive this event. Events published while a
    /// stop is in progress are silently dropped.
    pub fn publish(
        &self,
        event_type: impl Into<EventType>,
        payload: P,
        source: Option<&ListenerRef<P>>,
    ) {
        let event = PendingEvent {
            event_type: event_type.into(),
            payload,
            source: source.cloned(),
        };
        if !self.dispatcher.queue.push(event) {
            debug!("Broker is stopping, dropped a published event");
        }
    }

    /// A publisher bound to this broker that publishes as `source`.
    pub fn publisher(self: &Arc<Self>, source: Option<ListenerRef<P>>) -> Publisher<P> {
        Publisher::new(Arc::clone(self), source)
    }

    /// Number of events waiting for the dispatch worker.
    pub fn pending_len(&self) -> usize {
        self.dispatcher.queue.len()
    }
}

impl<P> Default for Broker<P>
where
    P: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Drop for Broker<P>
where
    P: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.on_worker_thread() {
            // Dropped by one of its own listeners. Let the worker finish on its own.
            self.dispatcher.queue.signal_stop();
            return;
        }
        if let Err(err) = self.stop() {
            warn!("Broker did not stop cleanly on drop: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crossbeam::channel::Receiver;

    use super::*;
    use crate::{config::FailurePolicy, listener::ChannelListener, listener::Listener};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn channel_listener() -> (ListenerRef<u32>, Receiver<(EventType, u32)>) {
        let (listener, receiver) = ChannelListener::<u32>::with_receiver();
        (Arc::new(listener), receiver)
    }

    fn drain(receiver: &Receiver<(EventType, u32)>) -> Vec<u32> {
        receiver.try_iter().map(|(_, payload)| payload).collect()
    }

    // ==================== Lifecycle ====================

    #[test]
    fn new_broker_is_stopped() {
        let broker: Broker<u32> = Broker::new();

        assert_eq!(broker.state(), State::Stopped);
        assert!(!broker.is_running());
        assert_eq!(broker.listener_count(), 0);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let broker: Broker<u32> = Broker::new();

        broker.start().unwrap();
        broker.start().unwrap();
        assert_eq!(broker.state(), State::Running);

        broker.stop().unwrap();
        broker.stop().unwrap();
        assert_eq!(broker.state(), State::Stopped);
    }

    #[test]
    fn stop_on_fresh_broker_keeps_registrations() {
        let broker: Broker<u32> = Broker::new();
        let (listener, _) = channel_listener();
        let _ = broker.add_listener("t", &listener, Duration::ZERO);

        broker.stop().unwrap();

        assert_eq!(broker.listener_count(), 1);
    }

    #[test]
    fn concurrent_starts_spawn_one_worker() {
        let broker: Arc<Broker<u32>> = Arc::new(Broker::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let broker = Arc::clone(&broker);
                thread::spawn(move || broker.start().unwrap())
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        // Every event is delivered exactly once, so only one worker drained the queue
        let (listener, receiver) = channel_listener();
        let _ = broker.add_listener("t", &listener, Duration::ZERO);
        for payload in 0..100 {
            broker.publish("t", payload, None);
        }
        broker.stop().unwrap();

        assert_eq!(drain(&receiver), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn stop_clears_registrations_and_queue() {
        let broker: Broker<u32> = Broker::new();
        let (listener, _) = channel_listener();
        let _ = broker.add_listener_for_all(["a", "b"], &listener, Duration::ZERO);

        broker.start().unwrap();
        broker.stop().unwrap();

        assert_eq!(broker.listener_count(), 0);
        assert_eq!(broker.pending_len(), 0);
    }

    #[test]
    fn events_published_before_start_wait_for_the_worker() {
        let broker: Broker<u32> = Broker::new();
        let (listener, receiver) = channel_listener();
        let _ = broker.add_listener("t", &listener, Duration::ZERO);

        broker.publish("t", 1, None);
        assert_eq!(broker.pending_len(), 1);

        broker.start().unwrap();
        broker.stop().unwrap();

        assert_eq!(drain(&receiver), vec![1]);
    }

    #[test]
    fn stop_from_listener_is_rejected() {
        let broker: Arc<Broker<u32>> = Arc::new(Broker::new());
        let outcome = Arc::new(Mutex::new(None));
        let listener: ListenerRef<u32> = {
            let broker = Arc::downgrade(&broker);
            let outcome = Arc::clone(&outcome);
            Arc::new(move |_: &EventType, _: &u32| {
                if let Some(broker) = broker.upgrade() {
                    let result = broker.stop().map_err(|err| err.to_string());
                    *outcome.lock().unwrap() = Some(result);
                }
            })
        };
        let _ = broker.add_listener("t", &listener, Duration::ZERO);

        broker.start().unwrap();
        broker.publish("t", 1, None);
        broker.stop().unwrap();

        let outcome = outcome.lock().unwrap().clone();
        assert_eq!(outcome, Some(Err(BrokerError::StopFromWorker.to_string())));
    }

    #[test]
    fn listener_panic_is_reported_by_stop() {
        struct Panicker;
        impl Listener<u32> for Panicker {
            fn handle_event(&self, _: &EventType, _: &u32) {
                panic!("listener failed");
            }
        }

        let broker: Broker<u32> = Broker::new();
        let listener: ListenerRef<u32> = Arc::new(Panicker);
        let _ = broker.add_listener("t", &listener, Duration::ZERO);

        broker.start().unwrap();
        broker.publish("t", 1, None);

        match broker.stop() {
            Err(BrokerError::WorkerPanicked(msg)) => assert_eq!(msg, "listener failed"),
            other => panic!("expected a worker panic, got {other:?}"),
        }

        // The broker is reset regardless
        assert_eq!(broker.state(), State::Stopped);
        assert_eq!(broker.listener_count(), 0);
        assert_eq!(broker.pending_len(), 0);
    }

    #[test]
    fn isolated_panics_keep_the_worker_alive() {
        let broker: Broker<u32> = Broker::with_config(
            BrokerConfig::new().with_failure_policy(FailurePolicy::Isolate),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let flaky: ListenerRef<u32> = {
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &EventType, payload: &u32| {
                calls.fetch_add(1, Ordering::SeqCst);
                assert!(*payload % 2 == 0, "odd payload");
            })
        };
        let (listener, receiver) = channel_listener();
        let _ = broker.add_listener("t", &flaky, Duration::ZERO);
        let _ = broker.add_listener("t", &listener, Duration::ZERO);

        broker.start().unwrap();
        for payload in 0..4 {
            broker.publish("t", payload, None);
        }
        broker.stop().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(drain(&receiver), vec![0, 1, 2, 3]);
    }

    #[test]
    fn worker_thread_is_named() {
        let broker: Broker<u32> =
            Broker::with_config(BrokerConfig::new().with_worker_name("nav-events"));
        let name = Arc::new(Mutex::new(None));
        let listener: ListenerRef<u32> = {
            let name = Arc::clone(&name);
            Arc::new(move |_: &EventType, _: &u32| {
                *name.lock().unwrap() = thread::current().name().map(str::to_string);
            })
        };
        let _ = broker.add_listener("t", &listener, Duration::ZERO);

        broker.start().unwrap();
        broker.publish("t", 0, None);
        broker.stop().unwrap();

        assert_eq!(name.lock().unwrap().as_deref(), Some("nav-events"));
    }

    // ==================== Delivery ====================

    #[test]
    fn delivers_while_running() {
        let broker: Broker<u32> = Broker::new();
        let (listener, receiver) = channel_listener();
        let _ = broker.add_listener("t", &listener, Duration::ZERO);

        broker.start().unwrap();
        broker.publish("t", 7, None);

        let (event_type, payload) = receiver.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(event_type, "t");
        assert_eq!(payload, 7);

        broker.stop().unwrap();
    }

    #[test]
    fn late_listener_misses_earlier_events() {
        let broker: Broker<u32> = Broker::new();
        let (early, early_events) = channel_listener();
        let (late, late_events) = channel_listener();
        let _ = broker.add_listener("t", &early, Duration::ZERO);

        broker.start().unwrap();
        broker.publish("t", 1, None);
        early_events.recv_timeout(TIMEOUT).unwrap();

        let _ = broker.add_listener("t", &late, Duration::ZERO);
        broker.publish("t", 2, None);
        broker.stop().unwrap();

        assert_eq!(drain(&early_events), vec![2]);
        assert_eq!(drain(&late_events), vec![2]);
    }

    #[test]
    fn publisher_binds_source() {
        let broker: Arc<Broker<u32>> = Arc::new(Broker::new());
        let (me, my_events) = channel_listener();
        let (other, other_events) = channel_listener();
        let _ = broker.add_listener("t", &me, Duration::ZERO);
        let _ = broker.add_listener("t", &other, Duration::ZERO);

        let publisher = broker.publisher(Some(Arc::clone(&me)));
        broker.start().unwrap();
        publisher.publish("t", 1);
        broker.stop().unwrap();

        assert!(drain(&my_events).is_empty());
        assert_eq!(drain(&other_events), vec![1]);
    }
}
