//! The pending-event queue between publishers and the dispatch worker.
//!
//! The queue and the stop flag live under one mutex. A publish enqueues and notifies while
//! holding it, and the worker checks both the queue and the flag while holding it before it
//! waits, so a publish can never slip in between the worker's check and its sleep.
use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, PoisonError},
};

use crate::{event::EventType, listener::ListenerRef, util::lock};

/// One published occurrence awaiting dispatch.
pub(crate) struct PendingEvent<P> {
    pub(crate) event_type: EventType,
    pub(crate) payload: P,
    /// Held so the source's identity stays unique while the event is queued.
    pub(crate) source: Option<ListenerRef<P>>,
}

struct Inner<P> {
    events: VecDeque<PendingEvent<P>>,
    stopping: bool,
}

/// Unbounded FIFO with a blocking pop.
pub(crate) struct Queue<P> {
    inner: Mutex<Inner<P>>,
    available: Condvar,
}

impl<P> Queue<P> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                events: VecDeque::new(),
                stopping: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append an event and wake the worker. Returns `false`, dropping the event, if a stop has
    /// been signalled.
    pub(crate) fn push(&self, event: PendingEvent<P>) -> bool {
        let mut inner = lock(&self.inner);
        if inner.stopping {
            return false;
        }
        inner.events.push_back(event);
        self.available.notify_one();
        true
    }

    /// Take the next event, blocking while the queue is empty. Returns `None` once the queue is
    /// empty and a stop has been signalled.
    pub(crate) fn pop(&self) -> Option<PendingEvent<P>> {
        let mut inner = lock(&self.inner);
        loop {
            if let Some(event) = inner.events.pop_front() {
                return Some(event);
            }
            if inner.stopping {
                return None;
            }
            inner = self
                .available
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Refuse further publishes and wake the worker so it can drain and exit.
    pub(crate) fn signal_stop(&self) {
        lock(&self.inner).stopping = true;
        self.available.notify_all();
    }

    /// Discard anything left and accept publishes again. Returns the number of discarded events.
    pub(crate) fn reset(&self) -> usize {
        let mut inner = lock(&self.inner);
        let discarded = inner.events.len();
        inner.events.clear();
        inner.stopping = false;
        discarded
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.inner).events.len()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    fn event(payload: u32) -> PendingEvent<u32> {
        PendingEvent {
            event_type: EventType::new("t"),
            payload,
            source: None,
        }
    }

    #[test]
    fn pops_in_push_order() {
        let queue = Queue::new();
        assert!(queue.push(event(1)));
        assert!(queue.push(event(2)));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().map(|e| e.payload), Some(1));
        assert_eq!(queue.pop().map(|e| e.payload), Some(2));
    }

    #[test]
    fn push_after_stop_is_dropped() {
        let queue = Queue::new();
        queue.signal_stop();

        assert!(!queue.push(event(1)));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn pop_drains_before_reporting_stop() {
        let queue = Queue::new();
        let _ = queue.push(event(1));
        queue.signal_stop();

        assert_eq!(queue.pop().map(|e| e.payload), Some(1));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn pop_wakes_on_push() {
        let queue = Arc::new(Queue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop().map(|e| e.payload))
        };

        thread::sleep(Duration::from_millis(20));
        let _ = queue.push(event(9));

        assert_eq!(consumer.join().unwrap(), Some(9));
    }

    #[test]
    fn pop_wakes_on_stop() {
        let queue: Arc<Queue<u32>> = Arc::new(Queue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop().is_none())
        };

        thread::sleep(Duration::from_millis(20));
        queue.signal_stop();

        assert!(consumer.join().unwrap());
    }

    #[test]
    fn reset_discards_and_reopens() {
        let queue = Queue::new();
        let _ = queue.push(event(1));
        let _ = queue.push(event(2));
        queue.signal_stop();

        assert_eq!(queue.reset(), 2);
        assert!(queue.push(event(3)));
        assert_eq!(queue.pop().map(|e| e.payload), Some(3));
    }
}
