//! Listeners with predictable cost for benchmarking.

use std::{
    hint::black_box,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use rusty_broker::{EventType, Listener};

/// Counts deliveries and does nothing else.
#[derive(Debug, Default)]
pub struct CountingListener {
    count: AtomicUsize,
}

impl CountingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of events delivered so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl<P> Listener<P> for CountingListener {
    fn handle_event(&self, _: &EventType, _: &P) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Burns a fixed number of iterations per delivery to stand in for real listener work.
#[derive(Debug)]
pub struct BusyListener {
    iterations: u32,
    count: AtomicUsize,
}

impl BusyListener {
    pub fn new(iterations: u32) -> Arc<Self> {
        Arc::new(Self {
            iterations,
            count: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl<P> Listener<P> for BusyListener {
    fn handle_event(&self, event_type: &EventType, _: &P) {
        let mut acc = event_type.as_str().len() as u64;
        for i in 0..self.iterations {
            acc = black_box(acc.wrapping_mul(31).wrapping_add(i as u64));
        }
        black_box(acc);
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}
