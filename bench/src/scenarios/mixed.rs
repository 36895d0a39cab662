//! Mixed traffic scenario: random event types, rate-limited consumers, and a relay that
//! publishes from inside its callback.
//!
//! Each round publishes a seeded random sequence of events across several event types, then a
//! marker event. The marker is delivered after everything published before it, so waiting for it
//! waits for the round to drain.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use crossbeam::channel::Receiver;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rusty_broker::{Broker, ChannelListener, EventType, Listener, ListenerRef};

use super::Scenario;
use crate::listeners::{BusyListener, CountingListener};

const MARKER: &str = "round-end";
const ECHO: &str = "echo";

/// Configuration for the mixed traffic scenario.
#[derive(Debug, Clone)]
pub struct MixedConfig {
    /// Number of distinct event types traffic is spread over.
    pub event_types: usize,
    /// Cheap listeners per event type.
    pub listeners_per_type: usize,
    /// Minimum interval of the display listener subscribed to every type.
    pub display_interval: Duration,
    /// Work done by the display listener per delivery.
    pub display_work: u32,
    /// Events published per round, not counting relayed ones.
    pub events_per_round: usize,
    /// Random seed for the event type sequence.
    pub seed: u64,
}

impl Default for MixedConfig {
    fn default() -> Self {
        Self {
            event_types: 8,
            listeners_per_type: 2,
            display_interval: Duration::from_micros(50),
            display_work: 500,
            events_per_round: 2_000,
            seed: 42,
        }
    }
}

/// Re-publishes every event it sees on the first event type as an echo.
struct Relay {
    broker: Weak<Broker<u64>>,
}

impl Listener<u64> for Relay {
    fn handle_event(&self, _: &EventType, payload: &u64) {
        if let Some(broker) = self.broker.upgrade() {
            broker.publish(ECHO, *payload, None);
        }
    }
}

pub struct MixedScenario {
    config: MixedConfig,
    broker: Arc<Broker<u64>>,
    rng: ChaCha8Rng,
    event_types: Vec<EventType>,
    counters: Vec<Arc<CountingListener>>,
    display: Arc<BusyListener>,
    marker: Option<Receiver<(EventType, u64)>>,
}

impl MixedScenario {
    pub fn with_config(config: MixedConfig) -> Self {
        let event_types = (0..config.event_types)
            .map(|n| EventType::new(format!("sensor-{n}")))
            .collect();
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            display: BusyListener::new(config.display_work),
            config,
            broker: Arc::new(Broker::new()),
            event_types,
            counters: Vec::new(),
            marker: None,
        }
    }

    /// Deliveries to the cheap per-type listeners, echoes included.
    pub fn deliveries(&self) -> usize {
        self.counters.iter().map(|c| c.count()).sum()
    }

    /// Deliveries to the rate-limited display.
    pub fn display_deliveries(&self) -> usize {
        self.display.count()
    }
}

impl Default for MixedScenario {
    fn default() -> Self {
        Self::with_config(MixedConfig::default())
    }
}

impl Scenario for MixedScenario {
    fn name(&self) -> &'static str {
        "mixed"
    }

    fn description(&self) -> &'static str {
        "Random event types, a rate-limited display, and a relay publishing from its callback"
    }

    fn events_per_round(&self) -> usize {
        self.config.events_per_round
    }

    fn setup(&mut self) {
        for event_type in self.event_types.iter().chain(std::iter::once(&EventType::new(ECHO))) {
            for _ in 0..self.config.listeners_per_type {
                let counter = CountingListener::new();
                let listener: ListenerRef<u64> = counter.clone();
                let _ = self.broker.add_listener(event_type, &listener, Duration::ZERO);
                self.counters.push(counter);
            }
        }

        let display: ListenerRef<u64> = self.display.clone();
        let _ = self.broker.add_listener_for_all(
            self.event_types.iter(),
            &display,
            self.config.display_interval,
        );

        if let Some(first) = self.event_types.first() {
            let relay: ListenerRef<u64> = Arc::new(Relay {
                broker: Arc::downgrade(&self.broker),
            });
            let _ = self.broker.add_listener(first, &relay, Duration::ZERO);
        }

        let (marker, receiver) = ChannelListener::<u64>::with_receiver();
        let marker: ListenerRef<u64> = Arc::new(marker);
        let _ = self.broker.add_listener(MARKER, &marker, Duration::ZERO);
        self.marker = Some(receiver);

        let _ = self.broker.start();
    }

    fn round(&mut self) {
        if self.event_types.is_empty() {
            return;
        }
        for n in 0..self.config.events_per_round as u64 {
            let index = self.rng.gen_range(0..self.event_types.len());
            self.broker.publish(&self.event_types[index], n, None);
        }
        self.broker.publish(MARKER, 0, None);
        if let Some(marker) = &self.marker {
            let _ = marker.recv();
        }
    }

    fn teardown(&mut self) {
        let _ = self.broker.stop();
        self.counters.clear();
        self.marker = None;
    }
}
