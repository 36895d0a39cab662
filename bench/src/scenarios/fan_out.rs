//! Fan-out scenario: one event type delivered to many listeners.

use std::{sync::Arc, time::Duration};

use rusty_broker::{Broker, ListenerRef};

use super::Scenario;
use crate::listeners::CountingListener;

/// Configuration for the fan-out scenario.
#[derive(Debug, Clone)]
pub struct FanOutConfig {
    /// Listeners subscribed to the single event type.
    pub listener_count: usize,
    /// Events published per round.
    pub events_per_round: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            listener_count: 16,
            events_per_round: 1_000,
        }
    }
}

pub struct FanOutScenario {
    config: FanOutConfig,
    broker: Broker<u64>,
    listeners: Vec<Arc<CountingListener>>,
    delivered: usize,
}

impl FanOutScenario {
    pub fn with_config(config: FanOutConfig) -> Self {
        Self {
            config,
            broker: Broker::new(),
            listeners: Vec::new(),
            delivered: 0,
        }
    }

    /// Total deliveries seen by all listeners.
    pub fn deliveries(&self) -> usize {
        self.listeners.iter().map(|l| l.count()).sum()
    }
}

impl Default for FanOutScenario {
    fn default() -> Self {
        Self::with_config(FanOutConfig::default())
    }
}

impl Scenario for FanOutScenario {
    fn name(&self) -> &'static str {
        "fan_out"
    }

    fn description(&self) -> &'static str {
        "One event type delivered to many cheap listeners"
    }

    fn events_per_round(&self) -> usize {
        self.config.events_per_round
    }

    fn setup(&mut self) {
        for _ in 0..self.config.listener_count {
            let counter = CountingListener::new();
            let listener: ListenerRef<u64> = counter.clone();
            let _ = self.broker.add_listener("tick", &listener, Duration::ZERO);
            self.listeners.push(counter);
        }
        let _ = self.broker.start();
    }

    fn round(&mut self) {
        for n in 0..self.config.events_per_round as u64 {
            self.broker.publish("tick", n, None);
        }
        self.delivered += self.config.events_per_round * self.config.listener_count;
        while self.deliveries() < self.delivered {
            std::thread::yield_now();
        }
    }

    fn teardown(&mut self) {
        let _ = self.broker.stop();
        self.listeners.clear();
        self.delivered = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listener_sees_every_event() {
        let mut scenario = FanOutScenario::with_config(FanOutConfig {
            listener_count: 4,
            events_per_round: 25,
        });
        scenario.setup();

        scenario.round();
        scenario.round();

        assert_eq!(scenario.deliveries(), 200);
        scenario.teardown();
    }
}
