//! Contended scenario: several publisher threads racing on one broker.

use std::{sync::Arc, thread, time::Duration};

use rusty_broker::{Broker, ListenerRef};

use super::Scenario;
use crate::listeners::CountingListener;

/// Configuration for the contended scenario.
#[derive(Debug, Clone)]
pub struct ContendedConfig {
    /// Number of publishing threads.
    pub publishers: usize,
    /// Events each thread publishes per round.
    pub events_per_publisher: usize,
}

impl Default for ContendedConfig {
    fn default() -> Self {
        Self {
            publishers: 16,
            events_per_publisher: 1_000,
        }
    }
}

pub struct ContendedScenario {
    config: ContendedConfig,
    broker: Arc<Broker<usize>>,
    counter: Arc<CountingListener>,
    expected: usize,
}

impl ContendedScenario {
    pub fn with_config(config: ContendedConfig) -> Self {
        Self {
            config,
            broker: Arc::new(Broker::new()),
            counter: CountingListener::new(),
            expected: 0,
        }
    }

    pub fn deliveries(&self) -> usize {
        self.counter.count()
    }
}

impl Default for ContendedScenario {
    fn default() -> Self {
        Self::with_config(ContendedConfig::default())
    }
}

impl Scenario for ContendedScenario {
    fn name(&self) -> &'static str {
        "contended"
    }

    fn description(&self) -> &'static str {
        "Many threads publishing one event type concurrently"
    }

    fn events_per_round(&self) -> usize {
        self.config.publishers * self.config.events_per_publisher
    }

    fn setup(&mut self) {
        let listener: ListenerRef<usize> = self.counter.clone();
        let _ = self.broker.add_listener("hot", &listener, Duration::ZERO);
        let _ = self.broker.start();
    }

    fn round(&mut self) {
        let per_publisher = self.config.events_per_publisher;
        let threads: Vec<_> = (0..self.config.publishers)
            .map(|publisher| {
                let broker = Arc::clone(&self.broker);
                thread::spawn(move || {
                    for n in 0..per_publisher {
                        broker.publish("hot", publisher * per_publisher + n, None);
                    }
                })
            })
            .collect();
        for thread in threads {
            let _ = thread.join();
        }
        self.expected += self.events_per_round();
        while self.deliveries() < self.expected {
            thread::yield_now();
        }
    }

    fn teardown(&mut self) {
        let _ = self.broker.stop();
        self.counter = CountingListener::new();
        self.expected = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_every_published_event() {
        let mut scenario = ContendedScenario::with_config(ContendedConfig {
            publishers: 4,
            events_per_publisher: 250,
        });
        scenario.setup();

        scenario.round();

        assert_eq!(scenario.deliveries(), 1_000);
        scenario.teardown();
    }
}
