//! Publish-to-delivery latency measurement.
//!
//! Payloads carry the instant they were published; a listener records the elapsed time when the
//! event reaches it. The samples are summarized as [`LatencyStats`].

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use rusty_broker::{Broker, ChannelListener, ListenerRef};

/// Statistics collected from latency samples.
#[derive(Debug, Clone)]
pub struct LatencyStats {
    /// Total number of deliveries measured.
    pub sample_count: usize,
    /// Sum of all latencies.
    pub total: Duration,
    /// Minimum latency observed.
    pub min: Duration,
    /// Maximum latency observed.
    pub max: Duration,
    /// Sorted samples for percentile calculations.
    sorted: Vec<Duration>,
}

impl LatencyStats {
    /// Create new stats from a collection of samples.
    pub fn from_samples(samples: Vec<Duration>) -> Self {
        let sample_count = samples.len();
        let total: Duration = samples.iter().sum();
        let min = samples.iter().min().copied().unwrap_or(Duration::ZERO);
        let max = samples.iter().max().copied().unwrap_or(Duration::ZERO);

        let mut sorted = samples;
        sorted.sort();

        Self {
            sample_count,
            total,
            min,
            max,
            sorted,
        }
    }

    /// Average latency.
    pub fn average(&self) -> Duration {
        if self.sample_count == 0 {
            Duration::ZERO
        } else {
            self.total / self.sample_count as u32
        }
    }

    /// Get a specific percentile (0-100).
    pub fn percentile(&self, p: usize) -> Duration {
        if self.sorted.is_empty() {
            return Duration::ZERO;
        }
        let p = p.min(100);
        let index = (self.sorted.len() * p / 100).min(self.sorted.len() - 1);
        self.sorted[index]
    }

    pub fn median(&self) -> Duration {
        self.percentile(50)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99)
    }
}

impl std::fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} deliveries, avg: {:.1}us, p50: {:.1}us, p99: {:.1}us, max: {:.1}us",
            self.sample_count,
            self.average().as_secs_f64() * 1e6,
            self.median().as_secs_f64() * 1e6,
            self.p99().as_secs_f64() * 1e6,
            self.max.as_secs_f64() * 1e6,
        )
    }
}

/// Publish `count` timestamped events through a fresh broker and measure how long each took to
/// reach a listener.
pub fn measure_latency(count: usize) -> LatencyStats {
    let broker: Broker<Instant> = Broker::new();
    let (listener, published_at) = ChannelListener::<Instant>::with_receiver();
    let listener: ListenerRef<Instant> = Arc::new(listener);
    let _ = broker.add_listener("tick", &listener, Duration::ZERO);

    let mut samples = Vec::with_capacity(count);
    if broker.start().is_err() {
        return LatencyStats::from_samples(samples);
    }
    for _ in 0..count {
        broker.publish("tick", Instant::now(), None);
        // Wait for each delivery so samples do not include queueing behind earlier events.
        if let Ok((_, at)) = published_at.recv() {
            samples.push(at.elapsed());
        }
    }
    let _ = broker.stop();

    LatencyStats::from_samples(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_of_known_samples() {
        let samples = (1..=100).map(Duration::from_micros).collect();
        let stats = LatencyStats::from_samples(samples);

        assert_eq!(stats.sample_count, 100);
        assert_eq!(stats.min, Duration::from_micros(1));
        assert_eq!(stats.max, Duration::from_micros(100));
        assert_eq!(stats.median(), Duration::from_micros(51));
        assert_eq!(stats.p99(), Duration::from_micros(100));
    }

    #[test]
    fn empty_samples_are_zero() {
        let stats = LatencyStats::from_samples(Vec::new());

        assert_eq!(stats.average(), Duration::ZERO);
        assert_eq!(stats.percentile(90), Duration::ZERO);
    }

    #[test]
    fn measures_every_delivery() {
        let stats = measure_latency(10);
        assert_eq!(stats.sample_count, 10);
    }
}
