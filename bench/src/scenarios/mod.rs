//! Realistic broker traffic scenarios.
//!
//! These scenarios simulate the ways an application actually drives a broker: many listeners on
//! one hot event type, a spread of event types with rate-limited consumers, and several threads
//! publishing at once.
//!
//! # Scenarios
//!
//! - **Fan-out**: One event type, many listeners
//! - **Mixed traffic**: Random event types, some listeners rate limited, some publishing back
//! - **Contended**: Several publisher threads racing on one broker

pub mod contended;
pub mod fan_out;
pub mod mixed;

pub use contended::{ContendedConfig, ContendedScenario};
pub use fan_out::{FanOutConfig, FanOutScenario};
pub use mixed::{MixedConfig, MixedScenario};

/// Common trait for benchmark scenarios.
pub trait Scenario {
    /// Human-readable name of the scenario.
    fn name(&self) -> &'static str;

    /// Brief description of what this scenario tests.
    fn description(&self) -> &'static str;

    /// Number of events published per round.
    fn events_per_round(&self) -> usize;

    /// Register listeners and start the broker.
    fn setup(&mut self);

    /// Publish one round of events and wait until the broker has drained them.
    fn round(&mut self);

    /// Stop the broker.
    fn teardown(&mut self);
}
