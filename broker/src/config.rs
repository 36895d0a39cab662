use std::{fmt, sync::Arc};

use crate::time::{Clock, SystemClock};

/// What the dispatch worker does when a listener callback panics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Let the panic unwind the dispatch worker. No further events are delivered until the
    /// broker is stopped (which reports the panic) and started again.
    #[default]
    Propagate,
    /// Catch the panic, log it, and carry on with the next listener.
    Isolate,
}

/// Construction-time settings for a [`Broker`](crate::Broker).
#[derive(Clone)]
pub struct BrokerConfig {
    /// Name given to the dispatch worker thread.
    pub worker_name: String,
    /// How listener panics are handled.
    pub failure_policy: FailurePolicy,
    /// Time source for rate limiting.
    pub clock: Arc<dyn Clock>,
}

impl BrokerConfig {
    pub const DEFAULT_WORKER_NAME: &'static str = "event-dispatch";

    pub fn new() -> Self {
        Self {
            worker_name: Self::DEFAULT_WORKER_NAME.to_string(),
            failure_policy: FailurePolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_worker_name(mut self, name: impl Into<String>) -> Self {
        self.worker_name = name.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("worker_name", &self.worker_name)
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}
