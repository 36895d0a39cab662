use std::fmt;

/// Enumeration of the lifecycle states a broker can be in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No dispatch worker exists. This is both the initial state and the state after a stop.
    #[default]
    Stopped,
    /// A dispatch worker is being spawned.
    Starting,
    /// The dispatch worker is draining the queue.
    Running,
    /// A stop was requested; the worker is finishing the queue and publishes are dropped.
    Stopping,
}

impl State {
    /// Returns `true` while a dispatch worker is (or is about to be) alive.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, State::Starting | State::Running)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Stopped => write!(f, "stopped"),
            State::Starting => write!(f, "starting"),
            State::Running => write!(f, "running"),
            State::Stopping => write!(f, "stopping"),
        }
    }
}
