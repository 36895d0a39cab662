use std::{any::Any, fmt, io};

/// Errors raised by the broker lifecycle.
///
/// Expected outcomes of registration and publication (duplicates, missing subscriptions, events
/// nobody listens to) are reported as plain return values and never show up here.
#[derive(Debug)]
pub enum BrokerError {
    /// The operating system refused to spawn the dispatch worker.
    Spawn(io::Error),
    /// The dispatch worker died from a listener panic. The broker was still stopped and reset.
    WorkerPanicked(String),
    /// `stop()` was called from a listener callback, i.e. on the dispatch thread itself.
    StopFromWorker,
}

impl BrokerError {
    /// Build a [`BrokerError::WorkerPanicked`] from a thread's panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        BrokerError::WorkerPanicked(panic_message(payload.as_ref()))
    }
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::Spawn(err) => write!(f, "unable to spawn dispatch worker: {err}"),
            BrokerError::WorkerPanicked(msg) => write!(f, "dispatch worker panicked: {msg}"),
            BrokerError::StopFromWorker => {
                write!(f, "broker cannot be stopped from its own dispatch thread")
            }
        }
    }
}

impl std::error::Error for BrokerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrokerError::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_from_str_and_string() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(format!("boom {}", 2));
        assert_eq!(panic_message(payload.as_ref()), "boom 2");

        let payload: Box<dyn Any + Send> = Box::new(17_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }

    #[test]
    fn display_names_the_failure() {
        let err = BrokerError::from_panic(Box::new("listener exploded"));
        assert_eq!(err.to_string(), "dispatch worker panicked: listener exploded");
    }
}
