use crossbeam::channel::{Receiver, Sender, unbounded};

use crate::{event::EventType, listener::Listener};

/// A listener that forwards every delivered event into a channel.
///
/// The dispatch thread only pays for a clone and a channel send; the receiving side can take
/// as long as it likes on its own thread. Events delivered after the receiver is dropped are
/// discarded.
pub struct ChannelListener<P> {
    sender: Sender<(EventType, P)>,
}

impl<P> ChannelListener<P> {
    pub fn new(sender: Sender<(EventType, P)>) -> Self {
        Self { sender }
    }

    pub fn with_receiver() -> (Self, Receiver<(EventType, P)>) {
        let (sender, receiver) = unbounded();
        (Self::new(sender), receiver)
    }
}

impl<P> Listener<P> for ChannelListener<P>
where
    P: Clone + Send + Sync,
{
    fn handle_event(&self, event_type: &EventType, payload: &P) {
        let _ = self.sender.try_send((event_type.clone(), payload.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_events_in_order() {
        let (listener, receiver) = ChannelListener::<u32>::with_receiver();
        let event_type = EventType::new("count");

        listener.handle_event(&event_type, &1);
        listener.handle_event(&event_type, &2);

        assert_eq!(receiver.try_recv(), Ok((event_type.clone(), 1)));
        assert_eq!(receiver.try_recv(), Ok((event_type, 2)));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let (listener, receiver) = ChannelListener::<u32>::with_receiver();
        drop(receiver);

        listener.handle_event(&EventType::new("count"), &1);
    }
}
