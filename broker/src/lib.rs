//! An in-process, thread-safe publish/subscribe event broker.
//!
//! A [`Broker`] decouples producers and consumers inside an application. Producers publish
//! events keyed by an [`EventType`] from any thread; a single dispatch worker drains a FIFO queue
//! and invokes every interested [`Listener`] synchronously, in order.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rusty_broker::{Broker, ListenerRef};
//!
//! let broker: Broker<String> = Broker::new();
//! let printer: ListenerRef<String> = Arc::new(|event_type: &_, payload: &String| {
//!     println!("{event_type}: {payload}");
//! });
//!
//! broker.add_listener("greeting", &printer, Duration::ZERO);
//! broker.start()?;
//! broker.publish("greeting", "hello".to_string(), None);
//! broker.stop()?;
//! ```
pub mod broker;
pub mod config;
pub mod error;
pub mod event;
pub mod listener;
pub mod publisher;
pub mod registry;
pub mod state;
pub mod time;

mod queue;
mod util;
mod worker;

pub use broker::Broker;
pub use config::{BrokerConfig, FailurePolicy};
pub use error::BrokerError;
pub use event::EventType;
pub use listener::{ChannelListener, Listener, ListenerRef};
pub use publisher::Publisher;
pub use registry::{BulkRegistration, Registration, Removal};
pub use state::State;
pub use time::{Clock, ManualClock, SystemClock};
