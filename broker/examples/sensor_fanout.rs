//! A sensor publishing readings to a rate-limited display and a channel-backed recorder.
//!
//! Run with `cargo run --example sensor_fanout`.
use std::{sync::Arc, thread, time::Duration};

use rusty_broker::{Broker, ChannelListener, EventType, Listener, ListenerRef};

#[derive(Debug, Clone)]
enum Reading {
    Speed(f32),
    Heading(u16),
}

/// Prints whatever it is told, but no more than a few times a second.
struct Display;

impl Listener<Reading> for Display {
    fn handle_event(&self, event_type: &EventType, payload: &Reading) {
        println!("[display] {event_type}: {payload:?}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let broker: Arc<Broker<Reading>> = Arc::new(Broker::new());

    let display: ListenerRef<Reading> = Arc::new(Display);
    let _ = broker.add_listener_for_all(["speed", "heading"], &display, Duration::from_millis(200));

    // The recorder does its work on its own thread.
    let (recorder, readings) = ChannelListener::<Reading>::with_receiver();
    let recorder: ListenerRef<Reading> = Arc::new(recorder);
    let _ = broker.add_listener("speed", &recorder, Duration::ZERO);
    let writer = thread::spawn(move || readings.iter().count());

    broker.start()?;
    let sensor = broker.publisher(None);
    for tick in 0..50_u16 {
        sensor.publish("speed", Reading::Speed(f32::from(tick) * 0.5));
        if tick % 10 == 0 {
            sensor.publish("heading", Reading::Heading(tick * 7 % 360));
        }
        thread::sleep(Duration::from_millis(20));
    }
    broker.stop()?;

    // Stopping drops the broker's subscriptions, and with them the recorder's sender.
    drop(recorder);
    let recorded = writer.join().map_err(|_| "recorder thread panicked")?;
    println!("[recorder] stored {recorded} speed readings");
    Ok(())
}
