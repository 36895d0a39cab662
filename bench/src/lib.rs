//! Benchmark utilities for the Rusty event broker.
//!
//! This crate provides the benchmarking infrastructure for the broker:
//!
//! - **Microbenchmarks**: Individual operations (publish, register, remove)
//! - **Scenario benchmarks**: Realistic traffic shapes (fan-out, mixed types, contended publishers)
//! - **Latency tracking**: Publish-to-delivery time distribution
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p rusty_broker_bench
//!
//! # Run specific benchmark group
//! cargo bench -p rusty_broker_bench -- publish
//! ```
//!
//! # Benchmark Results
//!
//! Results are written to `target/criterion/` with HTML reports for visualization.

pub mod latency;
pub mod listeners;
pub mod scenarios;
