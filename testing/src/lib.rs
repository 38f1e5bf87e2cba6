//! # Marquee Testing
//!
//! Testing utilities for the Marquee booking platform:
//!
//! - [`ReducerTest`]: Given/When/Then harness for reducers
//! - [`mocks::FixedClock`]: deterministic time
//! - [`mocks::InMemoryEventStore`] / [`mocks::InMemoryEventBus`]: fast,
//!   broker-free infrastructure for integration tests

pub mod mocks;
pub mod reducer_test;

pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
