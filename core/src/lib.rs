//! # Marquee Core
//!
//! Core traits and types for the Marquee booking platform.
//!
//! Marquee is built as a small event-driven system around the Reducer
//! pattern: all business logic lives in pure reducers, all I/O is described
//! as [`effect::Effect`] values executed by the store runtime, and all
//! dependencies reach the reducer through an injected Environment.
//!
//! ## Core Concepts
//!
//! - **State**: owned domain state for an aggregate
//! - **Action**: every input a reducer can receive (commands, events, results)
//! - **Reducer**: pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: a description of a side effect, not its execution
//! - **Environment**: injected dependencies behind traits
//!
//! Events produced by reducers are persisted through the [`event_store::EventStore`]
//! trait and distributed through [`event_bus::EventBus`]; both are deliberately
//! minimal so production and in-memory implementations stay interchangeable.

pub mod effect;
pub mod environment;
pub mod event;
pub mod event_bus;
pub mod event_store;
pub mod projection;
pub mod reducer;
pub mod stream;

mod effect_macros;

// Re-export commonly used types so aggregates can take everything from one place.
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};
