//! Core types for stream-sim.
//!
//! This crate provides the foundational types shared by the generator,
//! output and scheduler crates:
//!
//! - [`Value`] and [`Record`] - field values and the ordered record built once per tick
//! - [`StateStore`] - per-stream mutable state surviving across ticks
//! - [`StreamDefinition`] - validated description of a stream
//! - [`SimulationConfig`] - YAML/JSON configuration loader
//!
//! # Architecture
//!
//! ```text
//! sim-core (this crate)
//!    │
//!    ├─── sim-generator   (compiles schemas, synthesizes records)
//!    ├─── sim-output      (formats records, sends them to sinks)
//!    └─── sim-scheduler   (per-stream timing loops, event injection)
//! ```

pub mod config;
pub mod error;
pub mod state;
pub mod stream;
pub mod values;

// Re-exports for convenience
pub use config::{merge_mappings, SimulationConfig, DEFAULT_STREAM_NAME};
pub use error::ConfigError;
pub use state::StateStore;
pub use stream::{
    EventTrigger, FieldSpec, Schema, SinkSpec, StreamDefinition, TransformSpec, TriggerCondition,
};
pub use values::{Record, Value};
