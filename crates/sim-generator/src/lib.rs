//! Record generator for stream-sim.
//!
//! This crate turns a stream's schema into one [`Record`](sim_core::Record)
//! per tick. Schemas are compiled once against a [`GeneratorRegistry`]; each
//! compiled [`RecordGenerator`] owns the stream's RNG, seeded when the stream
//! configures a `seed`.
//!
//! # Architecture
//!
//! ```text
//! StreamDefinition.schema     GeneratorRegistry
//!            │                  (built-ins, external fns,
//!            │                   transforms, FakeProvider)
//!            ▼                         │
//! ┌───────────────────────┐            │
//! │    RecordGenerator    │◄───────────┘
//! │                       │
//! │  pass 1: independent  │◄──── StateStore (sequence / stateful)
//! │  pass 2: dependent    │
//! └──────────┬────────────┘
//!            ▼
//!     Record (schema order)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sim_core::{SimulationConfig, StateStore, Value};
//! use sim_generator::{GeneratorRegistry, RecordGenerator};
//!
//! let config = SimulationConfig::from_yaml(r#"
//! rate: 5
//! seed: 42
//! schema:
//!   id: { type: sequence, start: 1 }
//!   price: { type: random_float, min: 1.0, max: 10.0, precision: 2 }
//!   doubled: { type: dependent, field: id, transform: double }
//! outputs:
//!   - { type: stdout, format: json }
//! "#).unwrap();
//!
//! let registry = GeneratorRegistry::with_builtins();
//! let mut generator = RecordGenerator::compile(&config.streams[0], &registry).unwrap();
//! let mut state = StateStore::new();
//!
//! let record = generator.generate(&mut state, 1);
//! assert_eq!(record.get("id"), Some(&Value::Int(1)));
//! assert_eq!(record.get("doubled"), Some(&Value::Int(2)));
//! ```
//!
//! # Generators
//!
//! - `static` - A fixed value
//! - `random_int` / `random_float` - Uniform numbers in a range
//! - `gaussian` - Normally distributed floats
//! - `sequence` - Counter kept in state
//! - `stateful` - Arbitrary state value advanced by a named update
//! - `choice` - Weighted or uniform pick from a list
//! - `uuid` - Random UUID v4
//! - `timestamp` - Current time as ISO, epoch or strftime
//! - `pattern` - Strings with `{tick}`, `{uuid}`, `{rand:N}`
//! - `bool` / `null`
//! - `faker` - Delegated to a registered [`FakeProvider`]

pub mod error;
pub mod generators;
pub mod record;
pub mod registry;
pub mod transform;

pub use error::GeneratorError;
pub use generators::faker::{BasicFakeProvider, FakeProvider};
pub use generators::sequence::StateUpdate;
pub use generators::BuiltinGenerator;
pub use record::RecordGenerator;
pub use registry::{GeneratorFn, GeneratorRegistry};
pub use transform::{Transform, TransformFn};
