//! Stream definitions.
//!
//! These are the validated, immutable descriptions of each stream as produced
//! by the configuration loader. Everything here is plain data; compiling a
//! schema against a generator registry and opening sinks happen in the
//! generator and output crates.

use crate::values::{Record, Value};
use std::time::Duration;

// ============================================================================
// Schema
// ============================================================================

/// How a single field of a record is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// A literal value copied into every record.
    Literal(Value),

    /// A generator function selected by `type`.
    Generator {
        /// Generator type name (the `type` key)
        kind: String,
        /// Remaining keys of the field mapping
        params: serde_yaml::Mapping,
    },

    /// A value derived from another field of the same record.
    Dependent {
        /// Source field name
        field: String,
        /// Optional transform applied to the source value
        transform: Option<TransformSpec>,
    },
}

impl FieldSpec {
    /// Whether this field is resolved in the dependent pass.
    pub fn is_dependent(&self) -> bool {
        matches!(self, FieldSpec::Dependent { .. })
    }
}

/// A named transform with an optional argument.
///
/// Written either as a bare name (`transform: double`) or as a single-key
/// mapping (`transform: { multiply: 2.5 }`).
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSpec {
    /// Transform name
    pub name: String,
    /// Transform argument, if any
    pub arg: Option<Value>,
}

impl TransformSpec {
    /// A transform without an argument.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg: None,
        }
    }
}

/// Ordered field-name → spec list.
pub type Schema = Vec<(String, FieldSpec)>;

// ============================================================================
// Events
// ============================================================================

/// A predicate over the tick count.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerCondition {
    /// Fires when the tick count equals the value.
    AtCount(u64),

    /// Fires when `tick % every == offset`.
    EveryCount {
        /// Period in ticks (never zero)
        every: u64,
        /// Remainder to match
        offset: u64,
    },

    /// Fires with the given probability, drawn independently per tick.
    Probability(f64),
}

/// A configured event: predicates paired with a literal override record.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTrigger {
    /// Optional name used in logs
    pub name: Option<String>,
    /// Predicates; the trigger fires if any of them is true
    pub conditions: Vec<TriggerCondition>,
    /// Record emitted in place of a generated one
    pub record: Record,
    /// Why the trigger was rejected at load time; such triggers never fire
    pub defect: Option<String>,
}

impl EventTrigger {
    /// A well-formed trigger.
    pub fn new(conditions: Vec<TriggerCondition>, record: Record) -> Self {
        Self {
            name: None,
            conditions,
            record,
            defect: None,
        }
    }

    /// A trigger kept in place but disabled because it could not be parsed.
    pub fn malformed(name: Option<String>, defect: impl Into<String>) -> Self {
        Self {
            name,
            conditions: Vec::new(),
            record: Record::new(),
            defect: Some(defect.into()),
        }
    }

    /// Whether this trigger was rejected at load time.
    pub fn is_malformed(&self) -> bool {
        self.defect.is_some()
    }

    /// Label for log lines.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// An output destination as written in the configuration.
///
/// The sink-specific keys stay as raw YAML; the output crate parses them when
/// the sink is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSpec {
    /// Sink type (`stdout`, `file`, `http`, `kafka`, ...)
    pub kind: String,
    /// Format name (`json`, `csv`, ...)
    pub format: String,
    /// Remaining keys of the output mapping
    pub params: serde_yaml::Mapping,
}

// ============================================================================
// Stream
// ============================================================================

/// Complete, validated description of one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDefinition {
    /// Stream name
    pub name: String,
    /// Ordered field specs
    pub schema: Schema,
    /// Records per second (> 0)
    pub rate: f64,
    /// Fractional pacing jitter (>= 0)
    pub jitter: f64,
    /// Ordered event triggers
    pub events: Vec<EventTrigger>,
    /// Ordered outputs (non-empty)
    pub outputs: Vec<SinkSpec>,
    /// Snapshot seeded into the stream's state at start
    pub initial_state: Vec<(String, Value)>,
    /// Seed for reproducible randomness
    pub seed: Option<u64>,
}

impl StreamDefinition {
    /// Time between ticks without jitter.
    pub fn base_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate)
    }
}
