//! Built-in value generators.
//!
//! Each field of the form `{type: ..., ...params}` whose type names a
//! built-in is deserialized into a [`BuiltinGenerator`] once, when the schema
//! is compiled, and then invoked once per tick.

pub mod choice;
pub mod faker;
pub mod numeric;
pub mod pattern;
pub mod sequence;
pub mod timestamp;
pub mod uuid;

use crate::error::GeneratorError;
use rand::Rng;
use serde::{Deserialize, Deserializer};
use sequence::StateUpdate;
use sim_core::{StateStore, Value};
use timestamp::{TimeOffset, TimestampFormat, Timezone};

/// Names of the built-in generator types, in listing order.
pub const BUILTIN_TYPES: &[&str] = &[
    "static",
    "random_int",
    "random_float",
    "sequence",
    "sequence_int",
    "choice",
    "uuid",
    "gaussian",
    "timestamp",
    "stateful",
    "pattern",
    "bool",
    "null",
];

/// Configuration of a built-in generator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuiltinGenerator {
    /// Always the same value
    Static {
        #[serde(default)]
        value: serde_yaml::Value,
    },

    /// Uniform integer in `[min, max]`
    RandomInt {
        #[serde(default, alias = "min_val")]
        min: i64,
        #[serde(default = "default_int_max", alias = "max_val")]
        max: i64,
    },

    /// Uniform float in `[min, max]`, rounded
    RandomFloat {
        #[serde(default, alias = "min_val")]
        min: f64,
        #[serde(default = "default_float_max", alias = "max_val")]
        max: f64,
        #[serde(default = "default_precision")]
        precision: u32,
    },

    /// Integer counter kept in state
    #[serde(alias = "sequence_int")]
    Sequence {
        #[serde(default)]
        start: i64,
        #[serde(default = "default_step")]
        step: i64,
        /// Defaults to `sequence.<field>`
        #[serde(default)]
        state_key: Option<String>,
    },

    /// Weighted or uniform pick from a list
    Choice {
        values: Vec<serde_yaml::Value>,
        #[serde(default)]
        weights: Option<Vec<f64>>,
    },

    /// Random UUID v4 string
    Uuid,

    /// Normally distributed float, rounded
    Gaussian {
        #[serde(default)]
        mean: f64,
        #[serde(default = "default_stddev")]
        stddev: f64,
        #[serde(default = "default_precision")]
        precision: u32,
    },

    /// Current time, shifted and rendered
    Timestamp {
        #[serde(default = "default_timestamp_format")]
        format: String,
        #[serde(default)]
        custom_format: Option<String>,
        #[serde(default)]
        timezone: Timezone,
        #[serde(default)]
        offset: TimeOffset,
    },

    /// Arbitrary value kept in state and advanced by a named update
    Stateful {
        /// Defaults to `stateful.<field>`
        #[serde(default)]
        state_key: Option<String>,
        #[serde(default)]
        initial: serde_yaml::Value,
        #[serde(default, deserialize_with = "deserialize_update")]
        update: StateUpdate,
    },

    /// String with `{tick}`, `{uuid}` and `{rand:N}` placeholders
    Pattern { pattern: String },

    /// Boolean, true with the given probability
    Bool {
        #[serde(default = "default_probability")]
        probability: f64,
    },

    /// Always null
    Null,
}

fn default_int_max() -> i64 {
    100
}

fn default_float_max() -> f64 {
    1.0
}

fn default_precision() -> u32 {
    4
}

fn default_step() -> i64 {
    1
}

fn default_stddev() -> f64 {
    1.0
}

fn default_timestamp_format() -> String {
    "iso".to_string()
}

fn default_probability() -> f64 {
    0.5
}

/// Accept either a bare operation name (`update: toggle`) or a mapping
/// (`update: { op: add, by: 2 }`).
fn deserialize_update<'de, D>(deserializer: D) -> Result<StateUpdate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_yaml::Value::deserialize(deserializer)?;
    let raw = match raw {
        serde_yaml::Value::String(op) => {
            let mut mapping = serde_yaml::Mapping::new();
            mapping.insert("op".into(), op.into());
            serde_yaml::Value::Mapping(mapping)
        }
        other => other,
    };
    serde_yaml::from_value(raw).map_err(serde::de::Error::custom)
}

impl BuiltinGenerator {
    /// Build and validate a built-in generator for `field`.
    ///
    /// `kind` is the field's `type`; `params` the remaining keys. Per-field
    /// state keys are filled in here so that two sequences in one schema
    /// never share a counter.
    pub fn from_spec(
        field: &str,
        kind: &str,
        params: &serde_yaml::Mapping,
    ) -> Result<Self, GeneratorError> {
        let invalid = |reason: String| GeneratorError::InvalidParams {
            kind: kind.to_string(),
            reason,
        };

        let mut tagged = params.clone();
        tagged.insert("type".into(), kind.into());
        let mut generator: BuiltinGenerator =
            serde_yaml::from_value(serde_yaml::Value::Mapping(tagged))
                .map_err(|e| invalid(e.to_string()))?;

        match &mut generator {
            BuiltinGenerator::Sequence { state_key, .. } if state_key.is_none() => {
                *state_key = Some(format!("sequence.{field}"));
            }
            BuiltinGenerator::Stateful { state_key, .. } if state_key.is_none() => {
                *state_key = Some(format!("stateful.{field}"));
            }
            _ => {}
        }

        generator.validate().map_err(invalid)?;
        Ok(generator)
    }

    /// Check parameter consistency.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            BuiltinGenerator::RandomInt { min, max } if min > max => {
                Err(format!("'min' ({min}) must not exceed 'max' ({max})"))
            }
            BuiltinGenerator::RandomFloat { min, max, .. } => {
                if !min.is_finite() || !max.is_finite() {
                    Err("'min' and 'max' must be finite".to_string())
                } else if min > max {
                    Err(format!("'min' ({min}) must not exceed 'max' ({max})"))
                } else {
                    Ok(())
                }
            }
            BuiltinGenerator::Choice { values, weights } => {
                choice::validate_choice(values, weights.as_deref())
            }
            BuiltinGenerator::Gaussian { mean, stddev, .. } => {
                if !mean.is_finite() || !stddev.is_finite() || *stddev < 0.0 {
                    Err("'mean' must be finite and 'stddev' a non-negative number".to_string())
                } else {
                    Ok(())
                }
            }
            BuiltinGenerator::Timestamp {
                format,
                custom_format,
                offset,
                ..
            } => {
                TimestampFormat::resolve(format, custom_format.as_deref())?;
                offset
                    .to_delta()
                    .map(|_| ())
                    .ok_or_else(|| "'offset' is out of range".to_string())
            }
            BuiltinGenerator::Stateful { update, .. } => update.validate(),
            BuiltinGenerator::Bool { probability } if !(0.0..=1.0).contains(probability) => {
                Err(format!("'probability' ({probability}) must be within [0, 1]"))
            }
            _ => Ok(()),
        }
    }

    /// Type name as written in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            BuiltinGenerator::Static { .. } => "static",
            BuiltinGenerator::RandomInt { .. } => "random_int",
            BuiltinGenerator::RandomFloat { .. } => "random_float",
            BuiltinGenerator::Sequence { .. } => "sequence",
            BuiltinGenerator::Choice { .. } => "choice",
            BuiltinGenerator::Uuid => "uuid",
            BuiltinGenerator::Gaussian { .. } => "gaussian",
            BuiltinGenerator::Timestamp { .. } => "timestamp",
            BuiltinGenerator::Stateful { .. } => "stateful",
            BuiltinGenerator::Pattern { .. } => "pattern",
            BuiltinGenerator::Bool { .. } => "bool",
            BuiltinGenerator::Null => "null",
        }
    }

    /// Generate one value.
    pub fn generate<R: Rng>(
        &self,
        rng: &mut R,
        state: &mut StateStore,
        tick: u64,
    ) -> Result<Value, GeneratorError> {
        match self {
            BuiltinGenerator::Static { value } => Ok(Value::from_yaml(value)),

            BuiltinGenerator::RandomInt { min, max } => {
                Ok(numeric::generate_random_int(rng, *min, *max))
            }

            BuiltinGenerator::RandomFloat {
                min,
                max,
                precision,
            } => Ok(numeric::generate_random_float(rng, *min, *max, *precision)),

            BuiltinGenerator::Sequence {
                start,
                step,
                state_key,
            } => {
                let key = state_key.as_deref().unwrap_or("sequence");
                sequence::generate_sequence(state, key, *start, *step)
            }

            BuiltinGenerator::Choice { values, weights } => {
                Ok(choice::generate_choice(rng, values, weights.as_deref()))
            }

            BuiltinGenerator::Uuid => Ok(uuid::generate_uuid_v4(rng)),

            BuiltinGenerator::Gaussian {
                mean,
                stddev,
                precision,
            } => Ok(numeric::generate_gaussian(rng, *mean, *stddev, *precision)),

            BuiltinGenerator::Timestamp {
                format,
                custom_format,
                timezone,
                offset,
            } => {
                let format = TimestampFormat::resolve(format, custom_format.as_deref())
                    .map_err(|reason| GeneratorError::InvalidParams {
                        kind: "timestamp".to_string(),
                        reason,
                    })?;
                let offset = offset
                    .to_delta()
                    .ok_or_else(|| GeneratorError::Overflow("timestamp offset".to_string()))?;
                timestamp::generate_timestamp(&format, *timezone, offset)
            }

            BuiltinGenerator::Stateful {
                state_key,
                initial,
                update,
            } => {
                let key = state_key.as_deref().unwrap_or("stateful");
                sequence::generate_stateful(rng, state, key, &Value::from_yaml(initial), update)
            }

            BuiltinGenerator::Pattern { pattern } => {
                Ok(pattern::generate_pattern(pattern, rng, tick))
            }

            BuiltinGenerator::Bool { probability } => {
                Ok(numeric::generate_bool(rng, *probability))
            }

            BuiltinGenerator::Null => Ok(Value::Null),
        }
    }
}
