//! Stateful generators.
//!
//! These are the only generators that touch the stream's [`StateStore`]:
//! each one reads a value under its key, returns it, and writes the advanced
//! value back for the next tick.

use crate::error::GeneratorError;
use rand::Rng;
use serde::Deserialize;
use sim_core::{StateStore, Value};

/// Read-and-advance an integer sequence stored under `key`.
///
/// The first call returns `start`; each following call returns the previous
/// value plus `step`.
pub fn generate_sequence(
    state: &mut StateStore,
    key: &str,
    start: i64,
    step: i64,
) -> Result<Value, GeneratorError> {
    let current = match state.get(key) {
        None => start,
        Some(v) => v.as_i64().ok_or_else(|| GeneratorError::State {
            key: key.to_string(),
            expected: "int",
            found: v.kind(),
        })?,
    };
    let next = current
        .checked_add(step)
        .ok_or_else(|| GeneratorError::Overflow(format!("sequence '{key}'")))?;
    state.set(key, Value::Int(next));
    Ok(Value::Int(current))
}

/// How a stateful value advances after each read.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StateUpdate {
    /// Keep the value unchanged
    #[default]
    None,

    /// Add a constant
    Add {
        #[serde(default = "default_add")]
        by: f64,
    },

    /// Multiply by a constant
    Multiply { factor: f64 },

    /// Add a uniformly random step, optionally clamped
    RandomWalk {
        /// Largest absolute step
        max_step: f64,
        /// Lower clamp
        #[serde(default)]
        min: Option<f64>,
        /// Upper clamp
        #[serde(default)]
        max: Option<f64>,
    },

    /// Flip a boolean
    Toggle,
}

fn default_add() -> f64 {
    1.0
}

impl StateUpdate {
    /// Check parameters once, when the schema is compiled.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StateUpdate::Add { by } if !by.is_finite() => Err("'by' must be finite".to_string()),
            StateUpdate::Multiply { factor } if !factor.is_finite() => {
                Err("'factor' must be finite".to_string())
            }
            StateUpdate::RandomWalk { max_step, min, max } => {
                if !max_step.is_finite() || *max_step < 0.0 {
                    return Err("'max_step' must be a non-negative number".to_string());
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err("'min' must not exceed 'max'".to_string());
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Compute the value that follows `current`.
    pub fn apply<R: Rng>(
        &self,
        rng: &mut R,
        key: &str,
        current: &Value,
    ) -> Result<Value, GeneratorError> {
        let numeric = |v: &Value| {
            v.as_f64().ok_or_else(|| GeneratorError::State {
                key: key.to_string(),
                expected: "number",
                found: v.kind(),
            })
        };

        match self {
            StateUpdate::None => Ok(current.clone()),
            StateUpdate::Add { by } => match current {
                Value::Int(i) if by.fract() == 0.0 => i
                    .checked_add(*by as i64)
                    .map(Value::Int)
                    .ok_or_else(|| GeneratorError::Overflow(format!("stateful '{key}'"))),
                other => Ok(Value::Float(numeric(other)? + by)),
            },
            StateUpdate::Multiply { factor } => match current {
                Value::Int(i) if factor.fract() == 0.0 => i
                    .checked_mul(*factor as i64)
                    .map(Value::Int)
                    .ok_or_else(|| GeneratorError::Overflow(format!("stateful '{key}'"))),
                other => Ok(Value::Float(numeric(other)? * factor)),
            },
            StateUpdate::RandomWalk { max_step, min, max } => {
                let step = if *max_step > 0.0 {
                    rng.random_range(-max_step..=*max_step)
                } else {
                    0.0
                };
                let mut next = numeric(current)? + step;
                if let Some(lo) = min {
                    next = next.max(*lo);
                }
                if let Some(hi) = max {
                    next = next.min(*hi);
                }
                Ok(Value::Float(next))
            }
            StateUpdate::Toggle => match current {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(GeneratorError::State {
                    key: key.to_string(),
                    expected: "bool",
                    found: other.kind(),
                }),
            },
        }
    }
}

/// Read the value under `key` (seeding it with `initial` on first use),
/// return it, and store the updated value.
pub fn generate_stateful<R: Rng>(
    rng: &mut R,
    state: &mut StateStore,
    key: &str,
    initial: &Value,
    update: &StateUpdate,
) -> Result<Value, GeneratorError> {
    let current = state.get(key).cloned().unwrap_or_else(|| initial.clone());
    let next = update.apply(rng, key, &current)?;
    state.set(key, next);
    Ok(current)
}
