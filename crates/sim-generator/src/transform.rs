//! Transforms applied to dependent fields.
//!
//! A dependent field copies another field of the same record, optionally
//! passing it through one named transform. The set of transforms is closed;
//! anything beyond the built-ins is added with
//! [`GeneratorRegistry::register_transform`](crate::GeneratorRegistry::register_transform).

use crate::error::GeneratorError;
use crate::generators::numeric::round_to;
use crate::registry::GeneratorRegistry;
use sim_core::{TransformSpec, Value};
use std::fmt;
use std::sync::Arc;

/// Names of the built-in transforms, in listing order.
pub const BUILTIN_TRANSFORMS: &[&str] = &[
    "identity",
    "double",
    "negate",
    "abs",
    "to_upper",
    "to_lower",
    "to_string",
    "length",
    "round",
    "multiply",
    "add",
];

/// A user-registered transform.
pub trait TransformFn: Send + Sync {
    /// Map `input` to the dependent field's value.
    fn apply(&self, input: &Value, arg: Option<&Value>) -> Result<Value, GeneratorError>;
}

impl<F> TransformFn for F
where
    F: Fn(&Value, Option<&Value>) -> Result<Value, GeneratorError> + Send + Sync,
{
    fn apply(&self, input: &Value, arg: Option<&Value>) -> Result<Value, GeneratorError> {
        self(input, arg)
    }
}

/// A resolved transform.
#[derive(Clone)]
pub enum Transform {
    Identity,
    Double,
    Negate,
    Abs,
    ToUpper,
    ToLower,
    ToString,
    Length,
    /// Round floats to the given number of decimals
    Round(u32),
    Multiply(f64),
    Add(f64),
    /// Registered by name on the generator registry
    Registered {
        name: String,
        func: Arc<dyn TransformFn>,
        arg: Option<Value>,
    },
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Registered { name, arg, .. } => f
                .debug_struct("Registered")
                .field("name", name)
                .field("arg", arg)
                .finish(),
            Transform::Round(p) => write!(f, "Round({p})"),
            Transform::Multiply(x) => write!(f, "Multiply({x})"),
            Transform::Add(x) => write!(f, "Add({x})"),
            other => f.write_str(other.name()),
        }
    }
}

impl Transform {
    /// Resolve a configured transform by name.
    ///
    /// Registered transforms shadow built-ins of the same name. Errors name
    /// the problem; callers attach the stream and field.
    pub fn resolve(spec: &TransformSpec, registry: &GeneratorRegistry) -> Result<Self, String> {
        if let Some(func) = registry.transform(&spec.name) {
            return Ok(Transform::Registered {
                name: spec.name.clone(),
                func,
                arg: spec.arg.clone(),
            });
        }

        let no_arg = |t: Transform| match &spec.arg {
            None => Ok(t),
            Some(_) => Err(format!("transform '{}' takes no argument", spec.name)),
        };
        let number_arg = || {
            spec.arg
                .as_ref()
                .and_then(Value::as_f64)
                .filter(|x| x.is_finite())
                .ok_or_else(|| format!("transform '{}' requires a numeric argument", spec.name))
        };

        match spec.name.as_str() {
            "identity" => no_arg(Transform::Identity),
            "double" => no_arg(Transform::Double),
            "negate" => no_arg(Transform::Negate),
            "abs" => no_arg(Transform::Abs),
            "to_upper" | "upper" => no_arg(Transform::ToUpper),
            "to_lower" | "lower" => no_arg(Transform::ToLower),
            "to_string" | "string" => no_arg(Transform::ToString),
            "length" | "len" => no_arg(Transform::Length),
            "round" => match &spec.arg {
                None => Ok(Transform::Round(0)),
                Some(v) => v
                    .as_i64()
                    .and_then(|p| u32::try_from(p).ok())
                    .map(Transform::Round)
                    .ok_or_else(|| "transform 'round' takes a non-negative integer".to_string()),
            },
            "multiply" => number_arg().map(Transform::Multiply),
            "add" => number_arg().map(Transform::Add),
            other => Err(format!("unknown transform '{other}'")),
        }
    }

    /// Transform name for log lines.
    pub fn name(&self) -> &str {
        match self {
            Transform::Identity => "identity",
            Transform::Double => "double",
            Transform::Negate => "negate",
            Transform::Abs => "abs",
            Transform::ToUpper => "to_upper",
            Transform::ToLower => "to_lower",
            Transform::ToString => "to_string",
            Transform::Length => "length",
            Transform::Round(_) => "round",
            Transform::Multiply(_) => "multiply",
            Transform::Add(_) => "add",
            Transform::Registered { name, .. } => name,
        }
    }

    /// Apply to a source value. A null source stays null.
    pub fn apply(&self, input: &Value) -> Result<Value, GeneratorError> {
        if let Transform::Registered { func, arg, .. } = self {
            return func.apply(input, arg.as_ref());
        }
        if input.is_null() {
            return Ok(Value::Null);
        }

        let mismatch = || GeneratorError::Transform {
            transform: self.name().to_string(),
            input: input.kind(),
        };
        let overflow = || GeneratorError::Overflow(format!("transform '{}'", self.name()));

        match (self, input) {
            (Transform::Identity, v) => Ok(v.clone()),

            (Transform::Double, Value::Int(i)) => {
                i.checked_mul(2).map(Value::Int).ok_or_else(overflow)
            }
            (Transform::Double, Value::Float(f)) => Ok(Value::Float(f * 2.0)),

            (Transform::Negate, Value::Int(i)) => {
                i.checked_neg().map(Value::Int).ok_or_else(overflow)
            }
            (Transform::Negate, Value::Float(f)) => Ok(Value::Float(-f)),
            (Transform::Negate, Value::Bool(b)) => Ok(Value::Bool(!b)),

            (Transform::Abs, Value::Int(i)) => i.checked_abs().map(Value::Int).ok_or_else(overflow),
            (Transform::Abs, Value::Float(f)) => Ok(Value::Float(f.abs())),

            (Transform::ToUpper, Value::String(s)) => Ok(Value::String(s.to_uppercase())),
            (Transform::ToLower, Value::String(s)) => Ok(Value::String(s.to_lowercase())),

            (Transform::ToString, v) => Ok(Value::String(v.to_string())),

            (Transform::Length, Value::String(s)) => Ok(Value::Int(s.chars().count() as i64)),
            (Transform::Length, Value::Array(a)) => Ok(Value::Int(a.len() as i64)),
            (Transform::Length, Value::Object(o)) => Ok(Value::Int(o.len() as i64)),

            (Transform::Round(_), Value::Int(i)) => Ok(Value::Int(*i)),
            (Transform::Round(p), Value::Float(f)) => Ok(Value::Float(round_to(*f, *p))),

            (Transform::Multiply(x), Value::Int(i)) if x.fract() == 0.0 => {
                i.checked_mul(*x as i64).map(Value::Int).ok_or_else(overflow)
            }
            (Transform::Multiply(x), Value::Int(i)) => Ok(Value::Float(*i as f64 * x)),
            (Transform::Multiply(x), Value::Float(f)) => Ok(Value::Float(f * x)),

            (Transform::Add(x), Value::Int(i)) if x.fract() == 0.0 => {
                i.checked_add(*x as i64).map(Value::Int).ok_or_else(overflow)
            }
            (Transform::Add(x), Value::Int(i)) => Ok(Value::Float(*i as f64 + x)),
            (Transform::Add(x), Value::Float(f)) => Ok(Value::Float(f + x)),

            _ => Err(mismatch()),
        }
    }
}
