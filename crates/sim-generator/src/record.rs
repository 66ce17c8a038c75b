//! Record synthesis.
//!
//! A [`RecordGenerator`] is compiled once per stream from its schema and a
//! [`GeneratorRegistry`], then asked for one record per tick:
//!
//! 1. Independent fields, in schema order: literals are copied, typed fields
//!    invoke their generator. A generator that fails yields null.
//! 2. Dependent fields, in schema order: the source field is looked up among
//!    the values produced in step 1 and passed through the transform. A
//!    source that is missing or itself dependent yields null.
//!
//! The record keeps schema order whatever pass produced each value.

use crate::error::GeneratorError;
use crate::generators::faker::FakeProvider;
use crate::generators::BuiltinGenerator;
use crate::registry::{GeneratorFn, GeneratorRegistry, Resolved, FAKER_TYPE};
use crate::transform::Transform;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_yaml::Mapping;
use sim_core::{ConfigError, FieldSpec, Record, Schema, StateStore, StreamDefinition, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Faker method used when a field names none.
const DEFAULT_FAKER_METHOD: &str = "name";

/// How one field is produced each tick.
enum FieldPlan {
    Literal(Value),
    Builtin(BuiltinGenerator),
    Faker {
        provider: Arc<dyn FakeProvider>,
        method: String,
        params: Mapping,
    },
    External {
        kind: String,
        func: Arc<dyn GeneratorFn>,
        params: Mapping,
    },
    /// Rejected at compile time; always null
    Unresolvable(GeneratorError),
    Dependent {
        source: String,
        transform: Option<Transform>,
    },
}

impl FieldPlan {
    fn is_dependent(&self) -> bool {
        matches!(self, FieldPlan::Dependent { .. })
    }
}

/// Schema compiled against a registry, plus the stream's RNG.
pub struct RecordGenerator {
    stream: String,
    fields: Vec<(String, FieldPlan)>,
    rng: StdRng,
}

impl RecordGenerator {
    /// Compile a stream's schema.
    ///
    /// Unknown generator types and rejected parameters are logged here and
    /// produce null on every tick. Unknown transforms and a `faker` field
    /// without a registered provider are configuration errors.
    pub fn compile(
        definition: &StreamDefinition,
        registry: &GeneratorRegistry,
    ) -> Result<Self, ConfigError> {
        Self::from_schema(&definition.name, &definition.schema, registry, definition.seed)
    }

    /// Compile a bare schema.
    pub fn from_schema(
        stream: &str,
        schema: &Schema,
        registry: &GeneratorRegistry,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let mut fields = Vec::with_capacity(schema.len());

        for (name, spec) in schema {
            let plan = match spec {
                FieldSpec::Literal(value) => FieldPlan::Literal(value.clone()),

                FieldSpec::Dependent { field, transform } => {
                    let transform = transform
                        .as_ref()
                        .map(|t| Transform::resolve(t, registry))
                        .transpose()
                        .map_err(|e| ConfigError::field(stream, name, e))?;

                    match schema.iter().find(|(n, _)| n == field) {
                        None => warn!(
                            "Stream '{stream}': field '{name}' depends on '{field}', which is not in the schema"
                        ),
                        Some((_, source)) if source.is_dependent() => warn!(
                            "Stream '{stream}': field '{name}' depends on dependent field '{field}'; it will always be null"
                        ),
                        Some(_) => {}
                    }

                    FieldPlan::Dependent {
                        source: field.clone(),
                        transform,
                    }
                }

                FieldSpec::Generator { kind, params } => {
                    compile_generator(stream, name, kind, params, registry)?
                }
            };
            fields.push((name.clone(), plan));
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            stream: stream.to_string(),
            fields,
            rng,
        })
    }

    /// Stream this generator belongs to.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Number of fields in each record.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Synthesize the record for `tick`.
    pub fn generate(&mut self, state: &mut StateStore, tick: u64) -> Record {
        let mut values: Vec<Value> = vec![Value::Null; self.fields.len()];

        // Pass 1: independent fields
        let mut partial = Record::with_capacity(self.fields.len());
        for (idx, (name, plan)) in self.fields.iter().enumerate() {
            if plan.is_dependent() {
                continue;
            }
            let value = match plan {
                FieldPlan::Literal(value) => Ok(value.clone()),
                FieldPlan::Builtin(generator) => generator.generate(&mut self.rng, state, tick),
                FieldPlan::Faker {
                    provider,
                    method,
                    params,
                } => provider.fake(method, params, &mut self.rng),
                FieldPlan::External { func, params, .. } => func.generate(params, state, tick),
                FieldPlan::Unresolvable(error) => {
                    debug!("Stream '{}': field '{name}' is null: {error}", self.stream);
                    Ok(Value::Null)
                }
                FieldPlan::Dependent { .. } => continue,
            };
            let value = value.unwrap_or_else(|e| {
                warn!(
                    "Stream '{}': generator for field '{name}' failed at tick {tick}: {e}",
                    self.stream
                );
                Value::Null
            });
            partial.insert(name.clone(), value.clone());
            values[idx] = value;
        }

        // Pass 2: dependent fields, looked up in pass-1 output only
        for (idx, (name, plan)) in self.fields.iter().enumerate() {
            let FieldPlan::Dependent { source, transform } = plan else {
                continue;
            };
            let Some(input) = partial.get(source) else {
                warn!(
                    "Stream '{}': dependent field '{name}' has no source value '{source}'",
                    self.stream
                );
                continue;
            };
            values[idx] = match transform {
                None => input.clone(),
                Some(transform) => transform.apply(input).unwrap_or_else(|e| {
                    warn!(
                        "Stream '{}': transform for field '{name}' failed at tick {tick}: {e}",
                        self.stream
                    );
                    Value::Null
                }),
            };
        }

        self.fields
            .iter()
            .map(|(name, _)| name.clone())
            .zip(values)
            .collect()
    }
}

fn compile_generator(
    stream: &str,
    field: &str,
    kind: &str,
    params: &Mapping,
    registry: &GeneratorRegistry,
) -> Result<FieldPlan, ConfigError> {
    let plan = match registry.resolve(kind) {
        Resolved::External(func) => FieldPlan::External {
            kind: kind.to_string(),
            func,
            params: params.clone(),
        },

        Resolved::Faker(provider) => {
            let method = match params.get("method") {
                None => DEFAULT_FAKER_METHOD.to_string(),
                Some(serde_yaml::Value::String(m)) => m.clone(),
                Some(_) => {
                    return Err(ConfigError::field(stream, field, "'method' must be a string"))
                }
            };
            if provider.supports(&method) {
                let mut params = params.clone();
                params.remove("method");
                FieldPlan::Faker {
                    provider,
                    method,
                    params,
                }
            } else {
                let error = GeneratorError::InvalidParams {
                    kind: FAKER_TYPE.to_string(),
                    reason: format!("unknown method '{method}'"),
                };
                warn!("Stream '{stream}': field '{field}' will be null: {error}");
                FieldPlan::Unresolvable(error)
            }
        }

        Resolved::FakerUnavailable => {
            return Err(ConfigError::unavailable(
                stream,
                FAKER_TYPE,
                format!("field '{field}' uses faker but no fake provider is registered"),
            ))
        }

        Resolved::Builtin => match BuiltinGenerator::from_spec(field, kind, params) {
            Ok(generator) => FieldPlan::Builtin(generator),
            Err(error) => {
                warn!("Stream '{stream}': field '{field}' will be null: {error}");
                FieldPlan::Unresolvable(error)
            }
        },

        Resolved::Unknown => {
            let error = GeneratorError::UnknownType(kind.to_string());
            warn!("Stream '{stream}': field '{field}' will be null: {error}");
            FieldPlan::Unresolvable(error)
        }
    };

    if let FieldPlan::External { kind, .. } = &plan {
        debug!("Stream '{stream}': field '{field}' uses external generator '{kind}'");
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::faker::BasicFakeProvider;
    use sim_core::SimulationConfig;

    fn definition(yaml: &str) -> StreamDefinition {
        let config = SimulationConfig::from_yaml(yaml).unwrap();
        config.streams.into_iter().next().unwrap()
    }

    fn compile(yaml: &str) -> RecordGenerator {
        RecordGenerator::compile(&definition(yaml), &GeneratorRegistry::with_builtins()).unwrap()
    }

    #[test]
    fn test_dependent_double() {
        let mut generator = compile(
            r#"
rate: 10
seed: 1
schema:
  a: { type: random_int, min: 0, max: 0 }
  b: { type: dependent, field: a, transform: double }
outputs:
  - { type: stdout, format: json }
"#,
        );
        let mut state = StateStore::new();
        let record = generator.generate(&mut state, 1);

        let a = record.get("a").unwrap().as_i64().unwrap();
        let b = record.get("b").unwrap().as_i64().unwrap();
        assert_eq!(b, 2 * a);
    }

    #[test]
    fn test_dependent_random_source() {
        let mut generator = compile(
            r#"
rate: 10
seed: 3
schema:
  a: { type: random_int, min: -1000, max: 1000 }
  b: { type: dependent, field: a, transform: double }
outputs:
  - { type: stdout, format: json }
"#,
        );
        let mut state = StateStore::new();
        for tick in 1..=50 {
            let record = generator.generate(&mut state, tick);
            let a = record.get("a").unwrap().as_i64().unwrap();
            assert_eq!(record.get("b"), Some(&Value::Int(2 * a)));
        }
    }

    #[test]
    fn test_dependent_may_precede_its_source() {
        let mut generator = compile(
            r#"
rate: 10
schema:
  copy: { type: dependent, field: name }
  name: alice
outputs:
  - { type: stdout, format: json }
"#,
        );
        let mut state = StateStore::new();
        let record = generator.generate(&mut state, 1);
        assert_eq!(record.field_names(), vec!["copy", "name"]);
        assert_eq!(record.get("copy"), Some(&Value::from("alice")));
    }

    #[test]
    fn test_no_transitive_dependencies() {
        let mut generator = compile(
            r#"
rate: 10
schema:
  a: 1
  b: { type: dependent, field: a }
  c: { type: dependent, field: b }
  d: { type: dependent, field: missing }
outputs:
  - { type: stdout, format: json }
"#,
        );
        let mut state = StateStore::new();
        let record = generator.generate(&mut state, 1);
        assert_eq!(record.get("b"), Some(&Value::Int(1)));
        assert_eq!(record.get("c"), Some(&Value::Null));
        assert_eq!(record.get("d"), Some(&Value::Null));
    }

    #[test]
    fn test_sequence_across_ticks() {
        let mut generator = compile(
            r#"
rate: 10
schema:
  id: { type: sequence }
  by_five: { type: sequence, step: 5 }
outputs:
  - { type: stdout, format: json }
"#,
        );
        let mut state = StateStore::new();
        for k in 1..=20i64 {
            let record = generator.generate(&mut state, k as u64);
            assert_eq!(record.get("id"), Some(&Value::Int(k - 1)));
            assert_eq!(record.get("by_five"), Some(&Value::Int(5 * (k - 1))));
        }
    }

    #[test]
    fn test_unknown_type_and_bad_params_yield_null() {
        let mut generator = compile(
            r#"
rate: 10
schema:
  x: { type: does_not_exist }
  y: { type: random_int, min: 9, max: 1 }
  z: 3
outputs:
  - { type: stdout, format: json }
"#,
        );
        let mut state = StateStore::new();
        let record = generator.generate(&mut state, 1);
        assert_eq!(record.get("x"), Some(&Value::Null));
        assert_eq!(record.get("y"), Some(&Value::Null));
        assert_eq!(record.get("z"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_unknown_transform_is_config_error() {
        let def = definition(
            r#"
rate: 10
schema:
  a: 1
  b: { type: dependent, field: a, transform: lambda }
outputs:
  - { type: stdout, format: json }
"#,
        );
        let result = RecordGenerator::compile(&def, &GeneratorRegistry::with_builtins());
        assert!(matches!(result, Err(ConfigError::InvalidField { .. })));
    }

    #[test]
    fn test_faker_requires_provider() {
        let def = definition(
            r#"
rate: 10
schema:
  who: { type: faker, method: name }
outputs:
  - { type: stdout, format: json }
"#,
        );
        let mut registry = GeneratorRegistry::with_builtins();
        assert!(matches!(
            RecordGenerator::compile(&def, &registry),
            Err(ConfigError::Unavailable { .. })
        ));

        registry.set_fake_provider(Arc::new(BasicFakeProvider::new()));
        let mut generator = RecordGenerator::compile(&def, &registry).unwrap();
        let record = generator.generate(&mut StateStore::new(), 1);
        assert!(record.get("who").unwrap().as_str().unwrap().contains(' '));
    }

    #[test]
    fn test_external_generator_sees_tick_and_state() {
        let def = definition(
            r#"
rate: 10
schema:
  t: { type: tick_echo, scale: 10 }
outputs:
  - { type: stdout, format: json }
"#,
        );
        let mut registry = GeneratorRegistry::with_builtins();
        registry.register(
            "tick_echo",
            |params: &Mapping, state: &mut StateStore, tick: u64| -> Result<Value, GeneratorError> {
                let scale = params.get("scale").and_then(|v| v.as_i64()).unwrap_or(1);
                state.set("echo.last", Value::Int(tick as i64));
                Ok(Value::Int(tick as i64 * scale))
            },
        );
        let mut generator = RecordGenerator::compile(&def, &registry).unwrap();
        let mut state = StateStore::new();

        assert_eq!(
            generator.generate(&mut state, 4).get("t"),
            Some(&Value::Int(40))
        );
        assert_eq!(state.get("echo.last"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_failing_external_generator_yields_null() {
        let def = definition(
            r#"
rate: 10
schema:
  bad: { type: broken }
  ok: 1
outputs:
  - { type: stdout, format: json }
"#,
        );
        let mut registry = GeneratorRegistry::with_builtins();
        registry.register(
            "broken",
            |_: &Mapping, _: &mut StateStore, _: u64| -> Result<Value, GeneratorError> {
                Err(GeneratorError::external("upstream unavailable"))
            },
        );
        let mut generator = RecordGenerator::compile(&def, &registry).unwrap();
        let record = generator.generate(&mut StateStore::new(), 1);
        assert_eq!(record.get("bad"), Some(&Value::Null));
        assert_eq!(record.get("ok"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_seeded_streams_are_reproducible() {
        let yaml = r#"
rate: 10
seed: 99
schema:
  n: { type: random_int, min: 0, max: 1000000 }
  f: { type: gaussian, mean: 0, stddev: 10 }
  id: { type: uuid }
outputs:
  - { type: stdout, format: json }
"#;
        let mut a = compile(yaml);
        let mut b = compile(yaml);
        for tick in 1..=5 {
            assert_eq!(
                a.generate(&mut StateStore::new(), tick),
                b.generate(&mut StateStore::new(), tick)
            );
        }
    }
}
