//! Configuration loading and validation.
//!
//! A configuration is a YAML or JSON document in one of two shapes:
//!
//! ```yaml
//! # Multi-stream form
//! global:
//!   jitter: 0.1
//! streams:
//!   sensors:
//!     rate: 10
//!     schema:
//!       id: { type: uuid }
//!       reading: { type: gaussian, mean: 20, stddev: 2 }
//!     outputs:
//!       - { type: stdout, format: json }
//! ```
//!
//! or, without a `streams` key, a single stream named `default` whose keys
//! sit at the top level. Keys under `global` are deep-merged beneath every
//! stream; the stream's own keys win.

use crate::error::ConfigError;
use crate::stream::{
    EventTrigger, FieldSpec, Schema, SinkSpec, StreamDefinition, TransformSpec, TriggerCondition,
};
use crate::values::{Record, Value};
use serde_yaml::{Mapping, Value as YamlValue};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Name given to the stream of a single-stream configuration.
pub const DEFAULT_STREAM_NAME: &str = "default";

/// Parsed and validated simulation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Streams in document order
    pub streams: Vec<StreamDefinition>,
}

impl SimulationConfig {
    /// Load a configuration from a `.yaml`, `.yml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            other => Err(ConfigError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                format!(".{other}")
            })),
        }
    }

    /// Parse a configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let doc: YamlValue = serde_yaml::from_str(content)?;
        Self::from_document(doc)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let json: serde_json::Value = serde_json::from_str(content)?;
        let doc = serde_yaml::to_value(json)?;
        Self::from_document(doc)
    }

    /// Build a configuration from an already parsed document.
    pub fn from_document(doc: YamlValue) -> Result<Self, ConfigError> {
        let YamlValue::Mapping(root) = doc else {
            return Err(ConfigError::Invalid(
                "configuration root must be a mapping".to_string(),
            ));
        };

        let global = match root.get("global") {
            None | Some(YamlValue::Null) => Mapping::new(),
            Some(YamlValue::Mapping(m)) => m.clone(),
            Some(_) => {
                return Err(ConfigError::Invalid(
                    "'global' must be a mapping".to_string(),
                ))
            }
        };

        let mut streams = Vec::new();

        if let Some(raw_streams) = root.get("streams") {
            let YamlValue::Mapping(raw_streams) = raw_streams else {
                return Err(ConfigError::Invalid(
                    "'streams' must be a mapping".to_string(),
                ));
            };
            if raw_streams.is_empty() {
                return Err(ConfigError::Invalid(
                    "'streams' must define at least one stream".to_string(),
                ));
            }
            for (key, raw) in raw_streams {
                let name = key.as_str().ok_or_else(|| {
                    ConfigError::Invalid(format!("stream names must be strings, got {key:?}"))
                })?;
                let YamlValue::Mapping(raw) = raw else {
                    return Err(ConfigError::stream(name, "stream config must be a mapping"));
                };
                let merged = merge_mappings(&global, raw);
                streams.push(parse_stream(name, &merged)?);
            }
        } else {
            let mut single = root.clone();
            single.remove("global");
            let merged = merge_mappings(&global, &single);
            streams.push(parse_stream(DEFAULT_STREAM_NAME, &merged)?);
        }

        debug!("Parsed configuration with {} stream(s)", streams.len());
        Ok(Self { streams })
    }

    /// Get a stream by name.
    pub fn stream(&self, name: &str) -> Option<&StreamDefinition> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// All stream names in document order.
    pub fn stream_names(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Deep-merge two mappings; values from `overlay` take precedence and nested
/// mappings present on both sides are merged recursively.
pub fn merge_mappings(base: &Mapping, overlay: &Mapping) -> Mapping {
    let mut result = base.clone();
    for (key, value) in overlay {
        let merged = match (result.get(key), value) {
            (Some(YamlValue::Mapping(b)), YamlValue::Mapping(o)) => {
                YamlValue::Mapping(merge_mappings(b, o))
            }
            _ => value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    result
}

// ============================================================================
// Stream parsing
// ============================================================================

fn parse_stream(name: &str, raw: &Mapping) -> Result<StreamDefinition, ConfigError> {
    for key in ["schema", "rate", "outputs"] {
        if !raw.contains_key(key) {
            return Err(ConfigError::stream(
                name,
                format!("missing required key: {key}"),
            ));
        }
    }

    let schema = match raw.get("schema") {
        Some(YamlValue::Mapping(m)) => parse_schema(name, m)?,
        _ => return Err(ConfigError::stream(name, "schema must be a mapping")),
    };

    let rate = raw
        .get("rate")
        .and_then(YamlValue::as_f64)
        .filter(|r| r.is_finite() && *r > 0.0)
        .ok_or_else(|| ConfigError::stream(name, "rate must be a positive number"))?;
    if Duration::try_from_secs_f64(1.0 / rate).is_err() {
        return Err(ConfigError::stream(
            name,
            format!("rate {rate} is too small: the tick interval cannot be represented"),
        ));
    }

    let jitter = match raw.get("jitter") {
        None | Some(YamlValue::Null) => 0.0,
        Some(v) => v
            .as_f64()
            .filter(|j| j.is_finite() && *j >= 0.0)
            .ok_or_else(|| ConfigError::stream(name, "jitter must be a non-negative number"))?,
    };

    let events = match raw.get("events") {
        None | Some(YamlValue::Null) => Vec::new(),
        Some(YamlValue::Sequence(seq)) => seq
            .iter()
            .enumerate()
            .map(|(i, e)| parse_event(name, i, e))
            .collect(),
        Some(_) => return Err(ConfigError::stream(name, "events must be a list")),
    };

    let outputs = match raw.get("outputs") {
        Some(YamlValue::Sequence(seq)) if !seq.is_empty() => seq
            .iter()
            .enumerate()
            .map(|(i, o)| parse_output(name, i, o))
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(ConfigError::stream(name, "outputs must be a non-empty list")),
    };

    let initial_state = match raw.get("initial_state") {
        None | Some(YamlValue::Null) => Vec::new(),
        Some(YamlValue::Mapping(m)) => Record::from_yaml_mapping(m).into_iter().collect(),
        Some(_) => return Err(ConfigError::stream(name, "initial_state must be a mapping")),
    };

    let seed = match raw.get("seed") {
        None | Some(YamlValue::Null) => None,
        Some(v) => Some(
            v.as_u64()
                .ok_or_else(|| ConfigError::stream(name, "seed must be a non-negative integer"))?,
        ),
    };

    Ok(StreamDefinition {
        name: name.to_string(),
        schema,
        rate,
        jitter,
        events,
        outputs,
        initial_state,
        seed,
    })
}

fn parse_schema(stream: &str, raw: &Mapping) -> Result<Schema, ConfigError> {
    let mut schema = Vec::with_capacity(raw.len());
    for (key, spec) in raw {
        let field = key.as_str().ok_or_else(|| {
            ConfigError::stream(stream, format!("field names must be strings, got {key:?}"))
        })?;
        schema.push((field.to_string(), parse_field(stream, field, spec)?));
    }
    Ok(schema)
}

/// Parse one field spec.
///
/// A mapping with a string `type` selects a generator; anything else is a
/// literal, including mappings without `type`.
pub fn parse_field(stream: &str, field: &str, raw: &YamlValue) -> Result<FieldSpec, ConfigError> {
    let YamlValue::Mapping(map) = raw else {
        return Ok(FieldSpec::Literal(Value::from_yaml(raw)));
    };
    let Some(kind) = map.get("type").and_then(YamlValue::as_str) else {
        return Ok(FieldSpec::Literal(Value::from_yaml(raw)));
    };

    if kind == "dependent" {
        let source = map
            .get("field")
            .and_then(YamlValue::as_str)
            .ok_or_else(|| ConfigError::field(stream, field, "dependent field requires 'field'"))?;
        if map.contains_key("func") && !map.contains_key("transform") {
            return Err(ConfigError::field(
                stream,
                field,
                "code expressions ('func') are not supported; use a named 'transform'",
            ));
        }
        let transform = parse_transform(map.get("transform"))
            .map_err(|message| ConfigError::field(stream, field, message))?;
        return Ok(FieldSpec::Dependent {
            field: source.to_string(),
            transform,
        });
    }

    let mut params = map.clone();
    params.remove("type");
    Ok(FieldSpec::Generator {
        kind: kind.to_string(),
        params,
    })
}

fn parse_transform(raw: Option<&YamlValue>) -> Result<Option<TransformSpec>, String> {
    match raw {
        None | Some(YamlValue::Null) => Ok(None),
        Some(YamlValue::String(name)) => Ok(Some(TransformSpec::named(name.clone()))),
        Some(YamlValue::Mapping(m)) if m.len() == 1 => {
            let (k, v) = m.iter().next().ok_or("empty transform mapping")?;
            let name = k.as_str().ok_or("transform name must be a string")?;
            Ok(Some(TransformSpec {
                name: name.to_string(),
                arg: Some(Value::from_yaml(v)),
            }))
        }
        Some(other) => Err(format!(
            "transform must be a name or a single-key mapping, got {other:?}"
        )),
    }
}

/// Parse one event trigger. Problems never fail the load: the trigger is
/// kept as a disabled entry and a warning is logged.
fn parse_event(stream: &str, index: usize, raw: &YamlValue) -> EventTrigger {
    let trigger = match try_parse_event(raw) {
        Ok(trigger) => trigger,
        Err((name, defect)) => EventTrigger::malformed(name, defect),
    };
    if let Some(defect) = &trigger.defect {
        warn!(
            "Stream '{}': event {} ({}) is malformed and will never fire: {}",
            stream,
            index,
            trigger.label(),
            defect
        );
    }
    trigger
}

fn try_parse_event(raw: &YamlValue) -> Result<EventTrigger, (Option<String>, String)> {
    let YamlValue::Mapping(map) = raw else {
        return Err((None, "event must be a mapping".to_string()));
    };
    let name = map.get("name").and_then(YamlValue::as_str).map(str::to_string);
    let fail = |msg: &str| (name.clone(), msg.to_string());

    let record = match map.get("record") {
        Some(YamlValue::Mapping(m)) => Record::from_yaml_mapping(m),
        Some(_) => return Err(fail("'record' must be a mapping")),
        None => return Err(fail("missing 'record'")),
    };

    let mut conditions = Vec::new();

    if let Some(v) = map.get("at_count") {
        let at = v
            .as_u64()
            .ok_or_else(|| fail("'at_count' must be a non-negative integer"))?;
        conditions.push(TriggerCondition::AtCount(at));
    }

    if let Some(v) = map.get("every_count") {
        let every = v
            .as_u64()
            .filter(|n| *n > 0)
            .ok_or_else(|| fail("'every_count' must be a positive integer"))?;
        let offset = match map.get("offset") {
            None => 0,
            Some(o) => o
                .as_u64()
                .ok_or_else(|| fail("'offset' must be a non-negative integer"))?,
        };
        if offset >= every {
            return Err(fail("'offset' must be less than 'every_count'"));
        }
        conditions.push(TriggerCondition::EveryCount { every, offset });
    }

    if let Some(v) = map.get("probability") {
        let p = v
            .as_f64()
            .filter(|p| (0.0..=1.0).contains(p))
            .ok_or_else(|| fail("'probability' must be a number between 0 and 1"))?;
        conditions.push(TriggerCondition::Probability(p));
    }

    if conditions.is_empty() {
        return Err(fail(
            "no trigger condition (expected at_count, every_count or probability)",
        ));
    }

    Ok(EventTrigger {
        name,
        conditions,
        record,
        defect: None,
    })
}

fn parse_output(stream: &str, index: usize, raw: &YamlValue) -> Result<SinkSpec, ConfigError> {
    let YamlValue::Mapping(map) = raw else {
        return Err(ConfigError::output(stream, index, "must be a mapping"));
    };
    let kind = map
        .get("type")
        .and_then(YamlValue::as_str)
        .ok_or_else(|| ConfigError::output(stream, index, "missing required key: type"))?;
    let format = map
        .get("format")
        .and_then(YamlValue::as_str)
        .ok_or_else(|| ConfigError::output(stream, index, "missing required key: format"))?;

    let mut params = map.clone();
    params.remove("type");
    params.remove("format");

    Ok(SinkSpec {
        kind: kind.to_string(),
        format: format.to_string(),
        params,
    })
}
