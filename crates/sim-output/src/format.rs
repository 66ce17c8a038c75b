//! Record formatters.
//!
//! Every sink is configured with a format name. The name is resolved once
//! when the output is opened; an unknown name falls back to JSON with a
//! warning.

use crate::error::SinkError;
use sim_core::{Record, Value};
use tracing::warn;

/// Output format of one sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Compact JSON object
    #[default]
    Json,
    /// Indented JSON object
    JsonPretty,
    /// One CSV row, values in field order, no header
    Csv,
    /// `key=value` pairs separated by spaces
    Text,
}

impl Format {
    /// Parse a format name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Some(Format::Json),
            "json_pretty" | "pretty" => Some(Format::JsonPretty),
            "csv" => Some(Format::Csv),
            "text" | "kv" => Some(Format::Text),
            _ => None,
        }
    }

    /// Parse a format name, falling back to JSON for unknown names.
    pub fn resolve(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            warn!("Unknown format: {name}, falling back to json");
            Format::Json
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::JsonPretty => "json_pretty",
            Format::Csv => "csv",
            Format::Text => "text",
        }
    }

    /// Render one record.
    pub fn render(&self, record: &Record) -> Result<String, SinkError> {
        match self {
            Format::Json => {
                serde_json::to_string(record).map_err(|e| SinkError::Format(e.to_string()))
            }
            Format::JsonPretty => {
                serde_json::to_string_pretty(record).map_err(|e| SinkError::Format(e.to_string()))
            }
            Format::Csv => render_csv(record),
            Format::Text => Ok(render_text(record)),
        }
    }
}

/// Format a record by format name.
pub fn format_record(record: &Record, format: &str) -> Result<String, SinkError> {
    Format::resolve(format).render(record)
}

fn render_csv(record: &Record) -> Result<String, SinkError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(record.iter().map(|(_, value)| value.to_string()))
        .map_err(|e| SinkError::Format(e.to_string()))?;

    let bytes = writer
        .into_inner()
        .map_err(|e| SinkError::Format(e.to_string()))?;
    let line = String::from_utf8(bytes).map_err(|e| SinkError::Format(e.to_string()))?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn render_text(record: &Record) -> String {
    record
        .iter()
        .map(|(name, value)| match value {
            Value::String(s) if needs_quoting(s) => {
                // serde_json never fails on a plain string
                let quoted = serde_json::to_string(s).unwrap_or_else(|_| s.clone());
                format!("{name}={quoted}")
            }
            other => format!("{name}={other}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '=' || c == '"')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        let mut nested = Record::new();
        nested.insert("lat", Value::Float(1.5));

        let mut record = Record::new();
        record.insert("id", Value::Int(7));
        record.insert("name", Value::from("Ada, Countess"));
        record.insert("ok", Value::Bool(true));
        record.insert("missing", Value::Null);
        record.insert("pos", Value::Object(nested));
        record
    }

    #[test]
    fn test_json_keeps_field_order() {
        let json = Format::Json.render(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"name":"Ada, Countess","ok":true,"missing":null,"pos":{"lat":1.5}}"#
        );
    }

    #[test]
    fn test_json_pretty_parses_back() {
        let pretty = Format::JsonPretty.render(&sample()).unwrap();
        assert!(pretty.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(parsed["id"], 7);
    }

    #[test]
    fn test_csv_row() {
        let csv = Format::Csv.render(&sample()).unwrap();
        assert_eq!(csv, r#"7,"Ada, Countess",true,,"{""lat"":1.5}""#);
    }

    #[test]
    fn test_text_pairs() {
        let text = Format::Text.render(&sample()).unwrap();
        assert_eq!(
            text,
            r#"id=7 name="Ada, Countess" ok=true missing= pos={"lat":1.5}"#
        );
    }

    #[test]
    fn test_unknown_format_falls_back_to_json() {
        assert_eq!(Format::resolve("xml"), Format::Json);
        assert_eq!(
            format_record(&sample(), "xml").unwrap(),
            Format::Json.render(&sample()).unwrap()
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Format::parse("CSV"), Some(Format::Csv));
        assert_eq!(Format::parse("json_pretty"), Some(Format::JsonPretty));
        assert_eq!(Format::parse("text"), Some(Format::Text));
        assert_eq!(Format::parse("avro"), None);
    }
}
