//! Timestamp value generators.
//!
//! Timestamps are taken from the wall clock at generation time, optionally
//! shifted by a fixed offset, and rendered as ISO 8601, epoch seconds, epoch
//! milliseconds or a strftime pattern.

use crate::error::GeneratorError;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use serde::Deserialize;
use sim_core::Value;
use std::fmt::{Display, Write};

/// Pattern used by `format: custom` when no `custom_format` is given.
pub const DEFAULT_CUSTOM_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a timestamp is rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampFormat {
    /// RFC 3339 / ISO 8601 string
    Iso,
    /// Integer seconds since the Unix epoch
    Epoch,
    /// Integer milliseconds since the Unix epoch
    EpochMillis,
    /// strftime-style pattern
    Pattern(String),
}

impl TimestampFormat {
    /// Resolve the `format` / `custom_format` parameter pair.
    ///
    /// Any `format` other than the named ones is itself treated as a pattern.
    pub fn resolve(format: &str, custom_format: Option<&str>) -> Result<Self, String> {
        let resolved = match format {
            "iso" | "iso8601" => TimestampFormat::Iso,
            "epoch" => TimestampFormat::Epoch,
            "epoch_millis" | "epoch_ms" => TimestampFormat::EpochMillis,
            "custom" => {
                TimestampFormat::Pattern(custom_format.unwrap_or(DEFAULT_CUSTOM_FORMAT).to_string())
            }
            other => TimestampFormat::Pattern(other.to_string()),
        };
        if let TimestampFormat::Pattern(pattern) = &resolved {
            if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                return Err(format!("invalid timestamp pattern: {pattern}"));
            }
        }
        Ok(resolved)
    }
}

/// Clock the timestamp is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timezone {
    #[default]
    Utc,
    Local,
}

/// Additive offset applied to the current time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TimeOffset {
    #[serde(default)]
    pub days: i64,
    #[serde(default)]
    pub hours: i64,
    #[serde(default)]
    pub minutes: i64,
    #[serde(default)]
    pub seconds: i64,
}

impl TimeOffset {
    /// Total offset, or `None` if it does not fit in a `TimeDelta`.
    pub fn to_delta(&self) -> Option<TimeDelta> {
        let secs = self
            .days
            .checked_mul(86_400)?
            .checked_add(self.hours.checked_mul(3_600)?)?
            .checked_add(self.minutes.checked_mul(60)?)?
            .checked_add(self.seconds)?;
        TimeDelta::try_seconds(secs)
    }
}

/// Generate a timestamp for the current time shifted by `offset`.
pub fn generate_timestamp(
    format: &TimestampFormat,
    timezone: Timezone,
    offset: TimeDelta,
) -> Result<Value, GeneratorError> {
    let now = Utc::now()
        .checked_add_signed(offset)
        .ok_or_else(|| GeneratorError::Overflow("timestamp offset".to_string()))?;

    match timezone {
        Timezone::Utc => render(&now, format),
        Timezone::Local => render(&now.with_timezone(&Local), format),
    }
}

fn render<Tz>(dt: &DateTime<Tz>, format: &TimestampFormat) -> Result<Value, GeneratorError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match format {
        TimestampFormat::Iso => Ok(Value::String(dt.to_rfc3339())),
        TimestampFormat::Epoch => Ok(Value::Int(dt.timestamp())),
        TimestampFormat::EpochMillis => Ok(Value::Int(dt.timestamp_millis())),
        TimestampFormat::Pattern(pattern) => {
            let mut out = String::new();
            write!(out, "{}", dt.format(pattern)).map_err(|_| GeneratorError::InvalidParams {
                kind: "timestamp".to_string(),
                reason: format!("pattern '{pattern}' could not be rendered"),
            })?;
            Ok(Value::String(out))
        }
    }
}
