//! Duration parsing utilities.

use anyhow::Context;
use std::time::Duration;

/// Parse a duration string like "1h", "30m", "300s", "250ms", "300".
///
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - Milliseconds suffix: "250ms"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    // "ms" must be checked before "m" and "s"
    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid milliseconds value: {num_str}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(num_str) = s.strip_suffix('h') {
        return scaled(num_str, 3600, "hours");
    }
    if let Some(num_str) = s.strip_suffix('m') {
        return scaled(num_str, 60, "minutes");
    }
    if let Some(num_str) = s.strip_suffix('s') {
        return scaled(num_str, 1, "seconds");
    }

    // No suffix - treat as seconds
    scaled(s, 1, "duration")
}

fn scaled(num_str: &str, unit_secs: u64, what: &str) -> anyhow::Result<Duration> {
    let value: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid {what} value: {num_str}"))?;
    let secs = value
        .checked_mul(unit_secs)
        .with_context(|| format!("Duration too large: {num_str} {what}"))?;
    Ok(Duration::from_secs(secs))
}
