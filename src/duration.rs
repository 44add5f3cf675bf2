//! Human-readable duration and timestamp parsing.
//!
//! Durations are written as `30s`, `5m`, `1h` or a bare number of seconds.
//! Timestamps additionally accept clock notation (`01:30`, `00:01:30.5`).

use crate::error::{Result, YtdlrError};

/// Parse a duration like `"30s"`, `"1m"`, `"1h"` or `"90"` into seconds.
///
/// Negative values are passed through; callers decide whether they make sense.
pub fn parse_duration(text: &str) -> Result<f64> {
    let normalized = text.trim().to_lowercase();
    let invalid = || YtdlrError::InvalidDuration(text.to_string());

    let (number, multiplier) = match normalized.chars().last() {
        Some('h') => (&normalized[..normalized.len() - 1], 3600.0),
        Some('m') => (&normalized[..normalized.len() - 1], 60.0),
        Some('s') => (&normalized[..normalized.len() - 1], 1.0),
        Some(_) => (normalized.as_str(), 1.0),
        None => return Err(invalid()),
    };

    let value: f64 = number.trim().parse().map_err(|_| invalid())?;
    let seconds = value * multiplier;
    if !seconds.is_finite() {
        return Err(invalid());
    }

    Ok(seconds)
}

/// Parse a seek offset: either clock notation (`[[H:]M:]S`) or anything
/// [`parse_duration`] accepts.
pub fn parse_timestamp(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if !trimmed.contains(':') {
        return parse_duration(trimmed);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err(YtdlrError::InvalidDuration(text.to_string()));
    }

    let mut seconds = 0.0;
    for part in parts {
        let value: f64 = part
            .trim()
            .parse()
            .map_err(|_| YtdlrError::InvalidDuration(text.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(YtdlrError::InvalidDuration(text.to_string()));
        }
        seconds = seconds * 60.0 + value;
    }

    Ok(seconds)
}
