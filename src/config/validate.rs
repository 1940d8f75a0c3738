// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{Profile, RawProfile};
use crate::errors::{ProcstreamError, Result};

impl TryFrom<RawProfile> for Profile {
    type Error = ProcstreamError;

    fn try_from(raw: RawProfile) -> std::result::Result<Self, Self::Error> {
        let defaults = raw.defaults;

        let timeout = defaults
            .timeout
            .as_deref()
            .map(|s| parse_field("timeout", s))
            .transpose()?;
        if timeout.is_some_and(|t| t.is_zero()) {
            return Err(ProcstreamError::ConfigError(
                "[defaults].timeout must be greater than zero (omit it for no deadline)"
                    .to_string(),
            ));
        }

        let retry_delay = defaults
            .retry_delay
            .as_deref()
            .map(|s| parse_field("retry_delay", s))
            .transpose()?;
        let retries = defaults.retries.unwrap_or(0);
        if retry_delay.is_some() && retries == 0 {
            return Err(ProcstreamError::ConfigError(
                "[defaults].retry_delay is set but retries is 0".to_string(),
            ));
        }

        Ok(Profile {
            timeout,
            retries,
            retry_delay,
            encoding: defaults.encoding.unwrap_or_default(),
            echo_output: defaults.echo_output.unwrap_or(false),
            split: defaults.split.unwrap_or(false),
            detached: defaults.detached.unwrap_or(false),
            cwd: defaults.cwd,
            env: raw.env,
        })
    }
}

fn parse_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| ProcstreamError::ConfigError(format!("[defaults].{field}: {e}")))
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
