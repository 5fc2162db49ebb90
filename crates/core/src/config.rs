//! Helpers for reading typed settings from environment-style sources.
//!
//! Each settings struct in the workspace exposes `from_env()` plus a
//! `from_lookup()` that takes any `Fn(&str) -> Option<String>`, so parsing
//! can be tested without touching the process environment.

use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;

/// Lookup backed by the real process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Read a non-empty, trimmed string value.
pub fn string<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse a value, falling back to `default` when unset.
pub fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match string(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| CoreError::Config(format!("{key} has invalid value '{raw}': {e}"))),
        None => Ok(default),
    }
}

/// Read a (possibly fractional) number of seconds as a [`Duration`].
pub fn secs_or<F>(lookup: &F, key: &str, default_secs: f64) -> Result<Duration, CoreError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: f64 = parse_or(lookup, key, default_secs)?;
    Duration::try_from_secs_f64(secs).map_err(|e| {
        CoreError::Config(format!(
            "{key} must be a non-negative number of seconds, got {secs}: {e}"
        ))
    })
}
