//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RelaySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target), so static file
//!   serving is disabled with `"staticDir": ""` rather than `null`

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::RelaySettings;

/// Resolve the path to the settings file (`~/.relay-hub/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".relay-hub").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RelaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a failed validation is an
/// error.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

/// Same as [`load_settings_from_path`] with an injectable environment lookup.
pub fn load_with_env<F>(path: &Path, env: F) -> Result<RelaySettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(RelaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: RelaySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// `PORT` is honoured for compatibility with hosting platforms; `RELAY_PORT`
/// takes precedence over it. Invalid values are ignored with a warning.
pub fn apply_env_overrides<F>(settings: &mut RelaySettings, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    // ── Server ──────────────────────────────────────────────────────
    for key in ["PORT", "RELAY_PORT"] {
        if let Some(port) = read_u64(&env, key, 1, 65_535).and_then(|v| u16::try_from(v).ok()) {
            settings.server.port = port;
        }
    }
    if let Some(v) = read_string(&env, "RELAY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_u64(&env, "RELAY_MAX_CONNECTIONS", 1, 1_000_000) {
        settings.server.max_connections = usize::try_from(v).unwrap_or(usize::MAX);
    }
    if let Some(v) = env("RELAY_STATIC_DIR") {
        settings.server.static_dir = Some(v);
    }

    // ── Heartbeat ───────────────────────────────────────────────────
    if let Some(v) = read_u64(&env, "RELAY_HEARTBEAT_INTERVAL_MS", 100, 3_600_000) {
        settings.heartbeat.interval_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_string(&env, "RELAY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_bool(&env, "RELAY_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env readers ─────────────────────────────────────────────────────────────

fn read_string<F: Fn(&str) -> Option<String>>(env: &F, name: &str) -> Option<String> {
    env(name).filter(|v| !v.is_empty())
}

fn read_bool<F: Fn(&str) -> Option<String>>(env: &F, name: &str) -> Option<bool> {
    let val = env(name)?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_u64<F: Fn(&str) -> Option<String>>(
    env: &F,
    name: &str,
    min: u64,
    max: u64,
) -> Option<u64> {
    let val = env(name)?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid integer env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
