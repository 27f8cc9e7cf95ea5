//! # relay-settings
//!
//! Layered configuration for the relay hub.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`RelaySettings::default()`]
//! 2. **Settings file** — `~/.relay-hub/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables** — `PORT` and `RELAY_*` overrides (highest priority)
//!
//! There is no global instance: the binary loads settings once and hands the
//! resulting values to the server.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
