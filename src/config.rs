//! Runtime settings
//!
//! Settings come from `OCEAN_*` environment variables, with a `.env` file
//! loaded first when present (via `dotenvy`). Variables are collected by the
//! `config` crate and deserialized into [`Settings`]; serde defaults cover
//! anything unset, so an empty environment is valid.
//!
//! - `OCEAN_SESSIONS_DIR=/data/sessions` -> `sessions_dir`
//! - `OCEAN_STRICT_ENTRY=true` -> `strict_entry`

use crate::error::{BatteryError, ValidationError};
use crate::session::EntryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix shared by every settings variable
pub const ENV_PREFIX: &str = "OCEAN";
pub const ENV_LAST_BATTERY_PATH: &str = "OCEAN_LAST_BATTERY_PATH";

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Default directory for session documents
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,
    /// Battery file used most recently
    #[serde(default)]
    pub last_battery_path: Option<PathBuf>,
    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Reject score entry for ids the battery does not know
    #[serde(default)]
    pub strict_entry: bool,
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from("sessions")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sessions_dir: default_sessions_dir(),
            last_battery_path: None,
            log_level: default_log_level(),
            strict_entry: false,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read settings from the process environment
    pub fn from_env() -> Result<Self, BatteryError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => warn!(error = %e, "failed to load .env"),
        }
        Self::load(None)
    }

    /// Read settings from an explicit set of variables instead of the process environment
    pub fn from_vars(vars: config::Map<String, String>) -> Result<Self, BatteryError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<config::Map<String, String>>) -> Result<Self, BatteryError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .ignore_empty(true)
                    .source(vars),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ValidationError::invalid_format("settings", e.to_string()).into())
    }

    /// Entry-time catalog policy implied by `strict_entry`
    pub fn entry_policy(&self) -> EntryPolicy {
        if self.strict_entry {
            EntryPolicy::Strict
        } else {
            EntryPolicy::Lenient
        }
    }

    /// Record `battery` as the last used battery in an env file, replacing an
    /// existing entry or appending one
    pub fn remember_battery_path(&mut self, env_file: &Path, battery: &Path) -> Result<(), BatteryError> {
        let existing = match fs::read_to_string(env_file) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let entry = format!("{}={}", ENV_LAST_BATTERY_PATH, battery.display());
        let prefix = format!("{}=", ENV_LAST_BATTERY_PATH);
        let mut found = false;
        let mut lines: Vec<String> = existing
            .lines()
            .map(|line| {
                if line.starts_with(&prefix) {
                    found = true;
                    entry.clone()
                } else {
                    line.to_string()
                }
            })
            .collect();

        if !found {
            if lines.last().is_some_and(|l| !l.trim().is_empty()) {
                lines.push(String::new());
            }
            lines.push(entry);
        }

        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(env_file, content)?;

        self.last_battery_path = Some(battery.to_path_buf());
        Ok(())
    }
}
