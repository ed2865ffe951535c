//! TOML-based engine configuration.
//!
//! Tuning knobs for the inference cadence and thresholds. Every field has
//! a serde default so a partial (or missing, or unparseable) file still
//! yields a working configuration.
//!
//! Stored at `~/.config/modwright/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::storage::data_dir;

/// Engine tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Periodic suggestion refresh, seconds.
    #[serde(default = "default_suggestion_interval_secs")]
    pub suggestion_interval_secs: u64,
    /// Periodic warning re-check backstop, seconds.
    #[serde(default = "default_warning_interval_secs")]
    pub warning_interval_secs: u64,
    /// Minimum spacing between warning check cycles, milliseconds.
    #[serde(default = "default_warning_debounce_ms")]
    pub warning_debounce_ms: u64,
    /// TTL for the persisted context snapshot, hours.
    #[serde(default = "default_snapshot_ttl_hours")]
    pub snapshot_ttl_hours: u64,
    /// Cap on the published suggestion list.
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    /// Session length after which fatigue/optimization advice fires, seconds.
    #[serde(default = "default_long_session_secs")]
    pub long_session_secs: u64,
    /// Session length after which the scale-check warning fires, seconds.
    #[serde(default = "default_scale_check_secs")]
    pub scale_check_secs: u64,
}

fn default_suggestion_interval_secs() -> u64 {
    30
}
fn default_warning_interval_secs() -> u64 {
    5
}
fn default_warning_debounce_ms() -> u64 {
    1000
}
fn default_snapshot_ttl_hours() -> u64 {
    24
}
fn default_max_suggestions() -> usize {
    10
}
fn default_long_session_secs() -> u64 {
    1800
}
fn default_scale_check_secs() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            suggestion_interval_secs: default_suggestion_interval_secs(),
            warning_interval_secs: default_warning_interval_secs(),
            warning_debounce_ms: default_warning_debounce_ms(),
            snapshot_ttl_hours: default_snapshot_ttl_hours(),
            max_suggestions: default_max_suggestions(),
            long_session_secs: default_long_session_secs(),
            scale_check_secs: default_scale_check_secs(),
        }
    }
}

impl EngineConfig {
    fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/modwright"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file is
    /// missing or invalid.
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_from_path(&path).unwrap_or_else(|e| {
                log::warn!("falling back to default engine config: {e}");
                Self::default()
            }),
            Err(e) => {
                log::warn!("falling back to default engine config: {e}");
                Self::default()
            }
        }
    }

    /// Load from an explicit path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed. A missing
    /// file is not an error; it yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Save to an explicit path.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Snapshot TTL as a chrono duration.
    pub fn snapshot_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.snapshot_ttl_hours as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_cadence() {
        let config = EngineConfig::default();
        assert_eq!(config.suggestion_interval_secs, 30);
        assert_eq!(config.warning_interval_secs, 5);
        assert_eq!(config.warning_debounce_ms, 1000);
        assert_eq!(config.snapshot_ttl_hours, 24);
        assert_eq!(config.max_suggestions, 10);
        assert_eq!(config.long_session_secs, 1800);
        assert_eq!(config.scale_check_secs, 300);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "warning_debounce_ms = 250\n").unwrap();

        let config = EngineConfig::load_from_path(&path).unwrap();
        assert_eq!(config.warning_debounce_ms, 250);
        assert_eq!(config.suggestion_interval_secs, 30);
        assert_eq!(config.max_suggestions, 10);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_from_path(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.max_suggestions, 10);
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = EngineConfig::default();
        config.max_suggestions = 5;
        config.save_to_path(&path).unwrap();

        let reloaded = EngineConfig::load_from_path(&path).unwrap();
        assert_eq!(reloaded.max_suggestions, 5);
    }
}
