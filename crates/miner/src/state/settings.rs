use anyhow::{Context, Result};
use log::{debug, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::console::Console;

pub const SETTINGS_FILENAME: &str = "mining_config.json";

/// Operator settings kept in `config/mining_config.json`.
///
/// Only `log_level` changes behavior; the rest is reported but not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerSettings {
    pub auto_restart: bool,
    pub max_temp: u32,
    pub power_limit: u32,
    pub log_level: String,
}

impl Default for MinerSettings {
    fn default() -> Self {
        Self {
            auto_restart: true,
            max_temp: 75,
            power_limit: 80,
            log_level: "INFO".to_string(),
        }
    }
}

impl MinerSettings {
    /// Loads the settings file from `config_dir`, writing the defaults first
    /// when it does not exist yet. A file that cannot be parsed is left
    /// untouched and the defaults are used instead.
    pub fn load_or_create(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(SETTINGS_FILENAME);

        if !path.exists() {
            let settings = Self::default();
            fs::create_dir_all(config_dir)
                .with_context(|| format!("Failed to create {}", config_dir.display()))?;
            fs::write(&path, serde_json::to_string_pretty(&settings)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!("Created default settings at {}", path.display());
            return Ok(settings);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        match serde_json::from_str(&contents) {
            Ok(settings) => {
                debug!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            Err(e) => {
                warn!("Ignoring unreadable settings file {}: {e}", path.display());
                Ok(Self::default())
            }
        }
    }

    /// Reads the settings file without creating it.
    pub fn peek(config_dir: &Path) -> Option<Self> {
        let contents = fs::read_to_string(config_dir.join(SETTINGS_FILENAME)).ok()?;
        serde_json::from_str(&contents).ok()
    }

    /// `log_level` as a filter; `None` when the value is not a level name.
    pub fn level_filter(&self) -> Option<LevelFilter> {
        self.log_level.trim().parse().ok()
    }

    pub fn print(&self) {
        Console::title("Settings:");
        Console::info("Auto restart", &self.auto_restart.to_string());
        Console::info("Max temperature", &format!("{}°C", self.max_temp));
        Console::info("Power limit", &format!("{}%", self.power_limit));
        Console::info("Log level", &self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("config");

        let settings = MinerSettings::load_or_create(&config_dir).unwrap();
        assert_eq!(settings, MinerSettings::default());

        let written: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(config_dir.join(SETTINGS_FILENAME)).unwrap(),
        )
        .unwrap();
        assert_eq!(written["auto_restart"], true);
        assert_eq!(written["max_temp"], 75);
        assert_eq!(written["power_limit"], 80);
        assert_eq!(written["log_level"], "INFO");
    }

    #[test]
    fn test_loads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILENAME),
            r#"{"auto_restart": false, "max_temp": 70, "power_limit": 60, "log_level": "debug"}"#,
        )
        .unwrap();

        let settings = MinerSettings::load_or_create(dir.path()).unwrap();
        assert!(!settings.auto_restart);
        assert_eq!(settings.max_temp, 70);
        assert_eq!(settings.level_filter(), Some(LevelFilter::Debug));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILENAME), r#"{"max_temp": 65}"#).unwrap();

        let settings = MinerSettings::load_or_create(dir.path()).unwrap();
        assert_eq!(settings.max_temp, 65);
        assert_eq!(settings.power_limit, 80);
        assert_eq!(settings.level_filter(), Some(LevelFilter::Info));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILENAME);
        fs::write(&path, "{ not json").unwrap();

        let settings = MinerSettings::load_or_create(dir.path()).unwrap();
        assert_eq!(settings, MinerSettings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_unknown_log_level() {
        let settings = MinerSettings {
            log_level: "chatty".to_string(),
            ..MinerSettings::default()
        };
        assert_eq!(settings.level_filter(), None);
    }
}
