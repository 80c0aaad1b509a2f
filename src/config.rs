//! Application settings persisted as JSON.

use crate::alerts::{AlertSettings, NotifyCommand};
use crate::error::{Result, WatchError};
use crate::share::client::{DEFAULT_FETCH_COUNT, DEFAULT_FETCH_MINUTES};
use crate::share::{Region, Units};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the user's home holding settings and session cache.
pub const CONFIG_DIR_NAME: &str = ".glucowatch";

/// Top-level settings file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Share deployment to talk to
    pub region: Region,
    /// Display units
    pub units: Units,
    /// Alert thresholds and cooldowns
    pub alerts: AlertSettings,
    /// Optional external command run for each alert
    pub notify_command: Option<NotifyCommand>,
    /// Minutes of history requested per poll
    pub fetch_minutes: u32,
    /// Maximum readings requested per poll
    pub fetch_count: u32,
    /// Port for the local status endpoint; disabled when `None`
    pub status_port: Option<u16>,
    /// Bind address for the local status endpoint
    pub status_host: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: Region::default(),
            units: Units::default(),
            alerts: AlertSettings::default(),
            notify_command: None,
            fetch_minutes: DEFAULT_FETCH_MINUTES,
            fetch_count: DEFAULT_FETCH_COUNT,
            status_port: None,
            status_host: "127.0.0.1".to_string(),
        }
    }
}

impl Settings {
    /// Default directory for glucowatch files, `~/.glucowatch`.
    pub fn default_dir() -> Result<PathBuf> {
        home::home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME))
            .ok_or_else(|| WatchError::config_error("Could not determine home directory"))
    }

    /// Default settings file path.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::default_dir()?.join("settings.json"))
    }

    /// Load settings from `path`, falling back to defaults if it is absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load and validate settings from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
            WatchError::config_error(format!("Invalid settings file {:?}: {}", path, e))
        })?;
        settings.validate()?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Write settings to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| WatchError::config_error(format!("Failed to encode settings: {}", e)))?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.alerts.validate()?;
        if self.fetch_count == 0 || self.fetch_minutes == 0 {
            return Err(WatchError::config_error(
                "fetch_minutes and fetch_count must be positive",
            ));
        }
        if let Some(command) = &self.notify_command {
            if command.program.trim().is_empty() {
                return Err(WatchError::config_error("notify_command.program is empty"));
            }
        }
        Ok(())
    }

    /// Set the region.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Set the display units.
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Replace the alert settings.
    pub fn with_alerts(mut self, alerts: AlertSettings) -> Self {
        self.alerts = alerts;
        self
    }

    /// Set the notify command.
    pub fn with_notify_command(mut self, command: Option<NotifyCommand>) -> Self {
        self.notify_command = command;
        self
    }

    /// Enable the status endpoint on `port`.
    pub fn with_status_port(mut self, port: Option<u16>) -> Self {
        self.status_port = port;
        self
    }

    /// Full bind address of the status endpoint, if enabled.
    pub fn status_address(&self) -> Option<String> {
        self.status_port
            .map(|port| format!("{}:{}", self.status_host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::Thresholds;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("settings.json");

        let settings = Settings::default()
            .with_region(Region::OutsideUs)
            .with_units(Units::MmolL)
            .with_status_port(Some(8181));
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.region, Region::OutsideUs);
        assert_eq!(loaded.units, Units::MmolL);
        assert_eq!(loaded.status_address().as_deref(), Some("127.0.0.1:8181"));
    }

    #[test]
    fn test_invalid_thresholds_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"alerts":{"thresholds":{"low":300}}}"#).unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));
    }

    #[test]
    fn test_save_refuses_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let bad = Settings::default().with_alerts(AlertSettings::default().with_thresholds(Thresholds {
            urgent_high: 100,
            ..Thresholds::default()
        }));
        assert!(bad.save(&dir.path().join("settings.json")).is_err());
    }
}
