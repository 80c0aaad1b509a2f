//! User-configurable alert settings.

use crate::alerts::classify::Thresholds;
use crate::alerts::AlertKind;
use crate::error::{Result, WatchError};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Thresholds, per-kind switches and cooldowns for alerting.
///
/// Replaced wholesale when settings change; never mutated while the monitor
/// is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Band boundaries in mg/dL
    pub thresholds: Thresholds,
    /// Which alert kinds may fire
    pub enabled: EnabledAlerts,
    /// Cooldown for non-urgent alerts in minutes
    pub normal_cooldown_minutes: u32,
    /// Cooldown for urgent alerts in minutes
    pub urgent_cooldown_minutes: u32,
    /// Minutes without a new reading before data counts as stale
    pub stale_after_minutes: u32,
}

/// Per-kind enable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnabledAlerts {
    pub urgent_low: bool,
    pub low: bool,
    pub warning_low: bool,
    pub warning_high: bool,
    pub high: bool,
    pub urgent_high: bool,
    pub rising_fast: bool,
    pub falling_fast: bool,
    pub stale_data: bool,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            enabled: EnabledAlerts::default(),
            normal_cooldown_minutes: 15,
            urgent_cooldown_minutes: 5,
            stale_after_minutes: 15,
        }
    }
}

impl Default for EnabledAlerts {
    fn default() -> Self {
        Self {
            urgent_low: true,
            low: true,
            warning_low: false,
            warning_high: false,
            high: true,
            urgent_high: true,
            rising_fast: false,
            falling_fast: false,
            stale_data: true,
        }
    }
}

impl EnabledAlerts {
    pub fn is_enabled(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::UrgentLow => self.urgent_low,
            AlertKind::Low => self.low,
            AlertKind::WarningLow => self.warning_low,
            AlertKind::WarningHigh => self.warning_high,
            AlertKind::High => self.high,
            AlertKind::UrgentHigh => self.urgent_high,
            AlertKind::RisingFast => self.rising_fast,
            AlertKind::FallingFast => self.falling_fast,
            AlertKind::StaleData => self.stale_data,
        }
    }
}

impl AlertSettings {
    /// Set the thresholds.
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the enable flags.
    pub fn with_enabled(mut self, enabled: EnabledAlerts) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set both cooldowns in minutes.
    pub fn with_cooldowns(mut self, normal_minutes: u32, urgent_minutes: u32) -> Self {
        self.normal_cooldown_minutes = normal_minutes;
        self.urgent_cooldown_minutes = urgent_minutes;
        self
    }

    /// Set the stale-data threshold in minutes.
    pub fn with_stale_after(mut self, minutes: u32) -> Self {
        self.stale_after_minutes = minutes;
        self
    }

    /// Cooldown window that applies to the given kind.
    pub fn cooldown_for(&self, kind: AlertKind) -> Duration {
        let minutes = if kind.is_urgent() {
            self.urgent_cooldown_minutes
        } else {
            self.normal_cooldown_minutes
        };
        Duration::minutes(i64::from(minutes))
    }

    pub fn stale_after(&self) -> Duration {
        Duration::minutes(i64::from(self.stale_after_minutes))
    }

    /// Validate threshold ordering and the stale window.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.stale_after_minutes == 0 {
            return Err(WatchError::config_error(
                "stale_after_minutes must be at least 1",
            ));
        }
        Ok(())
    }
}
