//! Turns readings into cooldown-gated alerts.

use crate::alerts::classify::{classify, GlucoseRange};
use crate::alerts::cooldown::CooldownTracker;
use crate::alerts::settings::AlertSettings;
use crate::alerts::{Alert, AlertKind};
use crate::share::data::{GlucoseReading, Trend, Units};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Applies [`AlertSettings`] to incoming readings.
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    settings: AlertSettings,
    units: Units,
    cooldowns: CooldownTracker,
}

impl AlertEvaluator {
    pub fn new(settings: AlertSettings, units: Units) -> Self {
        Self {
            settings,
            units,
            cooldowns: CooldownTracker::new(),
        }
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.settings
    }

    /// Swap in new settings; cooldown history is kept.
    pub fn replace_settings(&mut self, settings: AlertSettings) {
        self.settings = settings;
    }

    /// Alert kind implied by a value band, if any.
    pub fn kind_for_range(range: GlucoseRange) -> Option<AlertKind> {
        match range {
            GlucoseRange::UrgentLow => Some(AlertKind::UrgentLow),
            GlucoseRange::Low => Some(AlertKind::Low),
            GlucoseRange::WarningLow => Some(AlertKind::WarningLow),
            GlucoseRange::Normal => None,
            GlucoseRange::WarningHigh => Some(AlertKind::WarningHigh),
            GlucoseRange::High => Some(AlertKind::High),
            GlucoseRange::UrgentHigh => Some(AlertKind::UrgentHigh),
        }
    }

    /// Evaluate a fresh reading. Returns every alert that passed its
    /// enable flag and cooldown, most severe first.
    pub fn evaluate(&mut self, reading: &GlucoseReading, now: DateTime<Utc>) -> Vec<Alert> {
        let range = classify(reading.value, &self.settings.thresholds);
        let mut candidates = Vec::with_capacity(2);

        if let Some(kind) = Self::kind_for_range(range) {
            candidates.push(kind);
        }
        match reading.trend {
            Trend::DoubleUp => candidates.push(AlertKind::RisingFast),
            Trend::DoubleDown => candidates.push(AlertKind::FallingFast),
            _ => {}
        }

        let mut alerts = Vec::new();
        for kind in candidates {
            if self.gate(kind, now) {
                alerts.push(self.reading_alert(kind, reading, now));
            }
        }
        alerts
    }

    /// Raise a stale-data alert if the latest reading is older than the
    /// configured window. `None` when fresh, disabled or cooling down.
    pub fn evaluate_stale(
        &mut self,
        latest: Option<&GlucoseReading>,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        let latest = latest?;
        let age = now - latest.timestamp;
        if age <= self.settings.stale_after() {
            return None;
        }
        if !self.gate(AlertKind::StaleData, now) {
            return None;
        }

        let minutes = age.num_minutes();
        Some(Alert {
            kind: AlertKind::StaleData,
            title: "No recent glucose data".to_string(),
            message: format!(
                "Last reading was {} minutes ago ({}).",
                minutes,
                latest.display(self.units)
            ),
            value: Some(latest.value),
            raised_at: now,
        })
    }

    fn gate(&mut self, kind: AlertKind, now: DateTime<Utc>) -> bool {
        if !self.settings.enabled.is_enabled(kind) {
            debug!(?kind, "alert disabled");
            return false;
        }
        let cooldown = self.settings.cooldown_for(kind);
        let fired = self.cooldowns.try_fire(kind, cooldown, now);
        if !fired {
            debug!(?kind, last = ?self.cooldowns.last_fired(kind), "alert suppressed by cooldown");
        }
        fired
    }

    fn reading_alert(&self, kind: AlertKind, reading: &GlucoseReading, now: DateTime<Utc>) -> Alert {
        Alert {
            kind,
            title: kind.title().to_string(),
            message: format!("Glucose is {}", reading.display(self.units)),
            value: Some(reading.value),
            raised_at: now,
        }
    }
}
