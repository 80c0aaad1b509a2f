//! Reading classification and threshold alerts.
//!
//! Classification is a pure function over [`Thresholds`]; alerting adds
//! per-kind enable flags and cooldowns on top and hands the result to a
//! [`Notifier`].

pub mod classify;
pub mod cooldown;
pub mod evaluator;
pub mod notifier;
pub mod settings;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export commonly used items
pub use classify::{classify, GlucoseRange, Thresholds};
pub use cooldown::CooldownTracker;
pub use evaluator::AlertEvaluator;
pub use notifier::{CommandNotifier, CompositeNotifier, LogNotifier, Notifier, NotifyCommand};
pub use settings::{AlertSettings, EnabledAlerts};

/// Categories of alert, each with its own switch and cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    UrgentLow,
    Low,
    WarningLow,
    WarningHigh,
    High,
    UrgentHigh,
    RisingFast,
    FallingFast,
    StaleData,
}

impl AlertKind {
    /// Urgent kinds use the shorter cooldown.
    pub fn is_urgent(&self) -> bool {
        matches!(self, AlertKind::UrgentLow | AlertKind::UrgentHigh)
    }

    pub fn title(&self) -> &'static str {
        match self {
            AlertKind::UrgentLow => "Urgent low glucose",
            AlertKind::Low => "Low glucose",
            AlertKind::WarningLow => "Glucose trending low",
            AlertKind::WarningHigh => "Glucose trending high",
            AlertKind::High => "High glucose",
            AlertKind::UrgentHigh => "Urgent high glucose",
            AlertKind::RisingFast => "Glucose rising fast",
            AlertKind::FallingFast => "Glucose falling fast",
            AlertKind::StaleData => "No recent glucose data",
        }
    }
}

/// A notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    /// Reading value in mg/dL that triggered the alert
    pub value: Option<i32>,
    pub raised_at: DateTime<Utc>,
}
