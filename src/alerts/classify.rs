//! Threshold bands and reading classification.

use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};

/// Severity band of a glucose value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlucoseRange {
    UrgentLow,
    Low,
    WarningLow,
    Normal,
    WarningHigh,
    High,
    UrgentHigh,
}

/// Band boundaries in mg/dL. Each boundary is the first value of the band
/// above it, e.g. `low = 70` means 69 is Low and 70 is WarningLow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub urgent_low: i32,
    pub low: i32,
    pub warning_low: i32,
    pub warning_high: i32,
    pub high: i32,
    pub urgent_high: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            urgent_low: 55,
            low: 70,
            warning_low: 80,
            warning_high: 160,
            high: 180,
            urgent_high: 250,
        }
    }
}

impl Thresholds {
    /// Check that the boundaries are strictly increasing.
    pub fn validate(&self) -> Result<()> {
        let ordered = [
            ("urgent_low", self.urgent_low),
            ("low", self.low),
            ("warning_low", self.warning_low),
            ("warning_high", self.warning_high),
            ("high", self.high),
            ("urgent_high", self.urgent_high),
        ];

        for pair in ordered.windows(2) {
            let (lower_name, lower) = pair[0];
            let (upper_name, upper) = pair[1];
            if lower >= upper {
                return Err(WatchError::config_error(format!(
                    "threshold {} ({}) must be below {} ({})",
                    lower_name, lower, upper_name, upper
                )));
            }
        }

        Ok(())
    }
}

/// Map a value onto its band. Total over all integers.
pub fn classify(value: i32, thresholds: &Thresholds) -> GlucoseRange {
    if value < thresholds.urgent_low {
        GlucoseRange::UrgentLow
    } else if value < thresholds.low {
        GlucoseRange::Low
    } else if value < thresholds.warning_low {
        GlucoseRange::WarningLow
    } else if value < thresholds.warning_high {
        GlucoseRange::Normal
    } else if value < thresholds.high {
        GlucoseRange::WarningHigh
    } else if value < thresholds.urgent_high {
        GlucoseRange::High
    } else {
        GlucoseRange::UrgentHigh
    }
}

impl GlucoseRange {
    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            GlucoseRange::UrgentLow => "URGENT LOW",
            GlucoseRange::Low => "LOW",
            GlucoseRange::WarningLow | GlucoseRange::WarningHigh => "WARNING",
            GlucoseRange::Normal => "IN RANGE",
            GlucoseRange::High => "HIGH",
            GlucoseRange::UrgentHigh => "URGENT HIGH",
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, GlucoseRange::WarningLow | GlucoseRange::WarningHigh)
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self, GlucoseRange::UrgentLow | GlucoseRange::UrgentHigh)
    }
}
