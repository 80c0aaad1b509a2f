//! Observable monitor state.

use crate::alerts::GlucoseRange;
use crate::share::{GlucoseReading, Units};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// No session; polling stopped until credentials are supplied again
    Unauthenticated,
    /// Login in progress
    Authenticating,
    /// Session valid, polling on the sensor cadence
    Polling,
    /// Last poll failed, waiting out the backoff
    Backoff,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Unauthenticated => "unauthenticated",
            MonitorState::Authenticating => "authenticating",
            MonitorState::Polling => "polling",
            MonitorState::Backoff => "backoff",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of the monitor, published every display tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub state: MonitorState,
    /// Newest reading, if any poll has succeeded
    pub latest: Option<GlucoseReading>,
    /// Change from the previous reading in mg/dL
    pub delta: Option<i32>,
    /// Band of the newest reading under the configured thresholds
    pub range: Option<GlucoseRange>,
    pub seconds_until_refresh: Option<i64>,
    pub seconds_since_reading: Option<i64>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub recovery_suggestion: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl MonitorStatus {
    /// Status before anything has happened.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            state: MonitorState::Unauthenticated,
            latest: None,
            delta: None,
            range: None,
            seconds_until_refresh: None,
            seconds_since_reading: None,
            consecutive_failures: 0,
            last_error: None,
            recovery_suggestion: None,
            updated_at: now,
        }
    }

    /// One-line summary, e.g. `"123 mg/dL → (+2) IN RANGE, 2m ago"`.
    pub fn summary(&self, units: Units) -> String {
        let Some(reading) = &self.latest else {
            return match &self.last_error {
                Some(err) => format!("No data: {}", err),
                None => format!("No data ({})", self.state),
            };
        };

        let mut line = reading.display(units);
        if let Some(delta) = self.delta {
            line.push_str(&format!(" ({})", units.format_delta(delta)));
        }
        if let Some(range) = self.range {
            line.push(' ');
            line.push_str(range.label());
        }
        if let Some(age) = self.seconds_since_reading {
            line.push_str(&format!(", {}m ago", age / 60));
        }
        if self.last_error.is_some() {
            line.push_str(" [refresh failing]");
        }
        line
    }

    /// Whether the published reading is older than `stale_after_seconds`.
    pub fn is_stale(&self, stale_after_seconds: i64) -> bool {
        self.seconds_since_reading
            .map(|age| age > stale_after_seconds)
            .unwrap_or(false)
    }
}
