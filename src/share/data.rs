//! Data structures for glucose readings.

use crate::alerts::classify::{classify, GlucoseRange, Thresholds};
use crate::error::{Result, WatchError};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conversion factor between mg/dL and mmol/L.
pub const MGDL_PER_MMOL: f64 = 18.0182;

/// A single glucose measurement as reported by Share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlucoseReading {
    /// When the sensor took the reading
    pub timestamp: DateTime<Utc>,
    /// Glucose value in mg/dL
    pub value: i32,
    /// Rate-of-change indicator
    pub trend: Trend,
}

/// Direction and rate of glucose change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    None,
    DoubleUp,
    SingleUp,
    FortyFiveUp,
    Flat,
    FortyFiveDown,
    SingleDown,
    DoubleDown,
    NotComputable,
    RateOutOfRange,
}

/// Display units for glucose values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    MgDl,
    MmolL,
}

impl GlucoseReading {
    /// Create a new reading.
    pub fn new(timestamp: DateTime<Utc>, value: i32, trend: Trend) -> Self {
        Self {
            timestamp,
            value,
            trend,
        }
    }

    /// Display category using caller supplied thresholds.
    pub fn range_with(&self, thresholds: &Thresholds) -> GlucoseRange {
        classify(self.value, thresholds)
    }

    /// Seconds elapsed since the reading was taken, never negative.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.timestamp).num_seconds().max(0)
    }

    /// Format value and trend arrow in the given units, e.g. `"123 mg/dL →"`.
    pub fn display(&self, units: Units) -> String {
        format!("{} {}", units.format(self.value), self.trend.arrow())
    }
}

impl Trend {
    /// Arrow glyph used in the terminal and status output.
    pub fn arrow(&self) -> &'static str {
        match self {
            Trend::DoubleUp => "⇈",
            Trend::SingleUp => "↑",
            Trend::FortyFiveUp => "↗",
            Trend::Flat => "→",
            Trend::FortyFiveDown => "↘",
            Trend::SingleDown => "↓",
            Trend::DoubleDown => "⇊",
            Trend::None | Trend::NotComputable | Trend::RateOutOfRange => "?",
        }
    }

    /// Share's numeric trend index (0..=9).
    pub fn from_index(index: u8) -> Option<Self> {
        let trend = match index {
            0 => Trend::None,
            1 => Trend::DoubleUp,
            2 => Trend::SingleUp,
            3 => Trend::FortyFiveUp,
            4 => Trend::Flat,
            5 => Trend::FortyFiveDown,
            6 => Trend::SingleDown,
            7 => Trend::DoubleDown,
            8 => Trend::NotComputable,
            9 => Trend::RateOutOfRange,
            _ => return None,
        };
        Some(trend)
    }

    /// Share's trend name, as sent by the current API.
    pub fn from_name(name: &str) -> Option<Self> {
        let trend = match name {
            "None" => Trend::None,
            "DoubleUp" => Trend::DoubleUp,
            "SingleUp" => Trend::SingleUp,
            "FortyFiveUp" => Trend::FortyFiveUp,
            "Flat" => Trend::Flat,
            "FortyFiveDown" => Trend::FortyFiveDown,
            "SingleDown" => Trend::SingleDown,
            "DoubleDown" => Trend::DoubleDown,
            "NotComputable" => Trend::NotComputable,
            "RateOutOfRange" => Trend::RateOutOfRange,
            _ => return None,
        };
        Some(trend)
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Units {
    /// Format an mg/dL value in these units.
    pub fn format(&self, mg_dl: i32) -> String {
        match self {
            Units::MgDl => format!("{} mg/dL", mg_dl),
            Units::MmolL => format!("{:.1} mmol/L", mg_dl as f64 / MGDL_PER_MMOL),
        }
    }

    /// Format a signed change between two readings.
    pub fn format_delta(&self, delta_mg_dl: i32) -> String {
        match self {
            Units::MgDl => format!("{:+}", delta_mg_dl),
            Units::MmolL => format!("{:+.1}", delta_mg_dl as f64 / MGDL_PER_MMOL),
        }
    }
}

/// Wire shape of one entry in `ReadPublisherLatestGlucoseValues`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawReading {
    #[serde(rename = "WT")]
    wt: String,
    value: i32,
    trend: RawTrend,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTrend {
    Name(String),
    Index(u8),
}

impl TryFrom<RawReading> for GlucoseReading {
    type Error = WatchError;

    fn try_from(raw: RawReading) -> Result<Self> {
        let timestamp = parse_share_date(&raw.wt)?;
        let trend = match raw.trend {
            RawTrend::Name(name) => Trend::from_name(&name),
            RawTrend::Index(index) => Trend::from_index(index),
        }
        .unwrap_or(Trend::NotComputable);

        Ok(GlucoseReading::new(timestamp, raw.value, trend))
    }
}

/// Parse the JSON body of a readings response, newest first.
pub fn parse_readings(body: &str) -> Result<Vec<GlucoseReading>> {
    let raw: Vec<RawReading> = serde_json::from_str(body)?;
    let mut readings = raw
        .into_iter()
        .map(GlucoseReading::try_from)
        .collect::<Result<Vec<_>>>()?;

    readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(readings)
}

/// Parse a .NET style date such as `Date(1691455258000)` or
/// `/Date(1691455258000-0700)/`.
///
/// The epoch milliseconds are already UTC; a trailing offset is ignored.
pub fn parse_share_date(raw: &str) -> Result<DateTime<Utc>> {
    let inner = raw
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or_else(|| WatchError::parse_error(format!("Malformed date: {}", raw)))?;

    let digits_end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i)
        .unwrap_or(inner.len());

    let millis: i64 = inner[..digits_end]
        .parse()
        .map_err(|_| WatchError::parse_error(format!("Malformed date: {}", raw)))?;

    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| WatchError::parse_error(format!("Date out of range: {}", raw)))
}
