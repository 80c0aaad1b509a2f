//! Per-kind alert rate limiting.

use crate::alerts::AlertKind;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Remembers when each alert kind last fired.
#[derive(Debug, Default, Clone)]
pub struct CooldownTracker {
    last_fired: HashMap<AlertKind, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `kind` may fire at `now` given its cooldown window.
    pub fn is_ready(&self, kind: AlertKind, cooldown: Duration, now: DateTime<Utc>) -> bool {
        match self.last_fired.get(&kind) {
            Some(last) => now - *last >= cooldown,
            None => true,
        }
    }

    /// Check and record in one step. Returns `true` when the alert may fire.
    pub fn try_fire(&mut self, kind: AlertKind, cooldown: Duration, now: DateTime<Utc>) -> bool {
        if !self.is_ready(kind, cooldown, now) {
            return false;
        }
        self.last_fired.insert(kind, now);
        true
    }

    pub fn last_fired(&self, kind: AlertKind) -> Option<DateTime<Utc>> {
        self.last_fired.get(&kind).copied()
    }
}
