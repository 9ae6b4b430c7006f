//! C6: decides per tick whether the composite index is published, and the
//! micro-unit rounding applied at the publication boundary.

use std::collections::HashSet;

use chrono::{DateTime, Timelike, Utc};

/// Sentinel meaning "never published", matching the spec's `-1` init value.
const NEVER_PUBLISHED: i64 = -1;

#[derive(Debug, Clone)]
pub struct PublicationGate {
    last_publish_hour: i64,
}

impl PublicationGate {
    pub fn new() -> Self {
        Self { last_publish_hour: NEVER_PUBLISHED }
    }

    /// Returns whether this tick should publish, mutating `last_publish_hour`
    /// when it does.
    pub fn decide(&mut self, now: DateTime<Utc>, publish_hours: &HashSet<u8>, discovery_phase: bool) -> bool {
        if !discovery_phase {
            return true;
        }
        let hour = now.hour() as u8;
        let minute = now.minute();
        let eligible = publish_hours.contains(&hour) && minute < 10 && self.last_publish_hour != hour as i64;
        if eligible {
            self.last_publish_hour = hour as i64;
        }
        eligible
    }
}

impl Default for PublicationGate {
    fn default() -> Self {
        Self::new()
    }
}

/// `round(x * 1e6)`, half away from zero, as required at the oracle
/// publication boundary.
pub fn to_micro_units(x: f64) -> u64 {
    let scaled = x * 1_000_000.0;
    let rounded = if scaled >= 0.0 { (scaled + 0.5).floor() } else { (scaled - 0.5).ceil() };
    rounded.max(0.0) as u64
}
