use chrono::{DateTime, Utc};
use geo_types::Point;

use crate::{geo, MIN_INTERVAL_SECS, MOVEMENT_FAST_PATH_KM};

/// Decides which position fixes are worth a full re-evaluation, and how
/// long to wait for the next mandatory one.
///
/// Far from the destination the interval stretches to a third of the ETA;
/// approaching it, each cycle cuts the interval by a factor of three,
/// never below the 30 s floor. A 50 m jump bypasses the interval entirely
/// so a sudden move is never delayed by a long wait.
#[derive(Debug, Clone)]
pub struct AdaptiveSampler {
    interval_secs: u64,
    last_evaluation_time: Option<DateTime<Utc>>,
    last_evaluated_position: Option<Point>,
}

impl AdaptiveSampler {
    pub fn new(alert_minutes: u32) -> Self {
        Self {
            // Initial interval = alert lead time, in seconds.
            interval_secs: (alert_minutes as u64 * 60).max(MIN_INTERVAL_SECS),
            last_evaluation_time: None,
            last_evaluated_position: None,
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    pub fn last_evaluation_time(&self) -> Option<DateTime<Utc>> {
        self.last_evaluation_time
    }

    pub fn last_evaluated_position(&self) -> Option<Point> {
        self.last_evaluated_position
    }

    /// Should this fix trigger a full evaluation?
    pub fn admit(&self, now: DateTime<Utc>, position: Point) -> bool {
        let Some(last_time) = self.last_evaluation_time else {
            // First fix of the session.
            return true;
        };

        let elapsed_secs = (now - last_time).num_seconds();
        if elapsed_secs >= self.interval_secs as i64 {
            return true;
        }

        match self.last_evaluated_position {
            Some(last_pos) => geo::haversine_km(last_pos, position) >= MOVEMENT_FAST_PATH_KM,
            None => true,
        }
    }

    pub fn mark_evaluated(&mut self, now: DateTime<Utc>, position: Point) {
        self.last_evaluation_time = Some(now);
        self.last_evaluated_position = Some(position);
    }

    /// Recompute the interval for the next cycle from the fresh ETA.
    pub fn reschedule(&mut self, eta_minutes: f64, alert_minutes: u32) {
        let next = if eta_minutes > 3.0 * alert_minutes as f64 {
            // Still far away: poll at a third of the remaining time.
            (eta_minutes * 60.0 / 3.0).floor() as u64
        } else {
            // Getting close: tighten sharply.
            self.interval_secs / 3
        };
        self.interval_secs = next.max(MIN_INTERVAL_SECS);
    }
}
