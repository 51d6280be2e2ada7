pub mod alarm;
pub mod eta;
pub mod geo;
pub mod motion;
pub mod sampling;
pub mod session;
pub mod speed;

/// Minimum possible interval between location re-evaluations (seconds).
pub const MIN_INTERVAL_SECS: u64 = 30;

/// Assumed walking speed used to seed the estimator and as the ETA
/// fallback for a stationary user: 5 km/h in km/min.
pub const WALKING_SPEED_KM_PER_MIN: f64 = 5.0 / 60.0;

/// Fast-path admission threshold: a jump of 50 m forces a re-evaluation
/// regardless of the adaptive interval.
pub const MOVEMENT_FAST_PATH_KM: f64 = 0.05;

/// Smoothed speeds below this are treated as standing still.
pub const SPEED_EPSILON_KM_PER_MIN: f64 = 1e-3;

/// Minimum smoothed speed at which the alarm is allowed to fire,
/// so a stale low ETA while parked does not ring (0.05 km/min = 3 km/h).
pub const MOVING_THRESHOLD_KM_PER_MIN: f64 = 0.05;

#[derive(Debug, PartialEq, Eq)]
pub enum SessionError {
    /// `start` called before a destination was set.
    MissingDestination,
    /// `start` called before any position fix arrived.
    AwaitingLocation,
    /// Alert lead time outside 1..=30 minutes.
    InvalidAlertTime(u32),
    /// Non-finite or out-of-range latitude/longitude.
    InvalidCoordinate,
}
