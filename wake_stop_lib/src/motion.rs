use serde::{Deserialize, Serialize};

/// Threshold for significant motion (m/s^2). 1.5 is a reasonable value
/// for walking/transit.
const DEFAULT_MOTION_THRESHOLD: f64 = 1.5;

const GRAVITY_MPS2: f64 = 9.8;

/// One accelerometer reading. Some devices only expose acceleration
/// including gravity; `includes_gravity` records which kind this is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub includes_gravity: bool,
}

/// Turns raw accelerometer readings into the boolean "currently moving"
/// signal the session consumes as an advisory flag.
#[derive(Debug, Clone)]
pub struct MotionDetector {
    threshold_mps2: f64,
}

impl MotionDetector {
    pub fn new() -> Self {
        Self {
            threshold_mps2: DEFAULT_MOTION_THRESHOLD,
        }
    }

    pub fn with_threshold(threshold_mps2: f64) -> Self {
        Self { threshold_mps2 }
    }

    pub fn classify(&self, sample: &AccelSample) -> bool {
        let raw = (sample.x.powi(2) + sample.y.powi(2) + sample.z.powi(2)).sqrt();
        let magnitude = if sample.includes_gravity {
            // Rough gravity subtraction; good enough for a boolean.
            (raw - GRAVITY_MPS2).abs()
        } else {
            raw
        };
        magnitude > self.threshold_mps2
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new()
    }
}
