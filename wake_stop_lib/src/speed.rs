use crate::{SPEED_EPSILON_KM_PER_MIN, WALKING_SPEED_KM_PER_MIN};

/// Smoothing factor for the exponential moving average. GPS speed is
/// jittery; 0.5 tracks real changes within a couple of samples without
/// letting a single outlier swing the estimate.
const SMOOTHING_ALPHA: f64 = 0.5;

/// Exponentially smoothed speed estimate in km/min.
///
/// Prefers the device-reported instantaneous speed when the fix carries
/// one (vehicle GPS usually does), and falls back to the distance closed
/// toward the destination over elapsed time otherwise.
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    km_per_min: f64,
}

impl SpeedEstimator {
    pub fn new() -> Self {
        Self {
            km_per_min: WALKING_SPEED_KM_PER_MIN,
        }
    }

    pub fn km_per_min(&self) -> f64 {
        self.km_per_min
    }

    /// Re-seed to the assumed walking speed. Called on session start.
    pub fn reset(&mut self) {
        self.km_per_min = WALKING_SPEED_KM_PER_MIN;
    }

    /// Blend one instantaneous sample into the estimate.
    ///
    /// `reported_mps` is the GPS-reported speed if the fix had one.
    /// `distance_delta_km` is the distance closed toward the destination
    /// since the last evaluation, `None` on the very first evaluation.
    pub fn update(
        &mut self,
        reported_mps: Option<f64>,
        distance_delta_km: Option<f64>,
        elapsed_min: f64,
    ) {
        let instantaneous = if let Some(mps) = reported_mps.filter(|s| *s >= 0.0) {
            mps * 0.06 // m/s -> km/min
        } else if let Some(delta) = distance_delta_km {
            if elapsed_min > 0.0 {
                delta.abs() / elapsed_min
            } else {
                return;
            }
        } else {
            // First evaluation with no reported speed: keep the seed.
            return;
        };

        let blended = SMOOTHING_ALPHA * instantaneous + (1.0 - SMOOTHING_ALPHA) * self.km_per_min;
        self.km_per_min = if blended < SPEED_EPSILON_KM_PER_MIN {
            0.0
        } else {
            blended
        };
    }
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new()
    }
}
