use crate::{SPEED_EPSILON_KM_PER_MIN, WALKING_SPEED_KM_PER_MIN};

/// Time to destination in minutes at the smoothed speed.
///
/// A stationary user still gets a finite estimate: "if they started
/// walking now", at the assumed walking speed.
pub fn estimate_minutes(distance_km: f64, speed_km_per_min: f64) -> f64 {
    if speed_km_per_min > SPEED_EPSILON_KM_PER_MIN {
        distance_km / speed_km_per_min
    } else {
        distance_km / WALKING_SPEED_KM_PER_MIN
    }
}
