use crate::MOVING_THRESHOLD_KM_PER_MIN;

/// Outbound seam for the alarm itself. Fire-and-forget: the sink plays
/// whatever sound/vibration it wants and reports nothing back.
pub trait AlertSink {
    fn fire(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Armed,
    Fired,
}

/// One-shot alarm gate. `Armed` -> `Fired` happens at most once per
/// session; only `reset` (a new start/stop cycle) re-arms it.
#[derive(Debug, Clone)]
pub struct AlarmTrigger {
    state: AlarmState,
}

impl AlarmTrigger {
    pub fn new() -> Self {
        Self {
            state: AlarmState::Armed,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.state == AlarmState::Fired
    }

    pub fn reset(&mut self) {
        self.state = AlarmState::Armed;
    }

    /// Returns true exactly once, when the ETA first drops inside the
    /// lead time while actually moving. The moving gate keeps a stale
    /// low ETA from ringing while the user is standing still.
    pub fn check(&mut self, eta_minutes: f64, alert_minutes: u32, speed_km_per_min: f64) -> bool {
        if self.state == AlarmState::Fired {
            return false;
        }
        if eta_minutes <= alert_minutes as f64 && speed_km_per_min > MOVING_THRESHOLD_KM_PER_MIN {
            self.state = AlarmState::Fired;
            return true;
        }
        false
    }
}

impl Default for AlarmTrigger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_and_only_once() {
        let mut trigger = AlarmTrigger::new();
        assert!(trigger.check(8.0, 10, 0.2));
        assert!(trigger.has_fired());
        // ETA keeps dropping below the threshold: no second firing.
        assert!(!trigger.check(5.0, 10, 0.2));
        assert!(!trigger.check(0.0, 10, 0.5));
    }

    #[test]
    fn moving_gate_blocks_stationary_alarm() {
        let mut trigger = AlarmTrigger::new();
        assert!(!trigger.check(5.0, 10, 0.0));
        assert!(!trigger.check(5.0, 10, MOVING_THRESHOLD_KM_PER_MIN));
        assert!(!trigger.has_fired());
    }

    #[test]
    fn does_not_fire_above_lead_time() {
        let mut trigger = AlarmTrigger::new();
        assert!(!trigger.check(10.1, 10, 0.5));
        assert!(trigger.check(10.0, 10, 0.5)); // boundary is inclusive
    }

    #[test]
    fn reset_rearms() {
        let mut trigger = AlarmTrigger::new();
        assert!(trigger.check(5.0, 10, 0.2));
        trigger.reset();
        assert!(!trigger.has_fired());
        assert!(trigger.check(5.0, 10, 0.2));
    }
}
