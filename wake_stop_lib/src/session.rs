use chrono::{DateTime, Utc};
use geo_types::{point, Point};
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmTrigger, AlertSink};
use crate::sampling::AdaptiveSampler;
use crate::speed::SpeedEstimator;
use crate::{eta, geo, SessionError};

/// One raw fix from the location provider. `speed_mps` is the
/// device-reported instantaneous speed, frequently unsupported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionSample {
    pub position: Point,
    pub speed_mps: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(position: Point, speed_mps: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            position,
            speed_mps,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub position: Point,
    pub name: String,
}

/// Read-only view for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub current_location: Option<Point>,
    pub destination: Option<Destination>,
    pub is_tracking: bool,
    pub alert_minutes: u32,
    pub distance_km: f64,
    pub eta_minutes: f64,
    pub speed_km_per_min: f64,
    pub interval_secs: u64,
    pub is_moving: bool,
    pub has_alerted: bool,
}

/// One tracking session: owns the estimator, the adaptive sampler and the
/// one-shot alarm gate, and is driven by position samples, motion flags
/// and a once-per-second tick.
///
/// Every admitted fix updates distance, speed, ETA and the sampler
/// bookkeeping in one step; rejected fixes only refresh
/// `current_location` for display.
pub struct TrackingSession<S: AlertSink> {
    sink: S,
    destination: Option<Destination>,
    current_location: Option<Point>,
    alert_minutes: u32,
    estimator: SpeedEstimator,
    sampler: AdaptiveSampler,
    trigger: AlarmTrigger,
    distance_km: f64,
    eta_minutes: f64,
    is_tracking: bool,
    is_moving: bool,
}

impl<S: AlertSink> TrackingSession<S> {
    pub fn new(sink: S) -> Self {
        let alert_minutes = 10;
        Self {
            sink,
            destination: None,
            current_location: None,
            alert_minutes,
            estimator: SpeedEstimator::new(),
            sampler: AdaptiveSampler::new(alert_minutes),
            trigger: AlarmTrigger::new(),
            distance_km: 0.0,
            eta_minutes: 0.0,
            is_tracking: false,
            is_moving: false,
        }
    }

    /// Replace the destination. Allowed at any time, does not start or
    /// stop tracking by itself.
    pub fn set_destination(
        &mut self,
        lat: f64,
        lng: f64,
        name: impl Into<String>,
    ) -> Result<(), SessionError> {
        validate_coordinate(lat, lng)?;
        self.destination = Some(Destination {
            position: point!(x: lng, y: lat),
            name: name.into(),
        });
        Ok(())
    }

    /// Begin a fresh session with the given alert lead time.
    pub fn start(&mut self, alert_minutes: u32) -> Result<(), SessionError> {
        if !(1..=30).contains(&alert_minutes) {
            return Err(SessionError::InvalidAlertTime(alert_minutes));
        }
        let Some(destination) = &self.destination else {
            return Err(SessionError::MissingDestination);
        };
        let Some(location) = self.current_location else {
            return Err(SessionError::AwaitingLocation);
        };

        self.alert_minutes = alert_minutes;
        self.trigger.reset();
        self.estimator.reset();
        self.sampler = AdaptiveSampler::new(alert_minutes);

        // Initial estimate from whatever we know right now; the first
        // admitted fix replaces it.
        self.distance_km = geo::haversine_km(location, destination.position);
        self.eta_minutes = eta::estimate_minutes(self.distance_km, self.estimator.km_per_min());

        self.is_tracking = true;
        Ok(())
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        self.is_tracking = false;
        self.trigger.reset();
    }

    /// Feed one raw fix. Always refreshes the displayed location;
    /// estimation and the alarm check only run while tracking, and only
    /// for admitted fixes.
    pub fn feed_position(&mut self, sample: PositionSample) -> Result<(), SessionError> {
        validate_coordinate(sample.position.y(), sample.position.x())?;

        self.current_location = Some(sample.position);

        if !self.is_tracking {
            return Ok(());
        }
        if self.sampler.admit(sample.timestamp, sample.position) {
            self.evaluate(sample);
        }
        Ok(())
    }

    /// Store the advisory motion flag. Nothing else reacts to it: the
    /// 50 m fast path already catches actual movement.
    pub fn feed_motion(&mut self, is_moving: bool) {
        self.is_moving = is_moving;
    }

    /// Once-per-second countdown so the displayed ETA moves between
    /// evaluations. Cosmetic only; any admitted fix overwrites it.
    pub fn tick(&mut self) {
        if self.is_tracking {
            self.eta_minutes = (self.eta_minutes - 1.0 / 60.0).max(0.0);
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_location: self.current_location,
            destination: self.destination.clone(),
            is_tracking: self.is_tracking,
            alert_minutes: self.alert_minutes,
            distance_km: self.distance_km,
            eta_minutes: self.eta_minutes,
            speed_km_per_min: self.estimator.km_per_min(),
            interval_secs: self.sampler.interval_secs(),
            is_moving: self.is_moving,
            has_alerted: self.trigger.has_fired(),
        }
    }

    fn evaluate(&mut self, sample: PositionSample) {
        let Some(destination) = &self.destination else {
            // Tracking without a destination cannot happen via start(),
            // but a missing destination must never panic here.
            return;
        };

        let distance_km = geo::haversine_km(sample.position, destination.position);

        let (distance_delta_km, elapsed_min) = match self.sampler.last_evaluation_time() {
            Some(last) => {
                let elapsed = (sample.timestamp - last).num_milliseconds() as f64 / 60_000.0;
                (Some(self.distance_km - distance_km), elapsed)
            }
            None => (None, 0.0),
        };

        self.estimator
            .update(sample.speed_mps, distance_delta_km, elapsed_min);
        let eta_minutes = eta::estimate_minutes(distance_km, self.estimator.km_per_min());

        if self
            .trigger
            .check(eta_minutes, self.alert_minutes, self.estimator.km_per_min())
        {
            self.sink.fire();
        }

        self.distance_km = distance_km;
        self.eta_minutes = eta_minutes;
        self.sampler.mark_evaluated(sample.timestamp, sample.position);
        self.sampler.reschedule(eta_minutes, self.alert_minutes);
    }
}

fn validate_coordinate(lat: f64, lng: f64) -> Result<(), SessionError> {
    if !lat.is_finite() || !lng.is_finite() {
        return Err(SessionError::InvalidCoordinate);
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(SessionError::InvalidCoordinate);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MIN_INTERVAL_SECS, WALKING_SPEED_KM_PER_MIN};
    use chrono::TimeDelta;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct CountingSink {
        fired: Rc<Cell<u32>>,
    }

    impl AlertSink for CountingSink {
        fn fire(&mut self) {
            self.fired.set(self.fired.get() + 1);
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn sample(lat: f64, lng: f64, speed_mps: Option<f64>, at: DateTime<Utc>) -> PositionSample {
        PositionSample::new(point!(x: lng, y: lat), speed_mps, at)
    }

    // Destination ~10.000 km due north of (56.0, 10.0).
    const TEN_KM_NORTH: f64 = 56.0 + 0.0899322;

    fn started_session() -> (TrackingSession<CountingSink>, Rc<Cell<u32>>) {
        let sink = CountingSink::default();
        let fired = sink.fired.clone();
        let mut session = TrackingSession::new(sink);
        session.set_destination(TEN_KM_NORTH, 10.0, "Stop").unwrap();
        session.feed_position(sample(56.0, 10.0, None, t0())).unwrap();
        session.start(10).unwrap();
        (session, fired)
    }

    #[test]
    fn start_requires_destination_then_location() {
        let mut session = TrackingSession::new(CountingSink::default());
        assert_eq!(session.start(10), Err(SessionError::MissingDestination));

        session.set_destination(56.0, 10.0, "Stop").unwrap();
        assert_eq!(session.start(10), Err(SessionError::AwaitingLocation));

        session.feed_position(sample(56.1, 10.0, None, t0())).unwrap();
        assert!(session.start(10).is_ok());
        assert!(session.snapshot().is_tracking);
    }

    #[test]
    fn rejects_out_of_range_alert_time() {
        let (mut session, _) = started_session();
        session.stop();
        assert_eq!(session.start(0), Err(SessionError::InvalidAlertTime(0)));
        assert_eq!(session.start(31), Err(SessionError::InvalidAlertTime(31)));
        assert!(!session.snapshot().is_tracking);
    }

    #[test]
    fn rejects_invalid_coordinates_without_touching_state() {
        let (mut session, _) = started_session();
        let before = session.snapshot();

        let bad = sample(f64::NAN, 10.0, None, t0() + TimeDelta::seconds(1));
        assert_eq!(session.feed_position(bad), Err(SessionError::InvalidCoordinate));
        let oob = sample(91.0, 10.0, None, t0() + TimeDelta::seconds(1));
        assert_eq!(session.feed_position(oob), Err(SessionError::InvalidCoordinate));
        assert_eq!(
            session.set_destination(56.0, 200.0, "Nowhere"),
            Err(SessionError::InvalidCoordinate)
        );

        let after = session.snapshot();
        assert_eq!(before.current_location, after.current_location);
        assert_eq!(before.eta_minutes, after.eta_minutes);
    }

    #[test]
    fn scenario_a_far_away_interval() {
        // 10 km at the seeded walking speed: ETA 120 min on start.
        let (mut session, _) = started_session();
        let snap = session.snapshot();
        assert!((snap.distance_km - 10.0).abs() < 0.01);
        assert!((snap.eta_minutes - 120.0).abs() < 0.1);
        assert_eq!(snap.interval_secs, 600); // alert time in seconds

        // First admitted fix keeps the seed speed, ETA stays ~120 which
        // is beyond 3x the lead time: interval becomes eta_secs / 3.
        session
            .feed_position(sample(56.0, 10.0, None, t0() + TimeDelta::seconds(1)))
            .unwrap();
        assert_eq!(session.snapshot().interval_secs, 2400);
    }

    #[test]
    fn scenario_b_one_shot_alarm() {
        let (mut session, fired) = started_session();
        session
            .feed_position(sample(56.0, 10.0, None, t0() + TimeDelta::seconds(1)))
            .unwrap();
        assert_eq!(fired.get(), 0);

        // 2 km out, moving fast: ETA drops inside the lead time.
        let close = 56.0 + 0.0899322 * 0.8;
        session
            .feed_position(sample(close, 10.0, Some(20.0), t0() + TimeDelta::seconds(300)))
            .unwrap();
        let snap = session.snapshot();
        assert!(snap.eta_minutes <= 10.0, "eta was {}", snap.eta_minutes);
        assert!(snap.has_alerted);
        assert_eq!(fired.get(), 1);

        // Still below the threshold on the next evaluations: no re-fire.
        let closer = 56.0 + 0.0899322 * 0.9;
        session
            .feed_position(sample(closer, 10.0, Some(20.0), t0() + TimeDelta::seconds(400)))
            .unwrap();
        session
            .feed_position(sample(TEN_KM_NORTH, 10.0, Some(20.0), t0() + TimeDelta::seconds(500)))
            .unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn scenario_c_restart_rearms_alarm() {
        let (mut session, fired) = started_session();
        let close = 56.0 + 0.0899322 * 0.8;
        session
            .feed_position(sample(close, 10.0, Some(20.0), t0() + TimeDelta::seconds(60)))
            .unwrap();
        assert_eq!(fired.get(), 1);

        session.stop();
        assert!(!session.snapshot().has_alerted);

        // Fresh session from the same spot: the alarm may ring again.
        session.start(10).unwrap();
        session
            .feed_position(sample(close, 10.0, Some(20.0), t0() + TimeDelta::seconds(120)))
            .unwrap();
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn scenario_d_rejected_sample_only_moves_display_location() {
        let (mut session, _) = started_session();
        session
            .feed_position(sample(56.0, 10.0, None, t0() + TimeDelta::seconds(1)))
            .unwrap();
        let before = session.snapshot();

        // ~20 m east, 5 s later, interval 2400 s: not admitted.
        let nudged = sample(56.0, 10.0 + 0.00032, Some(15.0), t0() + TimeDelta::seconds(6));
        session.feed_position(nudged).unwrap();

        let after = session.snapshot();
        assert_eq!(after.current_location, Some(nudged.position));
        assert_eq!(before.distance_km, after.distance_km);
        assert_eq!(before.eta_minutes, after.eta_minutes);
        assert_eq!(before.speed_km_per_min, after.speed_km_per_min);
        assert_eq!(before.interval_secs, after.interval_secs);
    }

    #[test]
    fn moving_gate_holds_alarm_while_stationary() {
        let sink = CountingSink::default();
        let fired = sink.fired.clone();
        let mut session = TrackingSession::new(sink);
        // Destination only ~200 m away: ETA is inside the lead time
        // immediately, but the user is not moving.
        session.set_destination(56.0 + 0.0018, 10.0, "Stop").unwrap();
        session.feed_position(sample(56.0, 10.0, None, t0())).unwrap();
        session.start(10).unwrap();

        let mut at = t0();
        for _ in 0..2 {
            at += TimeDelta::seconds(700);
            session.feed_position(sample(56.0, 10.0, Some(0.0), at)).unwrap();
            let snap = session.snapshot();
            assert!(snap.eta_minutes <= 10.0, "eta was {}", snap.eta_minutes);
            assert!(snap.speed_km_per_min <= crate::MOVING_THRESHOLD_KM_PER_MIN);
        }
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn interval_floor_survives_any_input() {
        let (mut session, _) = started_session();
        let mut at = t0();
        // Walk the whole way in; the close branch keeps dividing by 3.
        for step in 1..=20 {
            at += TimeDelta::seconds(3000);
            let lat = 56.0 + 0.0899322 * (step as f64 / 20.0);
            session.feed_position(sample(lat, 10.0, Some(30.0), at)).unwrap();
            assert!(session.snapshot().interval_secs >= MIN_INTERVAL_SECS);
        }
    }

    #[test]
    fn tick_counts_down_and_floors_at_zero() {
        let (mut session, _) = started_session();
        let before = session.snapshot().eta_minutes;
        for _ in 0..60 {
            session.tick();
        }
        let after = session.snapshot().eta_minutes;
        assert!((before - after - 1.0).abs() < 1e-9);

        for _ in 0..10_000 {
            session.tick();
        }
        assert_eq!(session.snapshot().eta_minutes, 0.0);
    }

    #[test]
    fn tick_is_inert_while_stopped() {
        let (mut session, _) = started_session();
        session.stop();
        let before = session.snapshot().eta_minutes;
        session.tick();
        assert_eq!(session.snapshot().eta_minutes, before);
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut session, _) = started_session();
        session.stop();
        session.stop();
        assert!(!session.snapshot().is_tracking);
    }

    #[test]
    fn fixes_update_display_location_while_stopped() {
        let mut session = TrackingSession::new(CountingSink::default());
        session.feed_position(sample(56.0, 10.0, None, t0())).unwrap();
        let snap = session.snapshot();
        assert_eq!(snap.current_location, Some(point!(x: 10.0, y: 56.0)));
        assert!(!snap.is_tracking);
        assert_eq!(snap.eta_minutes, 0.0);
    }

    #[test]
    fn motion_flag_is_advisory_only() {
        let (mut session, _) = started_session();
        let before = session.snapshot();
        session.feed_motion(true);
        let after = session.snapshot();
        assert!(after.is_moving);
        assert_eq!(before.eta_minutes, after.eta_minutes);
        assert_eq!(before.interval_secs, after.interval_secs);
    }

    #[test]
    fn distance_delta_fallback_estimates_speed() {
        let (mut session, _) = started_session();
        session
            .feed_position(sample(56.0, 10.0, None, t0() + TimeDelta::seconds(1)))
            .unwrap();

        // 1 km closed in 5 minutes with no reported speed: 0.2 km/min
        // instantaneous, blended 50/50 with the walking seed.
        let one_km_in = 56.0 + 0.0899322 * 0.1;
        session
            .feed_position(sample(one_km_in, 10.0, None, t0() + TimeDelta::seconds(301)))
            .unwrap();
        let snap = session.snapshot();
        let expected = 0.5 * 0.2 + 0.5 * WALKING_SPEED_KM_PER_MIN;
        assert!(
            (snap.speed_km_per_min - expected).abs() < 0.01,
            "speed was {}",
            snap.speed_km_per_min
        );
    }
}
