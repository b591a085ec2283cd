// src/scenario.rs
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;

use crate::types::{Drowsiness, Scenario};

/// Speed at which hands-off detection becomes active (scenarios 2 and 3).
pub const HANDS_OFF_MIN_SPEED: f64 = 20.0;
/// Scenario 1 ramps to this speed ...
const BASELINE_TOP_SPEED: f64 = 20.0;
/// ... over this long.
const BASELINE_RAMP: Duration = Duration::from_secs(40);
/// Chance per frame that the random walk picks a new target.
const RETARGET_PROBABILITY: f64 = 0.02;
const TARGET_SPEED_MIN: f64 = 20.0;
const TARGET_SPEED_MAX: f64 = 70.0;
const SPEED_STEP: f64 = 0.005;
const RANDOM_WALK_START_SPEED: f64 = 18.0;
/// Scenario 3 shows this value for a while after the first heartbeat.
pub const DEMO_BPM: f64 = 95.0;
const DEMO_BPM_HOLD: Duration = Duration::from_secs(5);
const REMAP_IN_LOW: f64 = 70.0;
const REMAP_IN_HIGH: f64 = 100.0;
const REMAP_OUT_LOW: f64 = 101.0;
const REMAP_OUT_HIGH: f64 = 115.0;
/// Scenario 3 raises the drowsiness warning above this rate.
pub const HIGH_HEART_RATE_BPM: f64 = 100.0;
/// Fixed synthetic IMU reading shown on the dashboard.
pub const DEMO_IMU: (f64, f64) = (0.2, 0.2);

/// Maps a smoothed BPM in [70, 100] onto [101, 115], clamping outside.
pub fn remap_high_heart_rate(bpm: f64) -> f64 {
    if bpm <= REMAP_IN_LOW {
        REMAP_OUT_LOW
    } else if bpm >= REMAP_IN_HIGH {
        REMAP_OUT_HIGH
    } else {
        REMAP_OUT_LOW
            + (REMAP_OUT_HIGH - REMAP_OUT_LOW) * (bpm - REMAP_IN_LOW) / (REMAP_IN_HIGH - REMAP_IN_LOW)
    }
}

/// Synthetic vehicle state and BPM interpretation for the selected scenario.
pub struct ScenarioController<R: Rng = StdRng> {
    rng: R,
    scenario: Option<Scenario>,
    started_at: Instant,
    speed: f64,
    target_speed: f64,
    detected_at: Option<Instant>,
}

impl<R: Rng> ScenarioController<R> {
    pub fn with_rng(rng: R, now: Instant) -> Self {
        Self {
            rng,
            scenario: None,
            started_at: now,
            speed: 0.0,
            target_speed: 0.0,
            detected_at: None,
        }
    }

    pub fn scenario(&self) -> Option<Scenario> {
        self.scenario
    }

    #[cfg(test)]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    #[cfg(test)]
    pub fn target_speed(&self) -> f64 {
        self.target_speed
    }

    /// Start (or restart) a scenario; all scenario state is reset.
    pub fn select(&mut self, scenario: Scenario, now: Instant) {
        self.scenario = Some(scenario);
        self.started_at = now;
        self.detected_at = None;
        match scenario {
            Scenario::Baseline => {
                self.speed = 0.0;
                self.target_speed = 0.0;
            }
            Scenario::HandsOff | Scenario::HighHeartRate => {
                self.speed = RANDOM_WALK_START_SPEED;
                self.target_speed = self.rng.gen_range(TARGET_SPEED_MIN..=TARGET_SPEED_MAX);
            }
        }
    }

    pub fn clear(&mut self) {
        self.scenario = None;
        self.speed = 0.0;
        self.target_speed = 0.0;
        self.detected_at = None;
    }

    /// Advance the speed model by one frame and return the new speed.
    pub fn advance(&mut self, now: Instant) -> f64 {
        self.speed = match self.scenario {
            None => 0.0,
            Some(Scenario::Baseline) => {
                let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
                (BASELINE_TOP_SPEED * elapsed / BASELINE_RAMP.as_secs_f64()).min(BASELINE_TOP_SPEED)
            }
            Some(Scenario::HandsOff | Scenario::HighHeartRate) => {
                if self.rng.gen_bool(RETARGET_PROBABILITY) {
                    self.target_speed = self.rng.gen_range(TARGET_SPEED_MIN..=TARGET_SPEED_MAX);
                }
                if self.target_speed > self.speed {
                    (self.speed + SPEED_STEP).min(self.target_speed)
                } else {
                    (self.speed - SPEED_STEP).max(self.target_speed)
                }
            }
        };
        self.speed
    }

    pub fn hands_off_detection_enabled(&self) -> bool {
        matches!(
            self.scenario,
            Some(Scenario::HandsOff | Scenario::HighHeartRate)
        ) && self.speed >= HANDS_OFF_MIN_SPEED
    }

    /// Turn the smoothed BPM into the value shown for this scenario.
    pub fn interpret_bpm(&mut self, smoothed: f64, now: Instant) -> f64 {
        if self.scenario != Some(Scenario::HighHeartRate) {
            return smoothed;
        }
        let detected_at = *self.detected_at.get_or_insert(now);
        if now.saturating_duration_since(detected_at) < DEMO_BPM_HOLD {
            DEMO_BPM
        } else {
            remap_high_heart_rate(smoothed)
        }
    }

    /// `bpm` is the displayed value, 0 when there is none.
    pub fn classify_drowsiness(&self, bpm: f64) -> Drowsiness {
        if bpm <= 0.0 {
            Drowsiness::NoValue
        } else if self.scenario == Some(Scenario::HighHeartRate) && bpm > HIGH_HEART_RATE_BPM {
            Drowsiness::Warning
        } else {
            Drowsiness::NoWarning
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;

    fn controller(now: Instant) -> ScenarioController {
        ScenarioController::with_rng(StdRng::seed_from_u64(11), now)
    }

    #[test]
    fn remap_table() {
        assert_eq!(remap_high_heart_rate(70.0), 101.0);
        assert_eq!(remap_high_heart_rate(100.0), 115.0);
        assert!((remap_high_heart_rate(85.0) - 108.0).abs() < 1e-9);
        assert_eq!(remap_high_heart_rate(60.0), 101.0);
        assert_eq!(remap_high_heart_rate(120.0), 115.0);
    }

    #[test]
    fn baseline_ramps_to_twenty_and_never_detects_hands_off() {
        let t0 = Instant::now();
        let mut c = controller(t0);
        c.select(Scenario::Baseline, t0);
        assert!((c.advance(t0 + Duration::from_secs(20)) - 10.0).abs() < 1e-9);
        assert_eq!(c.advance(t0 + Duration::from_secs(40)), 20.0);
        assert_eq!(c.advance(t0 + Duration::from_secs(400)), 20.0);
        assert!(!c.hands_off_detection_enabled());
    }

    #[test]
    fn random_walk_moves_in_small_steps_within_bounds() {
        let t0 = Instant::now();
        let mut c = controller(t0);
        c.select(Scenario::HandsOff, t0);
        assert_eq!(c.speed(), 18.0);
        assert!(!c.hands_off_detection_enabled());
        let mut previous = c.speed();
        for _ in 0..5_000 {
            let speed = c.advance(t0);
            assert!((speed - previous).abs() <= SPEED_STEP + 1e-12);
            assert!((TARGET_SPEED_MIN..=TARGET_SPEED_MAX).contains(&c.target_speed()));
            previous = speed;
        }
        // 5000 frames of upward steps take 18.0 past 20.0
        assert!(c.speed() >= HANDS_OFF_MIN_SPEED);
        assert!(c.hands_off_detection_enabled());
    }

    #[test]
    fn speed_targets_cover_both_ends_of_the_range() {
        let t0 = Instant::now();
        let mut top = ScenarioController::with_rng(StepRng::new(u64::MAX, 0), t0);
        top.select(Scenario::HighHeartRate, t0);
        assert_eq!(top.target_speed(), TARGET_SPEED_MAX);
        let mut bottom = ScenarioController::with_rng(StepRng::new(0, 0), t0);
        bottom.select(Scenario::HandsOff, t0);
        assert_eq!(bottom.target_speed(), TARGET_SPEED_MIN);
    }

    #[test]
    fn no_scenario_means_standstill() {
        let t0 = Instant::now();
        let mut c = controller(t0);
        assert_eq!(c.advance(t0 + Duration::from_secs(3)), 0.0);
        assert!(!c.hands_off_detection_enabled());
        assert_eq!(c.classify_drowsiness(0.0), Drowsiness::NoValue);
    }

    #[test]
    fn high_heart_rate_holds_demo_value_then_remaps() {
        let t0 = Instant::now();
        let mut c = controller(t0);
        c.select(Scenario::HighHeartRate, t0);
        let first = t0 + Duration::from_secs(12);
        assert_eq!(c.interpret_bpm(62.0, first), DEMO_BPM);
        assert_eq!(c.interpret_bpm(180.0, first + Duration::from_millis(4_999)), DEMO_BPM);
        assert_eq!(c.interpret_bpm(85.0, first + Duration::from_secs(5)), 108.0);
        c.select(Scenario::HighHeartRate, first + Duration::from_secs(6));
        assert_eq!(c.interpret_bpm(85.0, first + Duration::from_secs(7)), DEMO_BPM);
    }

    #[test]
    fn drowsiness_warning_only_in_scenario_three() {
        let t0 = Instant::now();
        let mut c = controller(t0);
        c.select(Scenario::HandsOff, t0);
        assert_eq!(c.interpret_bpm(85.0, t0), 85.0);
        assert_eq!(c.classify_drowsiness(150.0), Drowsiness::NoWarning);
        c.select(Scenario::HighHeartRate, t0);
        assert_eq!(c.classify_drowsiness(100.0), Drowsiness::NoWarning);
        assert_eq!(c.classify_drowsiness(100.5), Drowsiness::Warning);
        assert_eq!(c.classify_drowsiness(0.0), Drowsiness::NoValue);
    }
}
