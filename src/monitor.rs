// src/monitor.rs
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::Rng;

use crate::arbiter::{decide, FrameState, OutputDecision, NO_BPM};
use crate::config::MonitorConfig;
use crate::drivers::pipeline::BpmEstimator;
use crate::drivers::MonitorError;
use crate::heart_utils::BpmHistory;
use crate::indicator::HeartbeatIndicator;
use crate::presence::{PresenceTracker, Transition};
use crate::scenario::{ScenarioController, DEMO_IMU};
use crate::types::{HandsStatus, Scenario, Snapshot};

/// Result of one control-loop frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub snapshot: Snapshot,
    pub decision: OutputDecision,
    pub transition: Option<Transition>,
}

/// All state of the monitoring pipeline, owned by the control loop.
pub struct MonitorSession<R: Rng> {
    presence: PresenceTracker,
    estimator: BpmEstimator,
    history: BpmHistory,
    scenario: ScenarioController<R>,
    indicator: HeartbeatIndicator,
    update_interval: Duration,
    last_update: Instant,
    /// Value shown on screen; 0 means "no value".
    last_bpm: f64,
    first_heartbeat: bool,
}

pub fn format_bpm(bpm: f64) -> String {
    if bpm > 0.0 {
        format!("{bpm:.1}")
    } else {
        NO_BPM.to_owned()
    }
}

impl<R: Rng> MonitorSession<R> {
    pub fn new(config: &MonitorConfig, rng: R, now: Instant) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self {
            presence: PresenceTracker::new(config.finger_threshold, config.grace()),
            estimator: BpmEstimator::from_config(config)?,
            history: BpmHistory::with_bounds(config.history_len, config.bpm_min..config.bpm_max),
            scenario: ScenarioController::with_rng(rng, now),
            indicator: HeartbeatIndicator::new(now),
            update_interval: config.update_interval(),
            last_update: now,
            last_bpm: 0.0,
            first_heartbeat: false,
        })
    }

    pub fn scenario(&self) -> Option<Scenario> {
        self.scenario.scenario()
    }

    #[cfg(test)]
    pub fn history(&self) -> &BpmHistory {
        &self.history
    }

    #[cfg(test)]
    pub fn estimator(&self) -> &BpmEstimator {
        &self.estimator
    }

    #[cfg(test)]
    pub fn displayed_bpm(&self) -> f64 {
        self.last_bpm
    }

    /// Start a scenario from scratch: measurement, heartbeat and speed state
    /// are all reset.
    pub fn select_scenario(&mut self, scenario: Scenario, now: Instant) {
        self.scenario.select(scenario, now);
        self.reset_measurement(now);
        info!("{scenario} selected");
    }

    pub fn stop_scenario(&mut self, now: Instant) {
        self.scenario.clear();
        self.reset_measurement(now);
    }

    fn reset_measurement(&mut self, now: Instant) {
        self.presence.rearm();
        self.estimator.reset();
        self.history.clear();
        self.first_heartbeat = false;
        self.last_bpm = 0.0;
        self.last_update = now;
    }

    /// Run one frame on a single IR sample.
    pub fn step(&mut self, intensity: f64, now: Instant) -> FrameReport {
        // 1. synthetic vehicle state
        let speed = self.scenario.advance(now);
        let hands_off_detection = self.scenario.hands_off_detection_enabled();

        // 2. finger presence
        let transition = self.presence.update(intensity, now);
        match transition {
            Some(Transition::Removed) => {
                self.estimator.reset();
                self.history.clear();
                self.first_heartbeat = false;
                self.last_update = now;
            }
            Some(Transition::Placed) => {
                self.estimator.reset();
                self.history.clear();
            }
            None => {}
        }

        // 3. heart rate
        if self.presence.is_on() {
            self.estimator.push(intensity);
            if now.saturating_duration_since(self.last_update) >= self.update_interval
                && self.estimator.is_ready()
            {
                self.refresh_bpm(now);
                self.last_update = now;
            }
        } else if self.presence.grace_expired(now) {
            self.last_bpm = 0.0;
        }

        // 4. indicators and classification
        let lit = self
            .indicator
            .tick(now, self.first_heartbeat.then_some(self.last_bpm));
        let bpm_display = format_bpm(self.last_bpm);
        let drowsiness = self.scenario.classify_drowsiness(self.last_bpm);
        let hands = if !hands_off_detection {
            HandsStatus::DetectionOff
        } else if self.presence.is_on() {
            HandsStatus::HandsOn
        } else {
            HandsStatus::HandsOff
        };

        // 5. output decision
        let decision = decide(&FrameState {
            scenario: self.scenario.scenario(),
            hands,
            hands_off_detection,
            drowsiness,
            bpm_display: &bpm_display,
        });
        let snapshot = Snapshot {
            scenario: self.scenario.scenario(),
            speed,
            imu: DEMO_IMU,
            presence: self.presence.state(),
            heartbeat_lit: lit && self.presence.is_on(),
            measuring: self.presence.is_on() && !self.first_heartbeat,
            bpm_display,
            hands,
            drowsiness,
        };
        FrameReport {
            snapshot,
            decision,
            transition,
        }
    }

    fn refresh_bpm(&mut self, now: Instant) {
        match self.estimator.estimate() {
            Ok(Some(bpm)) => {
                if self.history.accept(bpm) {
                    debug!("accepted {bpm:.1} bpm");
                } else {
                    debug!("discarded implausible {bpm:.1} bpm");
                }
            }
            Ok(None) => debug!("not enough beats in window"),
            Err(e) => debug!("estimate skipped: {e}"),
        }
        if let Some(smoothed) = self.history.mean() {
            self.last_bpm = self.scenario.interpret_bpm(smoothed, now);
            if !self.first_heartbeat {
                info!("first heartbeat: {:.1} bpm", self.last_bpm);
                self.first_heartbeat = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::{HANDS_OFF_TEXT, HIGH_HEART_RATE_TEXT};
    use crate::drivers::source::{SampleSource, SimulatedPpg};
    use crate::scenario::DEMO_BPM;
    use crate::types::{Drowsiness, Presence, Rgb};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FRAME: Duration = Duration::from_millis(10);

    struct Rig {
        session: MonitorSession<StdRng>,
        sensor: SimulatedPpg,
        now: Instant,
    }

    impl Rig {
        fn new(bpm: f64) -> Self {
            let now = Instant::now();
            let session =
                MonitorSession::new(&MonitorConfig::default(), StdRng::seed_from_u64(5), now)
                    .unwrap();
            Self {
                session,
                sensor: SimulatedPpg::new(100.0, bpm, 9),
                now,
            }
        }

        fn run(&mut self, frames: usize) -> FrameReport {
            let mut report = None;
            for _ in 0..frames {
                self.now += FRAME;
                let sample = self.sensor.read_sample().unwrap();
                report = Some(self.session.step(sample, self.now));
            }
            report.unwrap()
        }

        fn run_off(&mut self, frames: usize) -> FrameReport {
            let mut report = None;
            for _ in 0..frames {
                self.now += FRAME;
                report = Some(self.session.step(500.0, self.now));
            }
            report.unwrap()
        }
    }

    #[test]
    fn reports_heart_rate_after_a_full_window() {
        let mut rig = Rig::new(72.0);
        rig.session.select_scenario(Scenario::Baseline, rig.now);
        let report = rig.run(500);
        assert_eq!(report.snapshot.bpm_display, "--");
        assert!(report.snapshot.measuring);
        assert_eq!(report.decision.color, Rgb::GRAY);
        let report = rig.run(700);
        let bpm = rig.session.displayed_bpm();
        assert!((bpm - 72.0).abs() < 4.0, "bpm {bpm}");
        assert!(!report.snapshot.measuring);
        assert_eq!(report.snapshot.drowsiness, Drowsiness::NoWarning);
        assert_eq!(report.decision.color, Rgb::GREEN);
        assert!(!report.decision.buzzer);
    }

    #[test]
    fn removal_zeroes_bpm_only_after_grace() {
        let mut rig = Rig::new(72.0);
        rig.session.select_scenario(Scenario::Baseline, rig.now);
        rig.run(1200);
        let shown = rig.session.displayed_bpm();
        assert!(shown > 0.0);
        let report = rig.run_off(150);
        assert_eq!(report.snapshot.presence, Presence::Off);
        assert!(rig.session.history().is_empty());
        assert!(rig.session.estimator().window().is_empty());
        assert_eq!(report.snapshot.bpm_display, format_bpm(shown));
        let report = rig.run_off(60);
        assert_eq!(rig.session.displayed_bpm(), 0.0);
        assert_eq!(report.snapshot.bpm_display, "--");
        assert_eq!(report.snapshot.drowsiness, Drowsiness::NoValue);
    }

    #[test]
    fn placing_finger_starts_from_empty_buffers() {
        let mut rig = Rig::new(72.0);
        rig.session.select_scenario(Scenario::Baseline, rig.now);
        rig.run(1200);
        rig.run_off(10);
        rig.now += FRAME;
        let report = rig.session.step(30_000.0, rig.now);
        assert_eq!(report.transition, Some(Transition::Placed));
        assert!(rig.session.history().is_empty());
        assert_eq!(rig.session.estimator().window().len(), 1);
    }

    #[test]
    fn removal_forgets_the_established_heartbeat() {
        let mut rig = Rig::new(72.0);
        rig.session.select_scenario(Scenario::Baseline, rig.now);
        let report = rig.run(1200);
        assert!(!report.snapshot.measuring);
        rig.run_off(10);
        let mut previous = rig.run(1);
        assert_eq!(previous.transition, Some(Transition::Placed));
        assert!(previous.snapshot.measuring);
        // back to the 0.5 s search blink: 4 toggles in 2 s, not 2 at 72 bpm
        let mut toggles = 0;
        for _ in 0..200 {
            let report = rig.run(1);
            assert!(report.snapshot.measuring);
            if report.snapshot.heartbeat_lit != previous.snapshot.heartbeat_lit {
                toggles += 1;
            }
            previous = report;
        }
        assert_eq!(toggles, 4);
    }

    #[test]
    fn estimates_at_most_once_per_update_interval() {
        let mut rig = Rig::new(72.0);
        rig.session.select_scenario(Scenario::Baseline, rig.now);
        rig.run(1000);
        assert_eq!(rig.session.history().len(), 1);
        // 3.5 s more: updates at 11 s, 12 s and 13 s only
        rig.run(350);
        assert_eq!(rig.session.history().len(), 4);
    }

    #[test]
    fn rejects_durations_out_of_range() {
        let config = MonitorConfig {
            grace_secs: f64::NAN,
            ..MonitorConfig::default()
        };
        assert!(MonitorSession::new(&config, StdRng::seed_from_u64(1), Instant::now()).is_err());
        let config = MonitorConfig {
            update_interval_secs: 1e300,
            ..MonitorConfig::default()
        };
        assert!(MonitorSession::new(&config, StdRng::seed_from_u64(1), Instant::now()).is_err());
    }

    #[test]
    fn scenario_three_holds_demo_value_then_warns() {
        let mut rig = Rig::new(90.0);
        rig.session.select_scenario(Scenario::HighHeartRate, rig.now);
        rig.run(1010);
        assert_eq!(rig.session.displayed_bpm(), DEMO_BPM);
        let report = rig.run(390);
        assert_eq!(report.snapshot.bpm_display, "95.0");
        assert_eq!(report.snapshot.drowsiness, Drowsiness::NoWarning);
        let report = rig.run(200);
        let bpm = rig.session.displayed_bpm();
        assert!(bpm > 101.0 && bpm <= 115.0, "bpm {bpm}");
        assert_eq!(report.snapshot.drowsiness, Drowsiness::Warning);
        assert_eq!(report.decision.text, HIGH_HEART_RATE_TEXT);
        assert!(report.decision.buzzer);
    }

    #[test]
    fn hands_off_alarm_once_speed_allows_detection() {
        let mut rig = Rig::new(72.0);
        rig.session.select_scenario(Scenario::HandsOff, rig.now);
        // 18.0 -> 20.0 at 0.005 per frame
        let report = rig.run_off(100);
        assert_eq!(report.snapshot.hands, HandsStatus::DetectionOff);
        assert!(!report.decision.buzzer);
        let report = rig.run_off(400);
        assert!(report.snapshot.speed >= 20.0);
        assert_eq!(report.snapshot.hands, HandsStatus::HandsOff);
        assert_eq!(report.decision.text, HANDS_OFF_TEXT);
        assert!(report.decision.buzzer);
        let report = rig.run(1);
        assert_eq!(report.snapshot.hands, HandsStatus::HandsOn);
        assert!(!report.decision.buzzer);
    }

    #[test]
    fn reselecting_resets_measurement() {
        let mut rig = Rig::new(72.0);
        rig.session.select_scenario(Scenario::Baseline, rig.now);
        rig.run(1200);
        assert!(rig.session.displayed_bpm() > 0.0);
        rig.session.select_scenario(Scenario::HandsOff, rig.now);
        assert_eq!(rig.session.displayed_bpm(), 0.0);
        assert!(rig.session.history().is_empty());
        let report = rig.run(1);
        assert_eq!(report.transition, Some(Transition::Placed));
        assert_eq!(report.snapshot.bpm_display, "--");
    }
}
