// src/indicator.rs
use std::time::{Duration, Instant};

/// Half-period while no heartbeat has been established yet.
const SEARCH_HALF_PERIOD: Duration = Duration::from_millis(500);
/// Half-period when a heartbeat exists but the BPM has been zeroed.
const IDLE_HALF_PERIOD: Duration = Duration::from_secs(1);

/// Blinking heart symbol, polled once per frame.
pub struct HeartbeatIndicator {
    lit: bool,
    last_toggle: Instant,
}

impl HeartbeatIndicator {
    pub fn new(now: Instant) -> Self {
        Self {
            lit: false,
            last_toggle: now,
        }
    }

    pub fn half_period(bpm: Option<f64>) -> Duration {
        match bpm {
            None => SEARCH_HALF_PERIOD,
            Some(bpm) if bpm > 0.0 => Duration::from_secs_f64(60.0 / bpm),
            Some(_) => IDLE_HALF_PERIOD,
        }
    }

    /// `bpm` is `None` until the first heartbeat is detected.
    pub fn tick(&mut self, now: Instant, bpm: Option<f64>) -> bool {
        if now.saturating_duration_since(self.last_toggle) >= Self::half_period(bpm) {
            self.lit = !self.lit;
            self.last_toggle = now;
        }
        self.lit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn searching_blinks_every_half_second() {
        let t0 = Instant::now();
        let mut ind = HeartbeatIndicator::new(t0);
        assert!(!ind.tick(t0 + Duration::from_millis(490), None));
        assert!(ind.tick(t0 + Duration::from_millis(500), None));
        assert!(ind.tick(t0 + Duration::from_millis(990), None));
        assert!(!ind.tick(t0 + Duration::from_millis(1000), None));
    }

    #[test]
    fn follows_pulse_once_established() {
        assert_eq!(HeartbeatIndicator::half_period(Some(60.0)), Duration::from_secs(1));
        assert_eq!(HeartbeatIndicator::half_period(Some(120.0)), Duration::from_millis(500));
        assert_eq!(HeartbeatIndicator::half_period(Some(0.0)), Duration::from_secs(1));
        let t0 = Instant::now();
        let mut ind = HeartbeatIndicator::new(t0);
        assert!(!ind.tick(t0 + Duration::from_millis(700), Some(75.0)));
        assert!(ind.tick(t0 + Duration::from_millis(800), Some(75.0)));
        assert!(ind.tick(t0 + Duration::from_millis(1_500), Some(75.0)));
    }
}
