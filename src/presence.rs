// src/presence.rs
use std::time::{Duration, Instant};

use crate::types::Presence;

/// Edge reported by [`PresenceTracker::update`].
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Transition {
    Placed,
    Removed,
}

/// Finger on/off state from raw intensity, with a grace timer that starts
/// when the finger leaves (or when tracking starts without a finger).
pub struct PresenceTracker {
    threshold: f64,
    grace: Duration,
    state: Presence,
    off_since: Option<Instant>,
}

impl PresenceTracker {
    pub fn new(threshold: f64, grace: Duration) -> Self {
        Self {
            threshold,
            grace,
            state: Presence::Off,
            off_since: None,
        }
    }

    pub fn state(&self) -> Presence {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == Presence::On
    }

    pub fn update(&mut self, intensity: f64, now: Instant) -> Option<Transition> {
        let finger = intensity >= self.threshold;
        let edge = match (self.state, finger) {
            (Presence::Off, true) => {
                self.state = Presence::On;
                self.off_since = None;
                Some(Transition::Placed)
            }
            (Presence::On, false) => {
                self.state = Presence::Off;
                Some(Transition::Removed)
            }
            _ => None,
        };
        if self.state == Presence::Off && self.off_since.is_none() {
            self.off_since = Some(now);
        }
        edge
    }

    /// True once the finger has been away for at least the grace window.
    pub fn grace_expired(&self, now: Instant) -> bool {
        match (self.state, self.off_since) {
            (Presence::Off, Some(since)) => now.saturating_duration_since(since) >= self.grace,
            _ => false,
        }
    }

    /// Forget the current state without touching the grace timer, so a finger
    /// already resting on the sensor is reported as freshly placed.
    pub fn rearm(&mut self) {
        self.state = Presence::Off;
    }
}
