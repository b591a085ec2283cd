// src/arbiter.rs
use crate::types::{Drowsiness, HandsStatus, Rgb, Scenario};

pub const HANDS_OFF_TEXT: &str = "HANDS \n OFF";
pub const HIGH_HEART_RATE_TEXT: &str = "HIGH \nHeart Rate";
pub const NO_BPM: &str = "--";

/// Everything the arbiter needs from one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameState<'a> {
    pub scenario: Option<Scenario>,
    pub hands: HandsStatus,
    pub hands_off_detection: bool,
    pub drowsiness: Drowsiness,
    pub bpm_display: &'a str,
}

/// The single authoritative output of a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputDecision {
    pub text: String,
    pub color: Rgb,
    pub buzzer: bool,
}

impl OutputDecision {
    fn same_screen(&self, other: &OutputDecision) -> bool {
        self.text == other.text && self.color == other.color
    }
}

pub fn decide(frame: &FrameState<'_>) -> OutputDecision {
    let hands_off_warning = matches!(
        frame.scenario,
        Some(Scenario::HandsOff | Scenario::HighHeartRate)
    ) && frame.hands == HandsStatus::HandsOff
        && frame.hands_off_detection;
    let drowsiness_warning = frame.scenario == Some(Scenario::HighHeartRate)
        && frame.drowsiness == Drowsiness::Warning;
    let (text, color) = if hands_off_warning {
        (HANDS_OFF_TEXT.to_owned(), Rgb::RED)
    } else if drowsiness_warning {
        (HIGH_HEART_RATE_TEXT.to_owned(), Rgb::RED)
    } else if frame.bpm_display == NO_BPM {
        (format!("Heart Rate\n{NO_BPM} bpm"), Rgb::GRAY)
    } else {
        (format!("Heart Rate\n{} bpm", frame.bpm_display), Rgb::GREEN)
    };
    OutputDecision {
        text,
        color,
        buzzer: hands_off_warning || drowsiness_warning,
    }
}

/// Remembers the last screen sent to the display and lets only changes through.
#[derive(Default)]
pub struct OutputArbiter {
    last_dispatched: Option<OutputDecision>,
    dispatch_count: usize,
}

impl OutputArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some` when the (text, color) pair differs from the last dispatch.
    pub fn arbitrate(&mut self, decision: &OutputDecision) -> Option<OutputDecision> {
        if let Some(last) = &self.last_dispatched {
            if last.same_screen(decision) {
                return None;
            }
        }
        self.last_dispatched = Some(decision.clone());
        self.dispatch_count += 1;
        Some(decision.clone())
    }

    /// Forget the last screen, e.g. after something else drew on the display.
    pub fn invalidate(&mut self) {
        self.last_dispatched = None;
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatch_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(
        scenario: Scenario,
        hands: HandsStatus,
        drowsiness: Drowsiness,
        bpm: &str,
    ) -> FrameState<'_> {
        FrameState {
            scenario: Some(scenario),
            hands,
            hands_off_detection: true,
            drowsiness,
            bpm_display: bpm,
        }
    }

    #[test]
    fn hands_off_beats_drowsiness() {
        let both = decide(&frame(
            Scenario::HighHeartRate,
            HandsStatus::HandsOff,
            Drowsiness::Warning,
            "110.0",
        ));
        assert_eq!(both.text, HANDS_OFF_TEXT);
        assert_eq!(both.color, Rgb::RED);
        assert!(both.buzzer);
        // flags raised in the other order give the same screen
        let mut state = frame(
            Scenario::HighHeartRate,
            HandsStatus::HandsOn,
            Drowsiness::Warning,
            "110.0",
        );
        assert_eq!(decide(&state).text, HIGH_HEART_RATE_TEXT);
        state.hands = HandsStatus::HandsOff;
        assert_eq!(decide(&state), both);
    }

    #[test]
    fn hands_off_needs_active_detection() {
        let mut state = frame(
            Scenario::HandsOff,
            HandsStatus::HandsOff,
            Drowsiness::NoWarning,
            "72.0",
        );
        state.hands_off_detection = false;
        let decision = decide(&state);
        assert_eq!(decision.text, "Heart Rate\n72.0 bpm");
        assert_eq!(decision.color, Rgb::GREEN);
        assert!(!decision.buzzer);
    }

    #[test]
    fn baseline_never_alarms() {
        let decision = decide(&frame(
            Scenario::Baseline,
            HandsStatus::HandsOff,
            Drowsiness::Warning,
            NO_BPM,
        ));
        assert_eq!(decision.text, "Heart Rate\n-- bpm");
        assert_eq!(decision.color, Rgb::GRAY);
        assert!(!decision.buzzer);
    }

    #[test]
    fn dispatches_only_changes() {
        let screens = ["--", "--", "72.0", "72.0", "72.0", "73.1", "--", "--"];
        let mut arbiter = OutputArbiter::new();
        let mut sent = Vec::new();
        for bpm in screens {
            let decision = decide(&frame(
                Scenario::Baseline,
                HandsStatus::DetectionOff,
                Drowsiness::NoWarning,
                bpm,
            ));
            if let Some(d) = arbiter.arbitrate(&decision) {
                sent.push(d.text);
            }
        }
        assert_eq!(arbiter.dispatch_count(), 4);
        assert_eq!(sent.len(), 4);
        arbiter.invalidate();
        let same = decide(&frame(
            Scenario::Baseline,
            HandsStatus::DetectionOff,
            Drowsiness::NoWarning,
            "--",
        ));
        assert!(arbiter.arbitrate(&same).is_some());
    }
}
