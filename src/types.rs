// src/types.rs
use std::fmt;

// Where samples come from
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ConnectionMode {
    Simulation,
    Hardware,
}

/// Demo scenario selected from the control surface.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Scenario {
    /// Slow ramp to 20, hands-off detection disabled.
    Baseline,
    /// Random speed walk, hands-off detection above 20.
    HandsOff,
    /// As `HandsOff`, with heart rate remapped into the alarm range.
    HighHeartRate,
}

impl Scenario {
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "1" => Some(Scenario::Baseline),
            "2" => Some(Scenario::HandsOff),
            "3" => Some(Scenario::HighHeartRate),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Scenario::Baseline => 1,
            Scenario::HandsOff => 2,
            Scenario::HighHeartRate => 3,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Scenario::Baseline => "health monitoring",
            Scenario::HandsOff => "hands-off detection",
            Scenario::HighHeartRate => "high heart rate detection",
        };
        write!(f, "Scenario {} ({label})", self.number())
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Presence {
    #[default]
    Off,
    On,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum HandsStatus {
    DetectionOff,
    HandsOff,
    HandsOn,
}

impl fmt::Display for HandsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandsStatus::DetectionOff => "Hands-off Warning OFF",
            HandsStatus::HandsOff => "Hands OFF",
            HandsStatus::HandsOn => "Hands ON",
        })
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Drowsiness {
    #[default]
    NoValue,
    NoWarning,
    Warning,
}

impl fmt::Display for Drowsiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Drowsiness::NoValue => "No Value",
            Drowsiness::NoWarning => "No Warning",
            Drowsiness::Warning => "Warning",
        })
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const GREEN: Rgb = Rgb(0, 255, 0);
    pub const GRAY: Rgb = Rgb(128, 128, 128);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
}

/// Read-only view of one frame, for the dashboard.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub scenario: Option<Scenario>,
    pub speed: f64,
    pub imu: (f64, f64),
    pub presence: Presence,
    pub bpm_display: String,
    pub heartbeat_lit: bool,
    pub measuring: bool,
    pub hands: HandsStatus,
    pub drowsiness: Drowsiness,
}

// Commands sent from the control surface to the engine
#[derive(Clone, Debug)]
pub enum ControlCommand {
    SelectScenario(Scenario),
    StopScenario,
    Quit,
}

// Messages sent from the engine to the presentation side
#[derive(Clone, Debug)]
pub enum MonitorMessage {
    Log(String),
    Snapshot(Snapshot),
    AlarmStatus(bool),
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_menu_choices() {
        assert_eq!(Scenario::from_choice(" 3\n"), Some(Scenario::HighHeartRate));
        assert_eq!(Scenario::from_choice("4"), None);
        assert_eq!(Scenario::HandsOff.to_string(), "Scenario 2 (hands-off detection)");
    }
}
