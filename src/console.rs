// src/console.rs
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::types::*;

/// One dashboard line for a frame.
pub fn format_snapshot(snapshot: &Snapshot) -> String {
    let scenario = snapshot
        .scenario
        .map(|s| format!("S{}", s.number()))
        .unwrap_or_else(|| "--".to_owned());
    let finger = match snapshot.presence {
        Presence::On => "ON ",
        Presence::Off => "OFF",
    };
    let beat = if snapshot.heartbeat_lit { "<3" } else { "  " };
    let mut line = format!(
        "[{scenario}] speed {:5.2} | IMU {:.1}/{:.1} | finger {finger} | HR {:>5} bpm {beat} | {} | DROWSINESS: {}",
        snapshot.speed, snapshot.imu.0, snapshot.imu.1, snapshot.bpm_display, snapshot.hands, snapshot.drowsiness,
    );
    if snapshot.measuring {
        line.push_str(" (Measuring...)");
    }
    line
}

/// Prints engine output to the terminal, at most one snapshot per interval.
pub struct Dashboard {
    interval: Duration,
    last_shown: Option<Instant>,
}

impl Dashboard {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_shown: None,
        }
    }

    /// Whether a snapshot arriving at `now` should be printed.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.last_shown {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_shown = Some(now);
                true
            }
        }
    }

    /// Consume engine messages until it reports `Stopped` or hangs up.
    pub fn run(mut self, rx: Receiver<MonitorMessage>) {
        for message in rx.iter() {
            match message {
                MonitorMessage::Log(text) => info!("{text}"),
                MonitorMessage::Snapshot(snapshot) => {
                    if self.due(Instant::now()) {
                        println!("{}", format_snapshot(&snapshot));
                    }
                }
                MonitorMessage::AlarmStatus(true) => warn!("buzzer ON"),
                MonitorMessage::AlarmStatus(false) => info!("buzzer off"),
                MonitorMessage::Stopped => break,
            }
        }
    }
}
