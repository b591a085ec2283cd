// src/config.rs
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::drivers::MonitorError;
use crate::heart_utils::PLAUSIBLE_BPM;

/// Longest rolling window accepted, in seconds and in samples.
const MAX_WINDOW_SECONDS: f64 = 60.0;
const MAX_WINDOW_SAMPLES: f64 = 100_000.0;
/// Highest Butterworth order accepted per band edge.
const MAX_FILTER_ORDER: usize = 10;

/// Tunables of the monitor. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    // --- sampling ---
    pub sampling_rate_hz: f64,
    pub window_seconds: f64,
    pub update_interval_secs: f64,
    pub frame_interval_ms: u64,

    // --- finger presence ---
    pub finger_threshold: f64,
    pub grace_secs: f64,

    // --- BPM estimation ---
    pub band_low_hz: f64,
    pub band_high_hz: f64,
    pub filter_order: usize,
    pub min_beat_spacing_secs: f64,
    pub prominence_ratio: f64,
    pub height_percentile: f64,
    pub history_len: usize,
    pub bpm_min: f64,
    pub bpm_max: f64,

    // --- sensor ---
    pub read_attempts: usize,
    pub read_retry_delay_ms: u64,
    pub serial_port: Option<String>,
    pub serial_baud: u32,
    pub sim_bpm: f64,
    pub sim_seed: u64,

    // --- outputs ---
    pub alarm_on_ms: u64,
    pub alarm_off_ms: u64,
    pub splash_text: String,
    pub frame_png_path: Option<String>,
    pub dashboard_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 100.0,
            window_seconds: 10.0,
            update_interval_secs: 1.0,
            frame_interval_ms: 10,
            finger_threshold: 12_000.0,
            grace_secs: 2.0,
            band_low_hz: 0.8,
            band_high_hz: 2.5,
            filter_order: 5,
            min_beat_spacing_secs: 0.4,
            prominence_ratio: 0.1,
            height_percentile: 75.0,
            history_len: 10,
            bpm_min: PLAUSIBLE_BPM.start,
            bpm_max: PLAUSIBLE_BPM.end,
            read_attempts: 5,
            read_retry_delay_ms: 1,
            serial_port: None,
            serial_baud: 115_200,
            sim_bpm: 72.0,
            sim_seed: 0x5eed,
            alarm_on_ms: 1000,
            alarm_off_ms: 1000,
            splash_text: "In-Cabin\n Pulse \n Monitor".to_owned(),
            frame_png_path: None,
            dashboard_interval_ms: 1000,
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> Result<Self, MonitorError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, MonitorError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if !(self.sampling_rate_hz > 0.0) || !self.sampling_rate_hz.is_finite() {
            return Err(MonitorError::InvalidSampleRate);
        }
        if !(self.band_low_hz > 0.0)
            || !(self.band_low_hz < self.band_high_hz)
            || !(self.band_high_hz < self.sampling_rate_hz / 2.0)
        {
            return Err(MonitorError::InvalidBand {
                low_hz: self.band_low_hz,
                high_hz: self.band_high_hz,
                sample_rate_hz: self.sampling_rate_hz,
            });
        }
        if !(self.window_seconds > 0.0 && self.window_seconds <= MAX_WINDOW_SECONDS) {
            return Err(MonitorError::Config(format!(
                "window_seconds must be in (0, {MAX_WINDOW_SECONDS}], got {}",
                self.window_seconds
            )));
        }
        if self.sampling_rate_hz * self.window_seconds > MAX_WINDOW_SAMPLES {
            return Err(MonitorError::Config(format!(
                "window of {} samples exceeds {MAX_WINDOW_SAMPLES}",
                self.sampling_rate_hz * self.window_seconds
            )));
        }
        if self.filter_order == 0 || self.filter_order > MAX_FILTER_ORDER {
            return Err(MonitorError::Config(format!(
                "filter_order must be in 1..={MAX_FILTER_ORDER}, got {}",
                self.filter_order
            )));
        }
        seconds("update_interval_secs", self.update_interval_secs)?;
        seconds("grace_secs", self.grace_secs)?;
        if !(self.bpm_min < self.bpm_max) {
            return Err(MonitorError::Config(format!(
                "bpm_min {} must be below bpm_max {}",
                self.bpm_min, self.bpm_max
            )));
        }
        if self.read_attempts == 0 {
            return Err(MonitorError::Config("read_attempts must be at least 1".into()));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn update_interval(&self) -> Duration {
        seconds("update_interval_secs", self.update_interval_secs).unwrap_or_default()
    }

    pub fn grace(&self) -> Duration {
        seconds("grace_secs", self.grace_secs).unwrap_or_default()
    }

    pub fn read_retry_delay(&self) -> Duration {
        Duration::from_millis(self.read_retry_delay_ms)
    }

    pub fn dashboard_interval(&self) -> Duration {
        Duration::from_millis(self.dashboard_interval_ms)
    }
}

/// Non-negative, finite seconds that fit a `Duration`.
fn seconds(field: &str, value: f64) -> Result<Duration, MonitorError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| MonitorError::Config(format!("{field} = {value}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_ten_second_window_at_100hz() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!((config.sampling_rate_hz * config.window_seconds) as usize, 1000);
        assert_eq!(config.grace(), Duration::from_secs(2));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config =
            MonitorConfig::from_json(r#"{"finger_threshold": 9000, "serial_port": "/dev/ttyUSB0"}"#)
                .unwrap();
        assert_eq!(config.finger_threshold, 9000.0);
        assert_eq!(config.serial_port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.history_len, 10);
    }

    #[test]
    fn rejects_band_past_nyquist() {
        let err = MonitorConfig::from_json(r#"{"sampling_rate_hz": 4.0}"#).unwrap_err();
        assert!(matches!(err, MonitorError::InvalidBand { .. }));
        let err = MonitorConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, MonitorError::ConfigParse(_)));
    }

    #[test]
    fn rejects_durations_that_do_not_fit() {
        for json in [
            r#"{"grace_secs": 1e300}"#,
            r#"{"grace_secs": -1}"#,
            r#"{"update_interval_secs": 1e300}"#,
            r#"{"update_interval_secs": -0.5}"#,
        ] {
            let err = MonitorConfig::from_json(json).unwrap_err();
            assert!(matches!(err, MonitorError::Config(_)), "{json}");
        }
        let config = MonitorConfig {
            grace_secs: f64::INFINITY,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.grace(), Duration::ZERO);
    }

    #[test]
    fn caps_window_size() {
        assert!(MonitorConfig::from_json(r#"{"window_seconds": 1e9}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"window_seconds": 0}"#).is_err());
        let huge_rate = r#"{"sampling_rate_hz": 1e7, "window_seconds": 10}"#;
        assert!(matches!(
            MonitorConfig::from_json(huge_rate).unwrap_err(),
            MonitorError::Config(_)
        ));
        assert!(MonitorConfig::from_json(r#"{"filter_order": 1000}"#).is_err());
        assert!(MonitorConfig::from_json(r#"{"window_seconds": 60}"#).is_ok());
    }
}
