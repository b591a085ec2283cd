use crate::config::MonitorConfig;
use crate::drivers::error::MonitorError;
use crate::drivers::filter::BandPass;
use crate::drivers::peaks::{find_peaks, percentile, PeakCriteria};
use crate::drivers::SampleWindow;
/// Trough-detection tuning, relative to the filtered window.
#[derive(Clone, Copy, Debug)]
pub struct BeatDetection {
    /// Troughs must be at least this far apart.
    pub min_spacing_seconds: f64,
    /// Fraction of the filtered peak-to-peak range a trough must stand out by.
    pub prominence_ratio: f64,
    /// Troughs must dip below this percentile of the filtered signal.
    pub height_percentile: f64,
}
impl Default for BeatDetection {
    fn default() -> Self {
        Self {
            min_spacing_seconds: 0.4,
            prominence_ratio: 0.1,
            height_percentile: 75.0,
        }
    }
}
/// Rolling IR window -> band-pass -> trough picking -> instantaneous BPM.
pub struct BpmEstimator {
    window: SampleWindow,
    filter: BandPass,
    detection: BeatDetection,
}
impl BpmEstimator {
    pub fn new(
        window: SampleWindow,
        filter: BandPass,
        detection: BeatDetection,
    ) -> Self {
        Self {
            window,
            filter,
            detection,
        }
    }
    pub fn from_config(config: &MonitorConfig) -> Result<Self, MonitorError> {
        let window =
            SampleWindow::with_history_seconds(config.sampling_rate_hz, config.window_seconds)?;
        let filter = BandPass::butterworth(
            config.filter_order,
            config.band_low_hz,
            config.band_high_hz,
            config.sampling_rate_hz,
        )?;
        let detection = BeatDetection {
            min_spacing_seconds: config.min_beat_spacing_secs,
            prominence_ratio: config.prominence_ratio,
            height_percentile: config.height_percentile,
        };
        Ok(Self::new(window, filter, detection))
    }
    pub fn push(&mut self, sample: f64) {
        self.window.push(sample);
    }
    pub fn is_ready(&self) -> bool {
        self.window.is_full()
    }
    #[cfg(test)]
    pub fn window(&self) -> &SampleWindow {
        &self.window
    }
    pub fn reset(&mut self) {
        self.window.clear();
    }
    /// Sample indices of detected beats (IR troughs) in the current window.
    pub fn detect_beats(&self) -> Result<Vec<usize>, MonitorError> {
        let detrended = self.window.detrended()?;
        let filtered = self.filter.filtfilt(&detrended);
        let (min, max) = filtered
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let upper = percentile(&filtered, self.detection.height_percentile).unwrap_or(0.0);
        let inverted: Vec<f64> = filtered.iter().map(|v| -v).collect();
        let criteria = PeakCriteria {
            min_height: Some(-upper),
            min_distance: Some(
                (self.detection.min_spacing_seconds * self.window.sample_rate_hz()).ceil() as usize,
            ),
            min_prominence: Some(self.detection.prominence_ratio * (max - min)),
        };
        Ok(find_peaks(&inverted, &criteria))
    }
    /// Instantaneous BPM for the current window, or `None` when fewer than
    /// two beats were found. No plausibility gate is applied here.
    pub fn estimate(&self) -> Result<Option<f64>, MonitorError> {
        let beats = self.detect_beats()?;
        Ok(bpm_from_beats(&beats, self.window.sample_rate_hz()))
    }
}
/// 60 / mean inter-beat interval, from beat positions in samples.
pub fn bpm_from_beats(beats: &[usize], sample_rate_hz: f64) -> Option<f64> {
    if beats.len() < 2 || sample_rate_hz <= 0.0 {
        return None;
    }
    let span = (beats[beats.len() - 1] - beats[0]) as f64 / sample_rate_hz;
    let mean_ibi = span / (beats.len() - 1) as f64;
    (mean_ibi > 0.0).then(|| 60.0 / mean_ibi)
}
