use std::collections::VecDeque;
use crate::drivers::MonitorError;
/// Rolling window holding the most recent IR samples.
#[derive(Clone, Debug)]
pub struct SampleWindow {
    samples: VecDeque<f64>,
    sample_rate_hz: f64,
    capacity: usize,
}
impl SampleWindow {
    pub fn with_history_seconds(
        sample_rate_hz: f64,
        history_seconds: f64,
    ) -> Result<Self, MonitorError> {
        if sample_rate_hz <= 0.0 {
            return Err(MonitorError::InvalidSampleRate);
        }
        let capacity = ((sample_rate_hz * history_seconds).ceil() as usize).max(1);
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            sample_rate_hz,
            capacity,
        })
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }
    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }
    pub fn clear(&mut self) {
        self.samples.clear();
    }
    /// Copy of the full window with its mean removed. Fails until the window is full.
    pub fn detrended(&self) -> Result<Vec<f64>, MonitorError> {
        if !self.is_full() {
            return Err(MonitorError::WindowNotFull {
                filled: self.samples.len(),
                capacity: self.capacity,
            });
        }
        let mean = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        Ok(self.samples.iter().map(|v| v - mean).collect())
    }
}
