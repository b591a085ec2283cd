// src/heart_utils.rs
use std::collections::VecDeque;
use std::ops::Range;

/// Physiologically plausible heart rates; both ends exclusive.
pub const PLAUSIBLE_BPM: Range<f64> = 40.0..200.0;

/// Bounded history of accepted BPM estimates, reported as a moving average.
pub struct BpmHistory {
    buffer: VecDeque<f64>,
    capacity: usize,
    bounds: Range<f64>,
}

impl BpmHistory {
    pub fn with_bounds(size: usize, bounds: Range<f64>) -> Self {
        let capacity = size.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            bounds,
        }
    }

    /// Push an estimate if it lies strictly inside the plausible range.
    /// Returns whether it was kept; the oldest entry drops out when full.
    pub fn accept(&mut self, bpm: f64) -> bool {
        if !(bpm > self.bounds.start && bpm < self.bounds.end) {
            return false;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(bpm);
        true
    }

    /// Arithmetic mean of the history, `None` while empty.
    pub fn mean(&self) -> Option<f64> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(self.buffer.iter().sum::<f64>() / self.buffer.len() as f64)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.buffer.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::pipeline::bpm_from_beats;

    #[test]
    fn averages_the_last_ten() {
        let mut history = BpmHistory::with_bounds(10, PLAUSIBLE_BPM);
        assert_eq!(history.mean(), None);
        for bpm in 60..72 {
            assert!(history.accept(bpm as f64));
        }
        assert_eq!(history.len(), 10);
        assert_eq!(history.iter().next(), Some(&62.0));
        assert_eq!(history.mean(), Some(66.5));
    }

    #[test]
    fn rejects_boundaries_and_nan() {
        let mut history = BpmHistory::with_bounds(10, PLAUSIBLE_BPM);
        assert!(!history.accept(40.0));
        assert!(!history.accept(200.0));
        assert!(!history.accept(f64::NAN));
        assert!(history.accept(40.5));
        assert!(history.accept(199.5));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn never_holds_implausible_rates_from_any_beat_train() {
        let mut history = BpmHistory::with_bounds(10, PLAUSIBLE_BPM);
        // beat spacings from 5 samples (1200 bpm) to 400 samples (15 bpm)
        for spacing in (5..400).step_by(7) {
            let beats: Vec<usize> = (0..6).map(|i| i * spacing).collect();
            if let Some(bpm) = bpm_from_beats(&beats, 100.0) {
                history.accept(bpm);
            }
            assert!(history.iter().all(|&v| v > 40.0 && v < 200.0));
        }
        assert!(!history.is_empty());
    }
}
