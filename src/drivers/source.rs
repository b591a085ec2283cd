use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::SensorFault;
/// Something that can produce one raw IR intensity sample per call.
pub trait SampleSource {
    fn read_sample(&mut self) -> Result<f64, SensorFault>;
}
impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read_sample(&mut self) -> Result<f64, SensorFault> {
        (**self).read_sample()
    }
}
/// Outcome of one adapter read. `ok == false` means the intensity is the
/// below-threshold fallback, not a measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleReading {
    pub intensity: f64,
    pub ok: bool,
}
/// Absorbs sensor faults: retries a bounded number of times, then reports a
/// value just under the finger threshold so the rest of the pipeline sees
/// "no finger". Every fault kind gets the same treatment.
pub struct RetryingSource<S: SampleSource> {
    inner: S,
    attempts: usize,
    retry_delay: Duration,
    fallback: f64,
    failing: bool,
}
impl<S: SampleSource> RetryingSource<S> {
    pub fn new(inner: S, attempts: usize, retry_delay: Duration, finger_threshold: f64) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            retry_delay,
            fallback: finger_threshold - 1.0,
            failing: false,
        }
    }
    pub fn next_sample(&mut self) -> SampleReading {
        let mut last_fault = None;
        for attempt in 1..=self.attempts {
            match self.inner.read_sample() {
                Ok(intensity) => {
                    if self.failing {
                        info!("sensor reads recovered");
                        self.failing = false;
                    }
                    return SampleReading {
                        intensity,
                        ok: true,
                    };
                }
                Err(fault) => {
                    debug!("sensor read attempt {attempt} failed: {fault}");
                    last_fault = Some(fault);
                    if attempt < self.attempts {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }
        if !self.failing {
            if let Some(fault) = last_fault {
                warn!("sensor read failed ({fault}); treating as no finger");
            }
            self.failing = true;
        }
        SampleReading {
            intensity: self.fallback,
            ok: false,
        }
    }
}
/// Scripted source for tests. Runs dry as a disconnected sensor.
#[cfg(test)]
pub struct ManualSource {
    queue: std::collections::VecDeque<Result<f64, SensorFault>>,
}
#[cfg(test)]
impl ManualSource {
    pub fn new(readings: impl IntoIterator<Item = Result<f64, SensorFault>>) -> Self {
        Self {
            queue: readings.into_iter().collect(),
        }
    }
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}
#[cfg(test)]
impl SampleSource for ManualSource {
    fn read_sample(&mut self) -> Result<f64, SensorFault> {
        self.queue
            .pop_front()
            .unwrap_or_else(|| Err(SensorFault::Disconnected("script exhausted".into())))
    }
}
/// Shared switch used by the control surface to lift or place the simulated finger.
#[derive(Clone, Debug)]
pub struct FingerSwitch(Arc<AtomicBool>);
impl FingerSwitch {
    pub fn is_present(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::Relaxed)
    }
}
/// Synthetic IR channel: a DC level with a sharp systolic dip and a smaller
/// dicrotic dip per beat, plus uniform noise.
pub struct SimulatedPpg {
    rng: StdRng,
    sample_rate_hz: f64,
    bpm: f64,
    phase: f64,
    dc_level: f64,
    pulse_depth: f64,
    noise: f64,
    ambient_level: f64,
    finger: FingerSwitch,
}
impl SimulatedPpg {
    pub fn new(sample_rate_hz: f64, bpm: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sample_rate_hz,
            bpm,
            phase: 0.0,
            dc_level: 50_000.0,
            pulse_depth: 400.0,
            noise: 40.0,
            ambient_level: 800.0,
            finger: FingerSwitch(Arc::new(AtomicBool::new(true))),
        }
    }
    pub fn finger_switch(&self) -> FingerSwitch {
        self.finger.clone()
    }
    fn pulse_shape(phase: f64) -> f64 {
        let dip = |center: f64, width: f64| (-(phase - center).powi(2) / (2.0 * width * width)).exp();
        dip(0.2, 0.06) + 0.35 * dip(0.5, 0.08) + 0.05 * (2.0 * PI * phase).sin()
    }
}
impl SampleSource for SimulatedPpg {
    fn read_sample(&mut self) -> Result<f64, SensorFault> {
        let noise = self.rng.gen_range(-self.noise..=self.noise);
        if !self.finger.is_present() {
            return Ok(self.ambient_level + noise);
        }
        self.phase = (self.phase + self.bpm / 60.0 / self.sample_rate_hz).fract();
        Ok(self.dc_level - self.pulse_depth * Self::pulse_shape(self.phase) + noise)
    }
}
