use std::f64::consts::PI;
use crate::drivers::MonitorError;
#[derive(Clone, Copy, Debug)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}
impl BiquadCoeffs {
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
    /// State the section settles into when fed `input` forever.
    fn steady_state(&self, input: f64) -> BiquadState {
        let output = self.dc_gain() * input;
        BiquadState {
            z1: output - self.b0 * input,
            z2: self.b2 * input - self.a2 * output,
        }
    }
}
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}
impl BiquadState {
    fn process(&mut self, c: &BiquadCoeffs, input: f64) -> f64 {
        // Transposed direct form II
        let y = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * y + self.z2;
        self.z2 = c.b2 * input - c.a2 * y;
        y
    }
}
/// Butterworth band-pass built as a cascade of second-order sections.
///
/// The filter itself holds no state: every call to [`BandPass::filtfilt`]
/// starts from steady-state initial conditions, so the same window always
/// produces the same output.
#[derive(Clone, Debug)]
pub struct BandPass {
    sections: Vec<BiquadCoeffs>,
}
impl BandPass {
    /// `order` applies to each band edge, so the cascade has a low-pass at
    /// `high_hz` and a high-pass at `low_hz`, both of that order.
    pub fn butterworth(
        order: usize,
        low_hz: f64,
        high_hz: f64,
        sample_rate_hz: f64,
    ) -> Result<Self, MonitorError> {
        if sample_rate_hz <= 0.0 {
            return Err(MonitorError::InvalidSampleRate);
        }
        let nyquist = sample_rate_hz * 0.5;
        if order == 0 || low_hz <= 0.0 || low_hz >= high_hz || high_hz >= nyquist {
            return Err(MonitorError::InvalidBand {
                low_hz,
                high_hz,
                sample_rate_hz,
            });
        }
        let mut sections = design_sections(order, high_hz, sample_rate_hz, Edge::Lowpass);
        sections.extend(design_sections(order, low_hz, sample_rate_hz, Edge::Highpass));
        Ok(Self { sections })
    }
    #[cfg(test)]
    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }
    /// Zero-phase filtering: forward pass, then backward pass over the result.
    ///
    /// The signal is padded at both ends with an odd reflection of itself so
    /// the start-up transient falls outside the returned samples.
    pub fn filtfilt(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < 2 {
            return data.to_vec();
        }
        let padlen = (3 * (2 * self.sections.len() + 1)).min(data.len() - 1);
        let extended = odd_extend(data, padlen);
        let mut forward = self.run(&extended);
        forward.reverse();
        let mut backward = self.run(&forward);
        backward.reverse();
        backward[padlen..padlen + data.len()].to_vec()
    }
    fn run(&self, data: &[f64]) -> Vec<f64> {
        let Some(&first) = data.first() else {
            return Vec::new();
        };
        let mut states = self.steady_states(first);
        data.iter()
            .map(|&x| {
                let mut value = x;
                for (coeffs, state) in self.sections.iter().zip(states.iter_mut()) {
                    value = state.process(coeffs, value);
                }
                value
            })
            .collect()
    }
    fn steady_states(&self, first: f64) -> Vec<BiquadState> {
        let mut level = first;
        self.sections
            .iter()
            .map(|coeffs| {
                let state = coeffs.steady_state(level);
                level *= coeffs.dc_gain();
                state
            })
            .collect()
    }
}
fn odd_extend(data: &[f64], padlen: usize) -> Vec<f64> {
    let n = data.len();
    let first = data[0];
    let last = data[n - 1];
    let mut out = Vec::with_capacity(n + 2 * padlen);
    out.extend((1..=padlen).rev().map(|i| 2.0 * first - data[i]));
    out.extend_from_slice(data);
    out.extend((1..=padlen).map(|i| 2.0 * last - data[n - 1 - i]));
    out
}
#[derive(Clone, Copy, Debug)]
enum Edge {
    Lowpass,
    Highpass,
}
/// Bilinear transform of the analog Butterworth prototype, one section per
/// conjugate pole pair plus a first-order section for odd orders.
fn design_sections(order: usize, cutoff_hz: f64, sample_rate_hz: f64, edge: Edge) -> Vec<BiquadCoeffs> {
    let k = 2.0 * sample_rate_hz;
    // Pre-warp the cutoff frequency
    let wc = k * (PI * cutoff_hz / sample_rate_hz).tan();
    let mut sections = Vec::with_capacity(order / 2 + 1);
    for i in 0..order {
        let theta = PI * (2 * i + order + 1) as f64 / (2 * order) as f64;
        let (re, im) = (theta.cos(), theta.sin());
        if im < -1e-10 {
            // conjugate of a pole already handled
            continue;
        }
        // Prototype poles sit on the unit circle, so wc * p (low-pass) and
        // wc / p (high-pass) share real part and magnitude.
        let p_re = wc * re;
        let p_mag_sq = wc * wc;
        if im.abs() <= 1e-10 {
            sections.push(first_order(p_re, k, edge));
        } else {
            sections.push(second_order(p_re, p_mag_sq, k, edge));
        }
    }
    sections
}
fn first_order(p: f64, k: f64, edge: Edge) -> BiquadCoeffs {
    let alpha = k - p;
    let beta = k + p;
    let (b0, b1) = match edge {
        Edge::Lowpass => (-p / alpha, -p / alpha),
        Edge::Highpass => (k / alpha, -k / alpha),
    };
    BiquadCoeffs {
        b0,
        b1,
        b2: 0.0,
        a1: -beta / alpha,
        a2: 0.0,
    }
}
fn second_order(p_re: f64, p_mag_sq: f64, k: f64, edge: Edge) -> BiquadCoeffs {
    let k2 = k * k;
    let d = k2 - 2.0 * k * p_re + p_mag_sq;
    let (b0, b1, b2) = match edge {
        Edge::Lowpass => (p_mag_sq / d, 2.0 * p_mag_sq / d, p_mag_sq / d),
        Edge::Highpass => (k2 / d, -2.0 * k2 / d, k2 / d),
    };
    BiquadCoeffs {
        b0,
        b1,
        b2,
        a1: 2.0 * (p_mag_sq - k2) / d,
        a2: (k2 + 2.0 * k * p_re + p_mag_sq) / d,
    }
}
