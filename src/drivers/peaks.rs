//! Local-maximum peak picking with height, spacing and prominence gates.
//!
//! Filters are applied in this order: height, minimum distance (tallest peaks
//! win), prominence. Flat-topped peaks resolve to the middle sample of the
//! plateau; the first and last samples are never peaks.

/// Acceptance criteria for [`find_peaks`]. `None` disables a gate.
#[derive(Clone, Copy, Debug, Default)]
pub struct PeakCriteria {
    pub min_height: Option<f64>,
    pub min_distance: Option<usize>,
    pub min_prominence: Option<f64>,
}
pub fn find_peaks(signal: &[f64], criteria: &PeakCriteria) -> Vec<usize> {
    let mut peaks = local_maxima(signal);
    if let Some(min_height) = criteria.min_height {
        peaks.retain(|&p| signal[p] >= min_height);
    }
    if let Some(distance) = criteria.min_distance {
        if distance > 1 {
            peaks = select_by_distance(signal, &peaks, distance);
        }
    }
    if let Some(min_prominence) = criteria.min_prominence {
        peaks.retain(|&p| prominence(signal, p) >= min_prominence);
    }
    peaks
}
fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }
    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}
fn select_by_distance(signal: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    // tallest first; ties keep the earlier peak
    order.sort_by(|&a, &b| signal[peaks[b]].total_cmp(&signal[peaks[a]]));
    for &i in &order {
        if !keep[i] {
            continue;
        }
        let mut j = i;
        while j > 0 && peaks[i] - peaks[j - 1] < distance {
            keep[j - 1] = false;
            j -= 1;
        }
        let mut j = i + 1;
        while j < peaks.len() && peaks[j] - peaks[i] < distance {
            keep[j] = false;
            j += 1;
        }
    }
    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}
/// Height of a peak above the higher of the two lowest points reachable
/// before meeting a taller sample on either side.
pub fn prominence(signal: &[f64], peak: usize) -> f64 {
    let height = signal[peak];
    let mut left_min = height;
    for &v in signal[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }
    let mut right_min = height;
    for &v in &signal[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }
    height - left_min.max(right_min)
}
/// Linearly interpolated percentile, `pct` in [0, 100].
pub fn percentile(data: &[f64], pct: f64) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}
