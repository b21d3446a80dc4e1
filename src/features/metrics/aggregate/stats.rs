use crate::metrics::{Breakdown, Percentiles, Phase};
use crate::probe::Sample;
use hdrhistogram::Histogram;
use std::collections::BTreeMap;
use std::time::Duration;

// Response times are recorded in microseconds, up to one hour.
const HISTOGRAM_HIGH_US: u64 = 3_600_000_000;
const HISTOGRAM_SIGFIG: u8 = 3;

pub(super) fn availability(window: &[Sample]) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    let valid = window.iter().filter(|s| s.is_valid()).count();
    Some(valid as f64 / window.len() as f64)
}

/// Per-phase durations of one sample. Server processing is whatever part of the
/// TTFB is not DNS, connect or TLS; transfer is whatever follows the first byte.
pub(super) fn sample_breakdown(sample: &Sample) -> Breakdown {
    let before_request = sample.dns + sample.connect + sample.tls;
    Breakdown {
        dns: sample.dns,
        connect: sample.connect,
        tls: sample.tls,
        processing: sample.ttfb.saturating_sub(before_request),
        ttfb: sample.ttfb,
        transfer: sample.total.saturating_sub(sample.ttfb),
        response: sample.total,
    }
}

pub(super) fn mean_and_max(window: &[Sample]) -> (Breakdown, Breakdown) {
    if window.is_empty() {
        return (Breakdown::default(), Breakdown::default());
    }

    let mut sums = [0u128; 7];
    let mut max = Breakdown::default();
    for sample in window {
        let breakdown = sample_breakdown(sample);
        for (sum, &phase) in sums.iter_mut().zip(Phase::iter_all()) {
            let value = breakdown.get(phase);
            *sum += value.as_nanos();
            let slot = max.get_mut(phase);
            *slot = (*slot).max(value);
        }
    }

    let count = window.len() as u128;
    let mut mean = Breakdown::default();
    for (sum, &phase) in sums.iter().zip(Phase::iter_all()) {
        let nanos = u64::try_from(sum / count).unwrap_or(u64::MAX);
        *mean.get_mut(phase) = Duration::from_nanos(nanos);
    }
    (mean, max)
}

pub(super) fn response_percentiles(window: &[Sample]) -> Option<Percentiles> {
    if window.is_empty() {
        return None;
    }
    let mut histogram =
        Histogram::<u64>::new_with_bounds(1, HISTOGRAM_HIGH_US, HISTOGRAM_SIGFIG).ok()?;
    for sample in window {
        let micros = u64::try_from(sample.total.as_micros()).unwrap_or(u64::MAX);
        histogram.saturating_record(micros);
    }
    let at = |q: f64| Duration::from_micros(histogram.value_at_quantile(q));
    Some(Percentiles {
        p50: at(0.50),
        p90: at(0.90),
        p99: at(0.99),
    })
}

pub(super) fn count_codes(window: &[Sample]) -> BTreeMap<u16, usize> {
    let mut counts = BTreeMap::new();
    for code in window.iter().filter_map(|s| s.status_code) {
        *counts.entry(code).or_insert(0) += 1;
    }
    counts
}

pub(super) fn count_errors(window: &[Sample]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for error in window.iter().filter_map(|s| s.error.as_ref()) {
        *counts.entry(error.to_string()).or_insert(0) += 1;
    }
    counts
}
