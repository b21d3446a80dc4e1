use super::aggregate;
use crate::metrics::{Breakdown, Metric};
use crate::probe::{ProbeError, ProbeErrorKind, Sample};
use std::time::{Duration, SystemTime};

fn response(status_code: u16, total_ms: u64) -> Sample {
    Sample {
        timestamp: SystemTime::now(),
        dns: Duration::from_millis(2),
        connect: Duration::from_millis(5),
        tls: Duration::from_millis(8),
        ttfb: Duration::from_millis(40),
        total: Duration::from_millis(total_ms),
        status_code: Some(status_code),
        error: None,
    }
}

fn failure(message: &str) -> Sample {
    Sample::failed(
        SystemTime::now(),
        ProbeError::new(ProbeErrorKind::Timeout, message),
    )
}

#[test]
fn tallies_codes_and_errors_and_availability() {
    let window = vec![
        response(200, 50),
        response(200, 50),
        response(503, 50),
        failure("timeout"),
    ];

    let metric = aggregate(&window);

    assert_eq!(metric.samples, 4);
    assert_eq!(metric.availability, Some(0.5));
    assert_eq!(metric.status_code_counts.len(), 2);
    assert_eq!(metric.status_code_counts.get(&200), Some(&2));
    assert_eq!(metric.status_code_counts.get(&503), Some(&1));
    assert_eq!(metric.error_counts.len(), 1);
    assert_eq!(metric.error_counts.get("timeout"), Some(&1));
}

#[test]
fn empty_window_reports_no_data() {
    let metric = aggregate(&[]);

    assert_eq!(metric, Metric::empty());
    assert_eq!(metric.availability, None);
    assert!(!metric.has_data());
    assert_eq!(metric.average, Breakdown::default());
    assert!(metric.response_percentiles.is_none());
}

#[test]
fn aggregate_is_idempotent() {
    let window = vec![response(200, 60), failure("connection refused"), response(404, 90)];

    assert_eq!(aggregate(&window), aggregate(&window));
}

#[test]
fn average_and_max_are_computed_per_phase() {
    let mut plaintext = response(200, 100);
    plaintext.tls = Duration::ZERO;
    let window = vec![response(200, 60), plaintext];

    let metric = aggregate(&window);

    assert_eq!(metric.average.tls, Duration::from_millis(4));
    assert_eq!(metric.max.tls, Duration::from_millis(8));
    assert_eq!(metric.average.response, Duration::from_millis(80));
    assert_eq!(metric.max.response, Duration::from_millis(100));
    assert_eq!(metric.max.transfer, Duration::from_millis(60));
}

#[test]
fn processing_time_excludes_connection_setup() {
    let metric = aggregate(&[response(200, 50)]);

    // ttfb 40ms minus dns 2ms, connect 5ms and tls 8ms
    assert_eq!(metric.average.processing, Duration::from_millis(25));
    assert_eq!(metric.average.transfer, Duration::from_millis(10));
}

#[test]
fn failed_samples_count_as_zero_durations() {
    let window = vec![response(200, 100), failure("dns failure")];

    let metric = aggregate(&window);

    assert_eq!(metric.average.dns, Duration::from_millis(1));
    assert_eq!(metric.average.response, Duration::from_millis(50));
}

#[test]
fn identical_error_strings_are_merged() {
    let mut refused = failure("connection failed");
    if let Some(error) = refused.error.as_mut() {
        error.kind = ProbeErrorKind::ConnectRefused;
    }
    let window = vec![failure("connection failed"), refused];

    let metric = aggregate(&window);

    assert_eq!(metric.error_counts.get("connection failed"), Some(&2));
}

#[test]
fn response_percentiles_track_total_time() {
    let window: Vec<Sample> = (1..=100).map(|ms| response(200, ms)).collect();

    let percentiles = aggregate(&window)
        .response_percentiles
        .expect("percentiles");

    let p50 = percentiles.p50.as_secs_f64() * 1000.0;
    let p99 = percentiles.p99.as_secs_f64() * 1000.0;
    assert!((p50 - 50.0).abs() < 1.0, "p50 was {p50}");
    assert!((p99 - 99.0).abs() < 1.0, "p99 was {p99}");
    assert!(percentiles.p90 <= percentiles.p99);
}
