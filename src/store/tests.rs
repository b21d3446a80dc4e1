use super::{SampleLog, StatusSource, Store, StoreError};
use crate::common::time::Clock;
use crate::config::{AlertRule, MonitorConfig, RetentionPolicy, StatisticRule, Timespan};
use crate::probe::{ProbeError, ProbeErrorKind, Sample};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};

const TARGET: &str = "https://example.com/";
const SHORT: Timespan = Timespan::from_secs(60);
const LONG: Timespan = Timespan::from_secs(600);

struct ManualClock(Mutex<SystemTime>);

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000),
        )))
    }

    fn advance(&self, by: Duration) {
        let mut now = self.0.lock().expect("clock");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.0.lock().expect("clock")
    }
}

fn config() -> MonitorConfig {
    MonitorConfig {
        targets: vec![TARGET.to_string(), "https://other.test".to_string()],
        statistics: vec![StatisticRule {
            timespan: LONG,
            frequency: 10,
        }],
        alerts: AlertRule {
            timespan: SHORT,
            frequency: 5,
            threshold: 0.9,
        },
        retention: RetentionPolicy {
            max_samples: 100,
            max_age_secs: None,
        },
        response_history: 3,
        alert_history: 10,
        ..MonitorConfig::default()
    }
}

fn ok_at(ts: SystemTime, total_ms: u64) -> Sample {
    Sample {
        timestamp: ts,
        dns: Duration::from_millis(1),
        connect: Duration::from_millis(2),
        tls: Duration::from_millis(3),
        ttfb: Duration::from_millis(10),
        total: Duration::from_millis(total_ms),
        status_code: Some(200),
        error: None,
    }
}

fn err_at(ts: SystemTime) -> Sample {
    Sample::failed(ts, ProbeError::new(ProbeErrorKind::Timeout, "timeout"))
}

#[test]
fn append_and_query_round_through_refresh() {
    let clock = ManualClock::new();
    let store = Store::with_clock(&config(), clock.clone()).expect("store");
    let now = clock.now();

    store.append_sample(TARGET, ok_at(now, 20)).expect("append");
    store.append_sample(TARGET, err_at(now)).expect("append");

    let before = store.query(TARGET, LONG).expect("query");
    assert_eq!(before.metric.availability, None);
    assert!(before.computed_at.is_none());

    store.refresh_metrics(TARGET, LONG).expect("refresh");
    let after = store.query(TARGET, LONG).expect("query");
    assert_eq!(after.metric.samples, 2);
    assert_eq!(after.metric.availability, Some(0.5));
    assert_eq!(after.computed_at, Some(now));
    assert_eq!(after.response_history, vec![Duration::from_millis(10)]);
}

#[test]
fn lookups_accept_unnormalized_urls() {
    let store = Store::new(&config()).expect("store");
    store
        .append_sample("example.com", ok_at(SystemTime::now(), 5))
        .expect("append");
    assert_eq!(store.sample_count("https://example.com").expect("count"), 1);
}

#[test]
fn unknown_target_and_timespan_are_errors() {
    let store = Store::new(&config()).expect("store");

    let err = store
        .append_sample("https://nope.test/", ok_at(SystemTime::now(), 5))
        .expect_err("unknown target");
    assert!(matches!(err, StoreError::UnknownTarget { .. }));

    let err = store
        .query(TARGET, Timespan::from_secs(42))
        .expect_err("unknown timespan");
    assert!(matches!(err, StoreError::UnknownTimespan { .. }));
}

#[test]
fn alerts_fire_only_on_the_alert_timespan() {
    let clock = ManualClock::new();
    let store = Store::with_clock(&config(), clock.clone()).expect("store");
    store.append_sample(TARGET, err_at(clock.now())).expect("append");

    assert!(store.refresh_metrics(TARGET, LONG).expect("refresh").is_none());
    let alert = store
        .refresh_metrics(TARGET, SHORT)
        .expect("refresh")
        .expect("down alert");
    assert!(alert.is_down);
    assert_eq!(alert.target, TARGET);
    assert_eq!(alert.timeframe_end, clock.now());

    let snapshot = store.query(TARGET, LONG).expect("query");
    assert!(snapshot.is_down);
    assert_eq!(snapshot.alerts.len(), 1);
}

#[test]
fn availability_sequence_produces_two_alerts() {
    let clock = ManualClock::new();
    let store = Store::with_clock(&config(), clock.clone()).expect("store");

    // Each round replaces the whole 60s window with two samples.
    let rounds: [(bool, bool); 5] = [
        (true, true),
        (true, false),
        (true, false),
        (true, true),
        (true, true),
    ];
    let mut fired = Vec::new();
    for (first_ok, second_ok) in rounds {
        clock.advance(Duration::from_secs(120));
        let now = clock.now();
        for ok in [first_ok, second_ok] {
            let sample = if ok { ok_at(now, 10) } else { err_at(now) };
            store.append_sample(TARGET, sample).expect("append");
        }
        fired.extend(store.refresh_all(SHORT).expect("refresh"));
    }

    let states: Vec<bool> = fired.iter().map(|a| a.is_down).collect();
    assert_eq!(states, vec![true, false]);
    assert_eq!(fired[0].availability, 0.5);
    assert_eq!(fired[1].availability, 1.0);

    let snapshot = store.query(TARGET, SHORT).expect("query");
    assert_eq!(snapshot.alerts.len(), 2);
    assert!(!snapshot.is_down);
}

#[test]
fn empty_window_does_not_alert() {
    let clock = ManualClock::new();
    let store = Store::with_clock(&config(), clock.clone()).expect("store");
    store.append_sample(TARGET, err_at(clock.now())).expect("append");
    clock.advance(Duration::from_secs(3600));

    assert!(store.refresh_metrics(TARGET, SHORT).expect("refresh").is_none());
    let snapshot = store.query(TARGET, SHORT).expect("query");
    assert_eq!(snapshot.metric.availability, None);
    assert!(snapshot.response_history.is_empty());
}

#[test]
fn response_history_is_bounded() {
    let clock = ManualClock::new();
    let store = Store::with_clock(&config(), clock.clone()).expect("store");

    for total_ms in [10, 20, 30, 40, 50] {
        clock.advance(Duration::from_secs(700));
        store.append_sample(TARGET, ok_at(clock.now(), total_ms)).expect("append");
        store.refresh_metrics(TARGET, LONG).expect("refresh");
    }

    let snapshot = store.query(TARGET, LONG).expect("query");
    assert_eq!(
        snapshot.response_history,
        vec![
            Duration::from_millis(30),
            Duration::from_millis(40),
            Duration::from_millis(50)
        ]
    );
}

#[test]
fn concurrent_appends_are_never_lost() {
    let mut cfg = config();
    cfg.retention.max_samples = 10_000;
    let store = Arc::new(Store::new(&cfg).expect("store"));
    let writers = 8;
    let per_writer = 200;

    let handles: Vec<_> = (0..writers)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..per_writer {
                    store
                        .append_sample(TARGET, ok_at(SystemTime::now(), 5))
                        .expect("append");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer");
    }

    assert_eq!(store.sample_count(TARGET).expect("count"), writers * per_writer);
    store.refresh_metrics(TARGET, LONG).expect("refresh");
    let snapshot = store.query(TARGET, LONG).expect("query");
    assert_eq!(snapshot.metric.samples, writers * per_writer);
}

#[test]
fn readers_run_alongside_writers() {
    let store = Arc::new(Store::new(&config()).expect("store"));
    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..500 {
                store
                    .append_sample(TARGET, ok_at(SystemTime::now(), 5))
                    .expect("append");
            }
        })
    };

    let mut last_seen = 0;
    for _ in 0..50 {
        store.refresh_metrics(TARGET, LONG).expect("refresh");
        let seen = store.query(TARGET, LONG).expect("query").metric.samples;
        assert!(seen <= 100, "retention bound exceeded: {seen}");
        assert!(seen >= last_seen.min(100));
        last_seen = seen;
    }
    writer.join().expect("writer");
}

#[test]
fn late_sample_is_inserted_in_timestamp_order() {
    let mut log = SampleLog::new();
    let retention = RetentionPolicy::default();
    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(100);

    assert!(!log.push(ok_at(base, 1), &retention, base));
    assert!(!log.push(ok_at(base + Duration::from_secs(10), 2), &retention, base));
    assert!(log.push(ok_at(base + Duration::from_secs(5), 3), &retention, base));
    assert!(log.push(ok_at(base + Duration::from_secs(5), 4), &retention, base));

    let totals: Vec<u64> = log.iter().map(|s| s.total.as_millis() as u64).collect();
    assert_eq!(totals, vec![1, 3, 4, 2]);
}

#[test]
fn trimming_keeps_the_newest_samples() {
    let mut log = SampleLog::new();
    let retention = RetentionPolicy {
        max_samples: 3,
        max_age_secs: None,
    };
    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1000);
    for i in 0..5 {
        log.push(ok_at(base + Duration::from_secs(i), i), &retention, base);
    }

    let totals: Vec<u64> = log.iter().map(|s| s.total.as_millis() as u64).collect();
    assert_eq!(totals, vec![2, 3, 4]);
}

#[test]
fn trimming_by_age_drops_expired_samples() {
    let mut log = SampleLog::new();
    let retention = RetentionPolicy {
        max_samples: 100,
        max_age_secs: Some(60),
    };
    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1000);
    log.push(ok_at(base, 1), &retention, base);
    log.push(ok_at(base + Duration::from_secs(30), 2), &retention, base);

    let later = base + Duration::from_secs(80);
    log.push(ok_at(later, 3), &retention, later);

    let totals: Vec<u64> = log.iter().map(|s| s.total.as_millis() as u64).collect();
    assert_eq!(totals, vec![2, 3]);
}

#[test]
fn window_snapshot_survives_a_later_trim() {
    let mut log = SampleLog::new();
    let roomy = RetentionPolicy {
        max_samples: 10,
        max_age_secs: None,
    };
    let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1000);
    for i in 0..6 {
        log.push(ok_at(now - Duration::from_secs(6 - i), i), &roomy, now);
    }

    let snapshot = log.window(Timespan::from_secs(60), now);
    log.trim(
        &RetentionPolicy {
            max_samples: 2,
            max_age_secs: None,
        },
        now,
    );

    assert_eq!(log.len(), 2);
    assert_eq!(snapshot.len(), 6);
    assert_eq!(crate::aggregate::aggregate(&snapshot).samples, 6);
    assert_eq!(log.window(Timespan::from_secs(60), now).len(), 2);
    assert_eq!(log.start_index_for(Timespan::from_secs(60), now), 0);
}

#[test]
fn status_source_lists_targets_with_timespans() {
    let store = Store::new(&config()).expect("store");
    let targets = StatusSource::targets(&store).expect("targets");

    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0].url, TARGET);
    assert_eq!(targets[1].url, "https://other.test/");
    assert_eq!(targets[0].timespans, vec![SHORT, LONG]);
    assert_eq!(targets[0].statistics, config().statistics);
    assert_eq!(targets[0].alerts.timespan, SHORT);
    assert_eq!(targets[0].alerts.threshold, 0.9);
}
