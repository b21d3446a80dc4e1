use crate::alerts::Alert;
use crate::metrics::Metric;
use chrono::{DateTime, Local};
use ratatui::style::Color;
use std::time::Duration;

pub(super) fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Rounds to the millisecond: `0ms`, `87ms`, `1.25s`.
pub(super) fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms >= 1000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        format!("{ms}ms")
    }
}

pub(super) fn color_for_availability(availability: f64) -> Color {
    let percent = availability * 100.0;
    if percent > 90.0 {
        Color::Green
    } else if percent > 70.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Status codes in ascending order followed by the `err` bucket.
pub(super) fn code_bars(metric: &Metric) -> Vec<(String, u64)> {
    metric
        .status_code_counts
        .iter()
        .map(|(code, count)| (code.to_string(), *count as u64))
        .chain(std::iter::once((
            "err".to_string(),
            metric.total_errors() as u64,
        )))
        .collect()
}

pub(super) fn error_lines(metric: &Metric) -> Vec<String> {
    metric
        .errors_by_frequency()
        .into_iter()
        .map(|(message, count)| {
            let times = if count == 1 { "time" } else { "times" };
            format!("{message} ({count} {times})")
        })
        .collect()
}

/// Response time series as chart points, in milliseconds.
pub(super) fn history_points(history: &[Duration]) -> Vec<(f64, f64)> {
    history
        .iter()
        .enumerate()
        .map(|(i, d)| (i as f64, d.as_secs_f64() * 1000.0))
        .collect()
}

pub(super) fn format_alert(alert: &Alert) -> String {
    let time: DateTime<Local> = alert.timeframe_end.into();
    format!("{alert}, time={}", time.format("%Y-%m-%d %H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn durations_round_to_milliseconds() {
        assert_eq!(format_duration(Duration::from_micros(87_400)), "87ms");
        assert_eq!(format_duration(Duration::ZERO), "0ms");
        assert_eq!(format_duration(Duration::from_millis(1250)), "1.25s");
    }

    #[test]
    fn availability_colors_follow_thresholds() {
        assert_eq!(color_for_availability(0.95), Color::Green);
        assert_eq!(color_for_availability(0.9), Color::Yellow);
        assert_eq!(color_for_availability(0.71), Color::Yellow);
        assert_eq!(color_for_availability(0.7), Color::Red);
    }

    #[test]
    fn code_bars_end_with_error_bucket() {
        let mut metric = Metric::empty();
        metric.status_code_counts.insert(503, 1);
        metric.status_code_counts.insert(200, 2);
        metric.error_counts.insert("timeout".to_string(), 3);

        assert_eq!(
            code_bars(&metric),
            vec![
                ("200".to_string(), 2),
                ("503".to_string(), 1),
                ("err".to_string(), 3)
            ]
        );
    }

    #[test]
    fn error_lines_are_most_frequent_first() {
        let mut metric = Metric::empty();
        metric.error_counts.insert("dns failure".to_string(), 1);
        metric.error_counts.insert("timeout".to_string(), 4);

        assert_eq!(
            error_lines(&metric),
            vec!["timeout (4 times)", "dns failure (1 time)"]
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("ééééééééé", 6), "ééé...");
    }

    #[test]
    fn alert_lines_carry_status_and_time() {
        let alert = Alert {
            target: "https://example.com/".to_string(),
            availability: 0.25,
            is_down: true,
            timeframe_end: SystemTime::now(),
        };
        let line = format_alert(&alert);
        assert!(line.starts_with("https://example.com/ is down. availability=0.250, time="));
    }
}
