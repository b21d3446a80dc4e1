//! Splits a time-ordered sample log into expired and in-window parts.
//!
//! Both selectors assume the log is sorted by ascending timestamp and return the
//! index of the first sample with `timestamp >= now - timespan`; `log[index..]` is
//! the window. An empty result is `index == log.len()`, never an error.

use crate::config::Timespan;
use crate::probe::Sample;
use std::collections::VecDeque;
use std::time::SystemTime;

fn threshold(timespan: Timespan, now: SystemTime) -> Option<SystemTime> {
    now.checked_sub(timespan.duration())
}

/// Reverse linear scan. Stops at the newest expired sample, so the cost is the
/// window length rather than the log length.
pub fn start_index_for(log: &VecDeque<Sample>, timespan: Timespan, now: SystemTime) -> usize {
    let Some(threshold) = threshold(timespan, now) else {
        return 0;
    };
    log.iter()
        .rposition(|sample| sample.timestamp < threshold)
        .map_or(0, |i| i + 1)
}

/// Binary search variant of [`start_index_for`], O(log n).
pub fn start_index_bisect(log: &VecDeque<Sample>, timespan: Timespan, now: SystemTime) -> usize {
    let Some(threshold) = threshold(timespan, now) else {
        return 0;
    };
    log.partition_point(|sample| sample.timestamp < threshold)
}
