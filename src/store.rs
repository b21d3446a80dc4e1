use crate::alerts::{self, Alert, AlertState};
use crate::common::net::parse_target_url;
use crate::common::time::{Clock, SystemClock};
use crate::config::{AlertRule, ConfigError, MonitorConfig, RetentionPolicy, StatisticRule, Timespan};
use crate::features::metrics::aggregate::aggregate;
use crate::features::metrics::window;
use crate::metrics::Metric;
use crate::probe::Sample;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown target {url}")]
    UnknownTarget { url: String },
    #[error("timespan {timespan} is not configured")]
    UnknownTimespan { timespan: Timespan },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Samples of one target, ordered by ascending timestamp.
#[derive(Debug, Default)]
pub struct SampleLog {
    samples: VecDeque<Sample>,
}

impl SampleLog {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Appends `sample` and applies `retention`. A sample older than the tail is
    /// inserted after every sample with the same or an earlier timestamp, so the
    /// log stays sorted; returns `true` in that case.
    pub fn push(&mut self, sample: Sample, retention: &RetentionPolicy, now: SystemTime) -> bool {
        let late = self
            .samples
            .back()
            .is_some_and(|last| sample.timestamp < last.timestamp);
        if late {
            let index = self
                .samples
                .partition_point(|s| s.timestamp <= sample.timestamp);
            self.samples.insert(index, sample);
        } else {
            self.samples.push_back(sample);
        }
        self.trim(retention, now);
        late
    }

    /// Drops samples from the front until the log fits `retention`.
    pub fn trim(&mut self, retention: &RetentionPolicy, now: SystemTime) {
        while self.samples.len() > retention.max_samples {
            self.samples.pop_front();
        }
        if let Some(max_age) = retention.max_age()
            && let Some(cutoff) = now.checked_sub(max_age)
        {
            while self.samples.front().is_some_and(|s| s.timestamp < cutoff) {
                self.samples.pop_front();
            }
        }
    }

    pub fn start_index_for(&self, timespan: Timespan, now: SystemTime) -> usize {
        window::start_index_for(&self.samples, timespan, now)
    }

    /// Copy of the samples within `timespan` of `now`. The copy is unaffected by
    /// later appends and trims.
    pub fn window(&self, timespan: Timespan, now: SystemTime) -> Vec<Sample> {
        let start = self.start_index_for(timespan, now);
        self.samples.range(start..).cloned().collect()
    }
}

/// What a consumer sees for one (target, timespan).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub url: String,
    pub timespan: Timespan,
    pub metric: Metric,
    /// Average response time of each refresh, oldest first.
    pub response_history: Vec<Duration>,
    pub alerts: Vec<Alert>,
    pub is_down: bool,
    /// `None` until the first refresh of this timespan.
    pub computed_at: Option<SystemTime>,
}

/// What a consumer may query for one target: every aggregated timespan, the
/// statistic rules behind them and the alert rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub url: String,
    pub timespans: Vec<Timespan>,
    pub statistics: Vec<StatisticRule>,
    pub alerts: AlertRule,
}

/// Read side used by the dashboard; served either by a local [`Store`] or over
/// the remote channel.
pub trait StatusSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn targets(&self) -> Result<Vec<TargetInfo>, Self::Error>;

    fn query(&self, url: &str, timespan: Timespan) -> Result<TargetSnapshot, Self::Error>;
}

#[derive(Debug, Default)]
struct WindowView {
    metric: Metric,
    response_history: VecDeque<Duration>,
    computed_at: Option<SystemTime>,
}

#[derive(Debug, Default)]
struct TargetView {
    windows: HashMap<Timespan, WindowView>,
    alerts: VecDeque<Alert>,
    alert_state: AlertState,
}

#[derive(Debug, Default)]
struct TargetSlot {
    log: RwLock<SampleLog>,
    view: RwLock<TargetView>,
}

/// Shared state of every target.
///
/// Each target has two locks: one over its sample log (pollers write, the
/// aggregator copies a window out under a read lock) and one over its computed
/// view (the aggregator replaces a metric and evaluates alerts under a single
/// write lock, consumers read metric and alerts under a single read lock).
/// Aggregation itself runs with no lock held, and no lock spans two targets.
pub struct Store {
    order: Vec<String>,
    targets: HashMap<String, TargetSlot>,
    timespans: Vec<Timespan>,
    statistics: Vec<StatisticRule>,
    alerts: AlertRule,
    retention: RetentionPolicy,
    response_history: usize,
    alert_history: usize,
    clock: Box<dyn Clock>,
}

impl Store {
    pub fn new(config: &MonitorConfig) -> Result<Self, StoreError> {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock(
        config: &MonitorConfig,
        clock: impl Clock + 'static,
    ) -> Result<Self, StoreError> {
        let order: Vec<String> = config
            .target_urls()?
            .into_iter()
            .map(|url| url.to_string())
            .collect();
        let targets = order
            .iter()
            .map(|url| (url.clone(), TargetSlot::default()))
            .collect();

        Ok(Self {
            order,
            targets,
            timespans: config.timespans(),
            statistics: config.statistics.clone(),
            alerts: config.alerts,
            retention: config.retention,
            response_history: config.response_history,
            alert_history: config.alert_history,
            clock: Box::new(clock),
        })
    }

    pub fn target_urls(&self) -> &[String] {
        &self.order
    }

    pub fn alert_timespan(&self) -> Timespan {
        self.alerts.timespan
    }

    pub fn append_sample(&self, url: &str, sample: Sample) -> Result<(), StoreError> {
        let (key, slot) = self.slot(url)?;
        let now = self.clock.now();
        let late = write(&slot.log).push(sample, &self.retention, now);
        if late {
            tracing::debug!(target_url = key, "late sample inserted by timestamp");
        }
        Ok(())
    }

    pub fn sample_count(&self, url: &str) -> Result<usize, StoreError> {
        let (_, slot) = self.slot(url)?;
        Ok(read(&slot.log).len())
    }

    /// Recomputes the metric of (`url`, `timespan`) and, for the alert timespan,
    /// runs the alert transition. Returns the alert if one fired.
    pub fn refresh_metrics(&self, url: &str, timespan: Timespan) -> Result<Option<Alert>, StoreError> {
        self.check_timespan(timespan)?;
        let (key, slot) = self.slot(url)?;
        let now = self.clock.now();

        let window = read(&slot.log).window(timespan, now);
        let metric = aggregate(&window);

        let mut view = write(&slot.view);
        let alert = if timespan == self.alerts.timespan {
            alerts::evaluate(
                &mut view.alert_state,
                key,
                metric.availability,
                self.alerts.threshold,
                now,
            )
        } else {
            None
        };
        if let Some(alert) = &alert {
            view.alerts.push_back(alert.clone());
            while view.alerts.len() > self.alert_history {
                view.alerts.pop_front();
            }
        }

        let entry = view.windows.entry(timespan).or_default();
        if metric.has_data() {
            entry.response_history.push_back(metric.average.response);
            while entry.response_history.len() > self.response_history {
                entry.response_history.pop_front();
            }
        }
        entry.metric = metric;
        entry.computed_at = Some(now);
        drop(view);

        if let Some(alert) = &alert {
            if alert.is_down {
                tracing::warn!(target_url = key, availability = alert.availability, "target is down");
            } else {
                tracing::info!(target_url = key, availability = alert.availability, "target recovered");
            }
        }
        Ok(alert)
    }

    /// Refreshes `timespan` for every target, in configuration order.
    pub fn refresh_all(&self, timespan: Timespan) -> Result<Vec<Alert>, StoreError> {
        let mut fired = Vec::new();
        for url in &self.order {
            if let Some(alert) = self.refresh_metrics(url, timespan)? {
                fired.push(alert);
            }
        }
        Ok(fired)
    }

    pub fn query(&self, url: &str, timespan: Timespan) -> Result<TargetSnapshot, StoreError> {
        self.check_timespan(timespan)?;
        let (key, slot) = self.slot(url)?;
        let view = read(&slot.view);
        let (metric, response_history, computed_at) = match view.windows.get(&timespan) {
            Some(entry) => (
                entry.metric.clone(),
                entry.response_history.iter().copied().collect(),
                entry.computed_at,
            ),
            None => (Metric::empty(), Vec::new(), None),
        };
        Ok(TargetSnapshot {
            url: key.to_string(),
            timespan,
            metric,
            response_history,
            alerts: view.alerts.iter().cloned().collect(),
            is_down: view.alert_state.is_down(),
            computed_at,
        })
    }

    pub fn targets(&self) -> Vec<TargetInfo> {
        self.order
            .iter()
            .map(|url| TargetInfo {
                url: url.clone(),
                timespans: self.timespans.clone(),
                statistics: self.statistics.clone(),
                alerts: self.alerts,
            })
            .collect()
    }

    fn check_timespan(&self, timespan: Timespan) -> Result<(), StoreError> {
        if self.timespans.contains(&timespan) {
            Ok(())
        } else {
            Err(StoreError::UnknownTimespan { timespan })
        }
    }

    fn slot(&self, url: &str) -> Result<(&str, &TargetSlot), StoreError> {
        if let Some((key, slot)) = self.targets.get_key_value(url) {
            return Ok((key.as_str(), slot));
        }
        parse_target_url(url)
            .and_then(|parsed| self.targets.get_key_value(parsed.as_str()))
            .map(|(key, slot)| (key.as_str(), slot))
            .ok_or_else(|| StoreError::UnknownTarget {
                url: url.to_string(),
            })
    }
}

impl StatusSource for Store {
    type Error = StoreError;

    fn targets(&self) -> Result<Vec<TargetInfo>, StoreError> {
        Ok(Store::targets(self))
    }

    fn query(&self, url: &str, timespan: Timespan) -> Result<TargetSnapshot, StoreError> {
        Store::query(self, url, timespan)
    }
}

// Critical sections never panic, so a poisoned lock still holds consistent data.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests;
