use crate::common::net::parse_target_url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A lookback duration in whole seconds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timespan(u64);

impl Timespan {
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    pub fn duration(self) -> Duration {
        Duration::from_secs(self.0)
    }

    pub fn label(self) -> String {
        match self.0 {
            0 => "0s".to_string(),
            secs if secs % 3600 == 0 => format!("{}h", secs / 3600),
            secs if secs % 60 == 0 => format!("{}m", secs / 60),
            secs => format!("{secs}s"),
        }
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Dashboard statistic: aggregate over `timespan`, refreshed every `frequency` seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatisticRule {
    pub timespan: Timespan,
    pub frequency: u64,
}

impl StatisticRule {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.frequency)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertRule {
    pub timespan: Timespan,
    pub frequency: u64,
    pub threshold: f64,
}

impl Default for AlertRule {
    fn default() -> Self {
        Self {
            timespan: Timespan::from_secs(120),
            frequency: 10,
            threshold: 0.8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    pub max_samples: usize,
    pub max_age_secs: Option<u64>,
}

impl RetentionPolicy {
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_samples: 1000,
            max_age_secs: None,
        }
    }
}

/// One aggregation loop: which timespan to recompute and how often.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AggregationRule {
    pub timespan: Timespan,
    pub frequency: Duration,
    pub alerting: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub targets: Vec<String>,
    pub poll_interval_secs: u64,
    pub probe_timeout_secs: u64,
    pub retention: RetentionPolicy,
    pub statistics: Vec<StatisticRule>,
    pub alerts: AlertRule,
    /// Points kept per (target, timespan) in the average response time series.
    pub response_history: usize,
    /// Alerts kept per target.
    pub alert_history: usize,
    pub listen: SocketAddr,
    pub ui_refresh_hz: u16,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            poll_interval_secs: 5,
            probe_timeout_secs: 10,
            retention: RetentionPolicy::default(),
            statistics: vec![
                StatisticRule {
                    timespan: Timespan::from_secs(600),
                    frequency: 10,
                },
                StatisticRule {
                    timespan: Timespan::from_secs(3600),
                    frequency: 60,
                },
            ],
            alerts: AlertRule::default(),
            response_history: 60,
            alert_history: 50,
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, 7321)),
            ui_refresh_hz: 4,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no targets configured")]
    NoTargets,
    #[error("invalid target {value:?}: expected an http(s) URL")]
    InvalidTarget { value: String },
    #[error("target {url} is configured twice")]
    DuplicateTarget { url: String },
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
    #[error("at least one statistic rule is required")]
    NoStatistics,
    #[error("alert threshold must be within [0, 1] (got {value})")]
    InvalidThreshold { value: f64 },
    #[error("retention max age ({max_age_secs}s) is shorter than the {timespan} timespan")]
    RetentionTooShort {
        max_age_secs: u64,
        timespan: Timespan,
    },
}

impl MonitorConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sitewatch").join("config.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `explicit` if given, else the default path when it exists, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn target_urls(&self) -> Result<Vec<Url>, ConfigError> {
        let mut urls: Vec<Url> = Vec::with_capacity(self.targets.len());
        for value in &self.targets {
            let url = parse_target_url(value).ok_or_else(|| ConfigError::InvalidTarget {
                value: value.clone(),
            })?;
            if urls.contains(&url) {
                return Err(ConfigError::DuplicateTarget {
                    url: url.to_string(),
                });
            }
            urls.push(url);
        }
        Ok(urls)
    }

    /// Every timespan a consumer may query: statistic timespans plus the alert timespan.
    pub fn timespans(&self) -> Vec<Timespan> {
        let mut timespans: Vec<Timespan> = self.statistics.iter().map(|s| s.timespan).collect();
        timespans.push(self.alerts.timespan);
        timespans.sort();
        timespans.dedup();
        timespans
    }

    pub fn longest_timespan(&self) -> Option<Timespan> {
        self.timespans().into_iter().max()
    }

    /// Statistic rules and the alert rule merged by timespan; the shortest frequency wins.
    pub fn aggregation_rules(&self) -> Vec<AggregationRule> {
        let mut by_timespan: BTreeMap<Timespan, u64> = BTreeMap::new();
        let rules = self
            .statistics
            .iter()
            .map(|s| (s.timespan, s.frequency))
            .chain(std::iter::once((self.alerts.timespan, self.alerts.frequency)));
        for (timespan, frequency) in rules {
            by_timespan
                .entry(timespan)
                .and_modify(|current| *current = (*current).min(frequency))
                .or_insert(frequency);
        }
        by_timespan
            .into_iter()
            .map(|(timespan, frequency)| AggregationRule {
                timespan,
                frequency: Duration::from_secs(frequency),
                alerting: timespan == self.alerts.timespan,
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        self.target_urls()?;

        let non_zero = [
            ("poll_interval_secs", self.poll_interval_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
            ("retention.max_samples", self.retention.max_samples as u64),
            ("alerts.timespan", self.alerts.timespan.as_secs()),
            ("alerts.frequency", self.alerts.frequency),
            ("ui_refresh_hz", u64::from(self.ui_refresh_hz)),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::ZeroValue { field });
            }
        }

        if self.statistics.is_empty() {
            return Err(ConfigError::NoStatistics);
        }
        for rule in &self.statistics {
            if rule.timespan.as_secs() == 0 {
                return Err(ConfigError::ZeroValue {
                    field: "statistics.timespan",
                });
            }
            if rule.frequency == 0 {
                return Err(ConfigError::ZeroValue {
                    field: "statistics.frequency",
                });
            }
        }

        if !(0.0..=1.0).contains(&self.alerts.threshold) {
            return Err(ConfigError::InvalidThreshold {
                value: self.alerts.threshold,
            });
        }

        if let Some(max_age_secs) = self.retention.max_age_secs
            && let Some(longest) = self.longest_timespan()
            && max_age_secs < longest.as_secs()
        {
            return Err(ConfigError::RetentionTooShort {
                max_age_secs,
                timespan: longest,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_with_target() -> MonitorConfig {
        MonitorConfig {
            targets: vec!["https://example.com".to_string()],
            ..MonitorConfig::default()
        }
    }

    #[test]
    fn timespan_label_picks_largest_whole_unit() {
        assert_eq!(Timespan::from_secs(45).label(), "45s");
        assert_eq!(Timespan::from_secs(120).label(), "2m");
        assert_eq!(Timespan::from_secs(3600).label(), "1h");
        assert_eq!(Timespan::from_secs(5400).to_string(), "90m");
    }

    #[test]
    fn default_config_with_target_is_valid() {
        config_with_target().validate().expect("valid");
    }

    #[test]
    fn validate_rejects_missing_targets() {
        let err = MonitorConfig::default().validate().expect_err("no targets");
        assert!(matches!(err, ConfigError::NoTargets));
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let config = MonitorConfig {
            poll_interval_secs: 0,
            ..config_with_target()
        };
        match config.validate().expect_err("zero interval") {
            ConfigError::ZeroValue { field } => assert_eq!(field, "poll_interval_secs"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_rejects_threshold_out_of_range() {
        let mut config = config_with_target();
        config.alerts.threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_targets() {
        let config = MonitorConfig {
            targets: vec!["example.com".to_string(), "https://example.com".to_string()],
            ..MonitorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateTarget { .. })
        ));
    }

    #[test]
    fn validate_rejects_max_age_shorter_than_longest_timespan() {
        let mut config = config_with_target();
        config.retention.max_age_secs = Some(600);
        match config.validate().expect_err("too short") {
            ConfigError::RetentionTooShort { timespan, .. } => {
                assert_eq!(timespan, Timespan::from_secs(3600))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn aggregation_rules_merge_alert_rule_by_timespan() {
        let mut config = config_with_target();
        config.alerts = AlertRule {
            timespan: Timespan::from_secs(600),
            frequency: 5,
            threshold: 0.9,
        };

        let rules = config.aggregation_rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].timespan, Timespan::from_secs(600));
        assert_eq!(rules[0].frequency, Duration::from_secs(5));
        assert!(rules[0].alerting);
        assert_eq!(rules[1].timespan, Timespan::from_secs(3600));
        assert!(!rules[1].alerting);
    }

    #[test]
    fn aggregation_rules_add_standalone_alert_rule() {
        let config = config_with_target();
        let rules = config.aggregation_rules();
        let timespans: Vec<u64> = rules.iter().map(|r| r.timespan.as_secs()).collect();
        assert_eq!(timespans, vec![120, 600, 3600]);
        assert!(rules[0].alerting);
        assert_eq!(config.timespans().len(), 3);
    }

    #[test]
    fn from_file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{"targets": ["example.org"], "alerts": {{"timespan": 60, "frequency": 5, "threshold": 0.5}}}}"#
        )
        .expect("write");

        let config = MonitorConfig::from_file(file.path()).expect("config");
        assert_eq!(config.targets, vec!["example.org".to_string()]);
        assert_eq!(config.alerts.timespan, Timespan::from_secs(60));
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.statistics.len(), 2);
        config.validate().expect("valid");
    }

    #[test]
    fn from_file_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "{{ not json").expect("write");

        let err = MonitorConfig::from_file(file.path()).expect_err("parse error");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse config"));
    }
}
