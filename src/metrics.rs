use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    Dns,
    Connect,
    Tls,
    Processing,
    Ttfb,
    Transfer,
    Response,
}

impl Phase {
    pub fn iter_all() -> &'static [Phase] {
        &[
            Phase::Dns,
            Phase::Connect,
            Phase::Tls,
            Phase::Processing,
            Phase::Ttfb,
            Phase::Transfer,
            Phase::Response,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Dns => "DNS",
            Phase::Connect => "TCP",
            Phase::Tls => "TLS",
            Phase::Processing => "Srv Process",
            Phase::Ttfb => "TTFB",
            Phase::Transfer => "Transfer",
            Phase::Response => "Response",
        }
    }
}

/// One duration per request phase.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub dns: Duration,
    pub connect: Duration,
    pub tls: Duration,
    pub processing: Duration,
    pub ttfb: Duration,
    pub transfer: Duration,
    pub response: Duration,
}

impl Breakdown {
    pub fn get(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Dns => self.dns,
            Phase::Connect => self.connect,
            Phase::Tls => self.tls,
            Phase::Processing => self.processing,
            Phase::Ttfb => self.ttfb,
            Phase::Transfer => self.transfer,
            Phase::Response => self.response,
        }
    }

    pub fn get_mut(&mut self, phase: Phase) -> &mut Duration {
        match phase {
            Phase::Dns => &mut self.dns,
            Phase::Connect => &mut self.connect,
            Phase::Tls => &mut self.tls,
            Phase::Processing => &mut self.processing,
            Phase::Ttfb => &mut self.ttfb,
            Phase::Transfer => &mut self.transfer,
            Phase::Response => &mut self.response,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
}

/// Statistics over one window of samples.
///
/// `availability` is `None` when the window holds no samples, which callers must
/// keep apart from a fully available target.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub samples: usize,
    pub availability: Option<f64>,
    pub average: Breakdown,
    pub max: Breakdown,
    pub response_percentiles: Option<Percentiles>,
    pub status_code_counts: BTreeMap<u16, usize>,
    pub error_counts: BTreeMap<String, usize>,
}

impl Metric {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_data(&self) -> bool {
        self.samples > 0
    }

    pub fn total_errors(&self) -> usize {
        self.error_counts.values().sum()
    }

    /// Error messages ordered by count (descending), then text.
    pub fn errors_by_frequency(&self) -> Vec<(&str, usize)> {
        let mut errors: Vec<(&str, usize)> = self
            .error_counts
            .iter()
            .map(|(message, count)| (message.as_str(), *count))
            .collect();
        errors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        errors
    }
}
