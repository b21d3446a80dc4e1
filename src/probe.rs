use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime};
use url::Url;

/// Outcome of one completed probe. Never mutated after creation.
///
/// `ttfb` is measured from the start of the request, so it includes DNS, connect
/// and TLS time. A transport failure carries `error` and no `status_code`; an HTTP
/// response carries `status_code` and no `error`, whatever the code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: SystemTime,
    pub dns: Duration,
    pub connect: Duration,
    /// Zero on plaintext connections.
    pub tls: Duration,
    pub ttfb: Duration,
    pub total: Duration,
    pub status_code: Option<u16>,
    pub error: Option<ProbeError>,
}

impl Sample {
    pub fn is_valid(&self) -> bool {
        self.error.is_none() && self.status_code.is_none_or(|code| code < 400)
    }

    pub fn failed(timestamp: SystemTime, error: ProbeError) -> Self {
        Self {
            timestamp,
            dns: Duration::ZERO,
            connect: Duration::ZERO,
            tls: Duration::ZERO,
            ttfb: Duration::ZERO,
            total: Duration::ZERO,
            status_code: None,
            error: Some(error),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    Dns,
    ConnectTimeout,
    ConnectRefused,
    Tls,
    Timeout,
    Http,
    Read,
    Io,
}

impl ProbeErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProbeErrorKind::Dns => "dns",
            ProbeErrorKind::ConnectTimeout => "connect_timeout",
            ProbeErrorKind::ConnectRefused => "connect_refused",
            ProbeErrorKind::Tls => "tls",
            ProbeErrorKind::Timeout => "timeout",
            ProbeErrorKind::Http => "http",
            ProbeErrorKind::Read => "read",
            ProbeErrorKind::Io => "io",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeErrorKind::ConnectTimeout | ProbeErrorKind::Timeout)
    }
}

/// A transport-level probe failure. Error tallies key on its display string,
/// so two kinds with the same message are counted together.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProbeError {
    pub kind: ProbeErrorKind,
    pub message: String,
}

impl ProbeError {
    pub fn new(kind: ProbeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProbeError {}

/// Performs one probe of a target. Must not panic: every failure is reported as
/// a [`Sample`] with `error` set. Implementations bound their own duration.
pub trait Probe: Send {
    fn probe(&mut self, target: &Url) -> Sample;
}
