use super::helpers::{map_curl_error, read_timings};
use crate::probe::{Probe, ProbeErrorKind, Sample};
use curl::Error as CurlError;
use curl::easy::{Easy2, Handler, WriteError};
use std::time::{Duration, SystemTime};
use url::Url;

/// Bodies are read up to this many bytes; the transfer is then cut short.
const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

#[derive(Default)]
struct BodyCollector {
    bytes: u64,
    limit: u64,
    limit_reached: bool,
}

impl BodyCollector {
    fn reset(&mut self, limit: u64) {
        self.bytes = 0;
        self.limit = limit;
        self.limit_reached = false;
    }
}

impl Handler for BodyCollector {
    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        let len = data.len() as u64;
        let take = if self.limit == 0 {
            len
        } else {
            len.min(self.limit.saturating_sub(self.bytes))
        };

        self.bytes = self.bytes.saturating_add(take);
        if self.limit > 0 && self.bytes >= self.limit {
            self.limit_reached = true;
        }

        Ok(data.len())
    }

    fn progress(&mut self, _dltotal: f64, dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        if self.limit == 0 {
            return true;
        }
        if self.limit_reached || dlnow >= self.limit as f64 {
            self.limit_reached = true;
            return false;
        }
        true
    }
}

/// HTTP(S) probe built on libcurl. One instance per poller; the handle keeps
/// its connection cache between probes.
pub struct CurlProbe {
    easy: Easy2<BodyCollector>,
    timeout: Duration,
    max_body_bytes: u64,
}

impl CurlProbe {
    /// Handle options are applied per probe, so construction cannot fail.
    pub fn new(timeout: Duration) -> Self {
        Self {
            easy: Easy2::new(BodyCollector::default()),
            timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    fn prepare(&mut self, target: &Url) -> Result<(), CurlError> {
        self.easy.reset();
        self.easy.get_mut().reset(self.max_body_bytes);
        self.easy.follow_location(false)?;
        self.easy.accept_encoding("")?;
        self.easy.progress(true)?;
        self.easy.useragent(concat!("sitewatch/", env!("CARGO_PKG_VERSION")))?;
        self.easy.timeout(self.timeout)?;
        self.easy.url(target.as_str())?;
        Ok(())
    }
}

impl Probe for CurlProbe {
    fn probe(&mut self, target: &Url) -> Sample {
        if let Err(err) = self.prepare(target) {
            return Sample::failed(SystemTime::now(), map_curl_error(&err));
        }

        let result = self.easy.perform();
        let timestamp = SystemTime::now();
        let timings = read_timings(&mut self.easy);

        let error = match result {
            Ok(()) => None,
            Err(err)
                if self.easy.get_ref().limit_reached
                    && (err.is_write_error() || err.is_aborted_by_callback()) =>
            {
                None
            }
            Err(err) => {
                let mut error = map_curl_error(&err);
                // Timed out before the connection was up.
                if error.kind == ProbeErrorKind::Timeout
                    && timings.connect.is_zero()
                    && timings.ttfb.is_zero()
                {
                    error.kind = ProbeErrorKind::ConnectTimeout;
                }
                Some(error)
            }
        };
        let status_code = match error {
            Some(_) => None,
            None => self
                .easy
                .response_code()
                .ok()
                .and_then(|code| u16::try_from(code).ok())
                .filter(|code| *code != 0),
        };

        Sample {
            timestamp,
            dns: timings.dns,
            connect: timings.connect,
            tls: timings.tls,
            ttfb: timings.ttfb,
            total: timings.total,
            status_code,
            error,
        }
    }
}
