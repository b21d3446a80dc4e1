use crate::probe::{ProbeError, ProbeErrorKind};
use curl::Error as CurlError;
use curl::easy::{Easy2, Handler};
use std::time::Duration;

/// Per-phase timings of one transfer. `ttfb` and `total` are measured from the
/// start of the request; the others are the length of their own phase.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(super) struct Timings {
    pub dns: Duration,
    pub connect: Duration,
    pub tls: Duration,
    pub ttfb: Duration,
    pub total: Duration,
}

/// Splits curl's cumulative timestamps into phases. An `appconnect` of zero
/// means no TLS handshake took place.
pub(super) fn split_phases(
    namelookup: Duration,
    connect: Duration,
    appconnect: Duration,
    starttransfer: Duration,
    total: Duration,
) -> Timings {
    let tls = if appconnect.is_zero() {
        Duration::ZERO
    } else {
        appconnect.saturating_sub(connect)
    };
    Timings {
        dns: namelookup,
        connect: connect.saturating_sub(namelookup),
        tls,
        ttfb: starttransfer,
        total,
    }
}

pub(super) fn read_timings<H: Handler>(easy: &mut Easy2<H>) -> Timings {
    let namelookup = easy.namelookup_time().unwrap_or_default();
    let connect = easy.connect_time().unwrap_or(namelookup);
    let appconnect = easy.appconnect_time().unwrap_or_default();
    let starttransfer = easy.starttransfer_time().unwrap_or_default();
    let total = easy.total_time().unwrap_or_default();
    split_phases(namelookup, connect, appconnect, starttransfer, total)
}

/// Maps a curl failure to a probe error. The message is curl's generic
/// description of the code so that equal failures tally together.
pub(super) fn map_curl_error(err: &CurlError) -> ProbeError {
    let kind = if err.is_couldnt_resolve_host() || err.is_couldnt_resolve_proxy() {
        ProbeErrorKind::Dns
    } else if err.is_operation_timedout() {
        ProbeErrorKind::Timeout
    } else if err.is_couldnt_connect() {
        ProbeErrorKind::ConnectRefused
    } else if err.is_ssl_connect_error()
        || err.is_ssl_cacert()
        || err.is_ssl_certproblem()
        || err.is_ssl_cipher()
        || err.is_peer_failed_verification()
    {
        ProbeErrorKind::Tls
    } else if err.is_http_returned_error() || err.is_got_nothing() {
        ProbeErrorKind::Http
    } else if err.is_read_error() || err.is_recv_error() {
        ProbeErrorKind::Read
    } else {
        ProbeErrorKind::Io
    };

    ProbeError::new(kind, err.description())
}
