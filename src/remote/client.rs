use super::RemoteError;
use super::protocol::{Request, Response, read_message, write_message};
use crate::config::Timespan;
use crate::store::{StatusSource, TargetInfo, TargetSnapshot};
use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const READ_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    line: String,
}

/// Blocking client for a daemon's remote channel.
pub struct RemoteClient {
    addr: SocketAddr,
    connection: Mutex<Connection>,
}

impl RemoteClient {
    pub fn connect(addr: SocketAddr) -> Result<Self, RemoteError> {
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            addr,
            connection: Mutex::new(Connection {
                reader,
                writer: BufWriter::new(stream),
                line: String::new(),
            }),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn request(&self, request: &Request) -> Result<Response, RemoteError> {
        let mut guard = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let conn = &mut *guard;
        write_message(&mut conn.writer, request)?;
        match read_message(&mut conn.reader, &mut conn.line, MAX_RESPONSE_BYTES)? {
            Some(Response::Error { message }) => Err(RemoteError::Server { message }),
            Some(response) => Ok(response),
            None => Err(RemoteError::Disconnected),
        }
    }

    /// Asks the daemon to shut down.
    pub fn stop(&self) -> Result<(), RemoteError> {
        match self.request(&Request::Stop)? {
            Response::Stopping => Ok(()),
            _ => Err(RemoteError::UnexpectedResponse {
                expected: "stopping",
            }),
        }
    }
}

impl StatusSource for RemoteClient {
    type Error = RemoteError;

    fn targets(&self) -> Result<Vec<TargetInfo>, RemoteError> {
        match self.request(&Request::Targets)? {
            Response::Targets { targets } => Ok(targets),
            _ => Err(RemoteError::UnexpectedResponse {
                expected: "targets",
            }),
        }
    }

    fn query(&self, url: &str, timespan: Timespan) -> Result<TargetSnapshot, RemoteError> {
        let request = Request::Query {
            url: url.to_string(),
            timespan,
        };
        match self.request(&request)? {
            Response::Snapshot { snapshot } => Ok(snapshot),
            _ => Err(RemoteError::UnexpectedResponse {
                expected: "snapshot",
            }),
        }
    }
}
