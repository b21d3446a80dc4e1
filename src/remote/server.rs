use super::RemoteError;
use super::protocol::{Request, Response, read_message, write_message};
use crate::runtime::{ControlMessage, WorkerHandle};
use crate::store::StatusSource;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::io::{self, BufReader, BufWriter, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Bounds on what one client connection may cost the daemon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerLimits {
    /// Longest request line accepted, newline excluded.
    pub max_request_bytes: usize,
    /// A connection with no complete request for this long is closed.
    pub idle_timeout: Duration,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_request_bytes: 64 * 1024,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// A running accept loop. Dropping the handle does not stop the server; call
/// [`ServerHandle::shutdown`].
pub struct ServerHandle {
    local_addr: SocketAddr,
    worker: WorkerHandle,
    stop_requests: Receiver<SocketAddr>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Receives the peer address of every client that sent a `stop` request.
    pub fn stop_requests(&self) -> &Receiver<SocketAddr> {
        &self.stop_requests
    }

    /// Stops accepting connections. Connections already open are served until
    /// their client hangs up.
    pub fn shutdown(mut self) {
        self.worker.stop();
        self.worker.join();
    }
}

/// Serves `source` on `listener` from a background thread, one thread per
/// connection.
pub fn serve<S>(listener: TcpListener, source: Arc<S>) -> io::Result<ServerHandle>
where
    S: StatusSource + Send + Sync + 'static,
{
    serve_with_limits(listener, source, ServerLimits::default())
}

pub fn serve_with_limits<S>(
    listener: TcpListener,
    source: Arc<S>,
    limits: ServerLimits,
) -> io::Result<ServerHandle>
where
    S: StatusSource + Send + Sync + 'static,
{
    let local_addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    let (control_tx, control_rx) = crossbeam_channel::unbounded();
    let (stop_tx, stop_rx) = crossbeam_channel::unbounded();
    let join = thread::Builder::new()
        .name("remote accept".to_string())
        .spawn(move || accept_loop(listener, source, limits, control_rx, stop_tx))?;

    tracing::info!(%local_addr, "remote channel listening");
    Ok(ServerHandle {
        local_addr,
        worker: WorkerHandle {
            sender: control_tx,
            join: Some(join),
        },
        stop_requests: stop_rx,
    })
}

fn accept_loop<S>(
    listener: TcpListener,
    source: Arc<S>,
    limits: ServerLimits,
    control_rx: Receiver<ControlMessage>,
    stop_tx: Sender<SocketAddr>,
) where
    S: StatusSource + Send + Sync + 'static,
{
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                tracing::debug!(%peer, "remote client connected");
                let source = Arc::clone(&source);
                let stop_tx = stop_tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("remote {peer}"))
                    .spawn(move || {
                        if let Err(err) = handle_connection(stream, peer, &*source, limits, &stop_tx) {
                            tracing::debug!(%peer, %err, "remote connection ended with error");
                        }
                    });
                if let Err(err) = spawned {
                    tracing::warn!(%peer, %err, "could not spawn connection thread");
                }
                continue;
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {}
            Err(err) => tracing::warn!(%err, "accept failed"),
        }

        match control_rx.recv_timeout(ACCEPT_POLL) {
            Ok(ControlMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    tracing::debug!("remote accept loop stopped");
}

fn handle_connection<S: StatusSource>(
    stream: TcpStream,
    peer: SocketAddr,
    source: &S,
    limits: ServerLimits,
    stop_tx: &Sender<SocketAddr>,
) -> Result<(), RemoteError> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(limits.idle_timeout))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);
    let mut line = String::new();

    loop {
        let request = read_message::<_, Request>(&mut reader, &mut line, limits.max_request_bytes);
        let response = match request {
            Ok(Some(request)) => dispatch(source, request, peer, stop_tx),
            Ok(None) => break,
            Err(RemoteError::Json(err)) => {
                tracing::warn!(%peer, %err, "malformed remote request");
                Response::error(format!("malformed request: {err}"))
            }
            Err(err @ RemoteError::LineTooLong { .. }) => {
                tracing::warn!(%peer, %err, "oversized remote request");
                Response::error(err)
            }
            Err(RemoteError::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                tracing::debug!(%peer, "idle remote client dropped");
                break;
            }
            Err(err) => return Err(err),
        };
        let stopping = matches!(response, Response::Stopping);
        write_message(&mut writer, &response)?;
        if stopping {
            break;
        }
    }
    tracing::debug!(%peer, "remote client disconnected");
    Ok(())
}

fn dispatch<S: StatusSource>(
    source: &S,
    request: Request,
    peer: SocketAddr,
    stop_tx: &Sender<SocketAddr>,
) -> Response {
    match request {
        Request::Targets => match source.targets() {
            Ok(targets) => Response::Targets { targets },
            Err(err) => Response::error(err),
        },
        Request::Query { url, timespan } => match source.query(&url, timespan) {
            Ok(snapshot) => Response::Snapshot { snapshot },
            Err(err) => Response::error(err),
        },
        Request::Stop => {
            tracing::info!(%peer, "stop requested over the remote channel");
            let _ = stop_tx.send(peer);
            Response::Stopping
        }
    }
}
