//! Line-delimited JSON channel between a monitoring daemon and its dashboards.
//!
//! A client writes one [`Request`] per line and reads exactly one [`Response`]
//! line back. Connections stay open across requests.

mod client;
mod protocol;
mod server;

pub use client::RemoteClient;
pub use protocol::{Request, Response};
pub use server::{ServerHandle, ServerLimits, serve, serve_with_limits};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote channel io: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote message is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("remote message exceeds {limit} bytes")]
    LineTooLong { limit: usize },
    #[error("daemon closed the connection")]
    Disconnected,
    #[error("daemon error: {message}")]
    Server { message: String },
    #[error("unexpected response, wanted {expected}")]
    UnexpectedResponse { expected: &'static str },
}
