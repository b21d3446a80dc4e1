use super::RemoteError;
use crate::config::Timespan;
use crate::store::{TargetInfo, TargetSnapshot};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Read, Write};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Targets,
    Query { url: String, timespan: Timespan },
    Stop,
}

/// Adjacently tagged: payloads with integer map keys do not survive the
/// buffering that internal tagging needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum Response {
    Targets { targets: Vec<TargetInfo> },
    Snapshot { snapshot: TargetSnapshot },
    Stopping,
    Error { message: String },
}

impl Response {
    pub fn error(err: impl std::fmt::Display) -> Self {
        Response::Error {
            message: err.to_string(),
        }
    }
}

pub(super) fn write_message<W: Write, T: Serialize>(
    writer: &mut W,
    message: &T,
) -> Result<(), RemoteError> {
    serde_json::to_writer(&mut *writer, message)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads the next non-blank line of at most `limit` bytes, newline excluded.
/// `Ok(None)` means the peer closed the stream. A longer line is discarded
/// without being buffered past `limit + 1` bytes and fails with
/// [`RemoteError::LineTooLong`]; the next call starts on the following line.
pub(super) fn read_message<R: BufRead, T: DeserializeOwned>(
    reader: &mut R,
    line: &mut String,
    limit: usize,
) -> Result<Option<T>, RemoteError> {
    loop {
        line.clear();
        let read = reader.by_ref().take(limit as u64 + 1).read_line(line)?;
        if read == 0 {
            return Ok(None);
        }
        if read > limit && !line.ends_with('\n') {
            skip_line(reader)?;
            return Err(RemoteError::LineTooLong { limit });
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return Ok(Some(serde_json::from_str(trimmed)?));
        }
    }
}

fn skip_line<R: BufRead>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(());
        }
        match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}
