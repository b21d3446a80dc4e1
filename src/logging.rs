use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "sitewatch=info";

/// Where log events go. The dashboard owns the terminal, so its modes log to a
/// file instead of stderr.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
    Discard,
}

impl LogTarget {
    pub fn for_terminal_ui() -> Self {
        match default_log_file() {
            Some(path) => LogTarget::File(path),
            None => LogTarget::Discard,
        }
    }
}

pub fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("sitewatch").join("sitewatch.log"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(target: &LogTarget) -> io::Result<()> {
    match target {
        LogTarget::Stderr => tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .try_init()
            .map_err(io::Error::other),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(env_filter())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
                .map_err(io::Error::other)
        }
        LogTarget::Discard => Ok(()),
    }
}
