mod common;
mod features;

pub mod config;
pub mod logging;
pub mod metrics;
pub mod probe;
pub mod remote;
pub mod runtime;
pub mod settings;
pub mod store;

pub use common::net::parse_target_url;
pub use common::time::{Clock, SystemClock};
pub use features::alerts;
pub use features::metrics::{aggregate, window};
pub use features::probe::engine as probe_engine;
pub use features::ui;
