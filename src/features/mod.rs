pub mod alerts;
pub mod metrics;
pub mod probe;
pub mod ui;
