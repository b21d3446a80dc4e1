use crate::config::{AggregationRule, ConfigError, MonitorConfig};
use crate::probe::Probe;
use crate::store::{Store, StoreError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ControlMessage {
    Stop,
}

pub struct WorkerHandle {
    pub sender: Sender<ControlMessage>,
    pub join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn stop(&self) {
        let _ = self.sender.send(ControlMessage::Stop);
    }

    pub fn join(&mut self) {
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            tracing::error!("worker thread panicked");
        }
    }
}

/// Probes `url` immediately and then every `interval`, appending each sample to
/// `store`. Ticks missed while a probe was running are skipped.
pub fn spawn_poller(
    url: Url,
    interval: Duration,
    probe: Box<dyn Probe>,
    store: Arc<Store>,
) -> io::Result<WorkerHandle> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let join = thread::Builder::new()
        .name(format!("poll {}", url.host_str().unwrap_or("target")))
        .spawn(move || run_poller(url, interval, probe, store, rx))?;
    Ok(WorkerHandle {
        sender: tx,
        join: Some(join),
    })
}

fn run_poller(
    url: Url,
    interval: Duration,
    mut probe: Box<dyn Probe>,
    store: Arc<Store>,
    control_rx: Receiver<ControlMessage>,
) {
    tracing::debug!(target_url = %url, ?interval, "poller started");
    let mut next_tick = Instant::now();
    loop {
        match control_rx.recv_deadline(next_tick) {
            Ok(ControlMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                let sample = probe.probe(&url);
                if let Some(error) = &sample.error {
                    tracing::debug!(
                        target_url = %url,
                        kind = error.kind.label(),
                        timeout = error.kind.is_timeout(),
                        %error,
                        "probe failed"
                    );
                }
                if let Err(err) = store.append_sample(url.as_str(), sample) {
                    tracing::error!(target_url = %url, %err, "sample dropped");
                }
                next_tick = next_deadline(next_tick, interval, Instant::now());
            }
        }
    }
    tracing::debug!(target_url = %url, "poller stopped");
}

/// Recomputes `rule.timespan` for every target immediately and then every
/// `rule.frequency`.
pub fn spawn_aggregator(rule: AggregationRule, store: Arc<Store>) -> io::Result<WorkerHandle> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let join = thread::Builder::new()
        .name(format!("aggregate {}", rule.timespan))
        .spawn(move || run_aggregator(rule, store, rx))?;
    Ok(WorkerHandle {
        sender: tx,
        join: Some(join),
    })
}

fn run_aggregator(rule: AggregationRule, store: Arc<Store>, control_rx: Receiver<ControlMessage>) {
    tracing::debug!(timespan = %rule.timespan, frequency = ?rule.frequency, alerting = rule.alerting, "aggregator started");
    let mut next_tick = Instant::now();
    loop {
        match control_rx.recv_deadline(next_tick) {
            Ok(ControlMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                match store.refresh_all(rule.timespan) {
                    Ok(alerts) => {
                        tracing::trace!(timespan = %rule.timespan, alerts = alerts.len(), "metrics refreshed")
                    }
                    Err(err) => tracing::error!(timespan = %rule.timespan, %err, "refresh failed"),
                }
                next_tick = next_deadline(next_tick, rule.frequency, Instant::now());
            }
        }
    }
    tracing::debug!(timespan = %rule.timespan, "aggregator stopped");
}

/// Next tick on the fixed-rate schedule started at `previous`, skipping ticks
/// that already passed.
fn next_deadline(previous: Instant, interval: Duration, now: Instant) -> Instant {
    if interval.is_zero() {
        return now;
    }
    let mut next = previous + interval;
    while next <= now {
        next += interval;
    }
    next
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Pollers and aggregators running against one shared [`Store`].
pub struct Monitor {
    store: Arc<Store>,
    workers: Vec<WorkerHandle>,
}

impl Monitor {
    /// Validates `config`, builds the store and starts one poller per target plus
    /// one aggregator per aggregation rule. `probe_factory` is called once per target.
    pub fn start<F>(config: &MonitorConfig, probe_factory: F) -> Result<Self, MonitorError>
    where
        F: FnMut(&Url) -> Box<dyn Probe>,
    {
        config.validate()?;
        let store = Arc::new(Store::new(config)?);
        Self::start_with_store(config, store, probe_factory)
    }

    pub fn start_with_store<F>(
        config: &MonitorConfig,
        store: Arc<Store>,
        mut probe_factory: F,
    ) -> Result<Self, MonitorError>
    where
        F: FnMut(&Url) -> Box<dyn Probe>,
    {
        let mut monitor = Monitor {
            store,
            workers: Vec::new(),
        };

        for url in config.target_urls()? {
            let probe = probe_factory(&url);
            let worker = spawn_poller(
                url,
                config.poll_interval(),
                probe,
                Arc::clone(&monitor.store),
            )?;
            monitor.workers.push(worker);
        }
        for rule in config.aggregation_rules() {
            let worker = spawn_aggregator(rule, Arc::clone(&monitor.store))?;
            monitor.workers.push(worker);
        }

        tracing::info!(
            targets = monitor.store.target_urls().len(),
            workers = monitor.workers.len(),
            "monitor started"
        );
        Ok(monitor)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn shutdown(mut self) {
        self.stop_workers();
    }

    fn stop_workers(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        for worker in &self.workers {
            worker.stop();
        }
        for worker in &mut self.workers {
            worker.join();
        }
        self.workers.clear();
        tracing::info!("monitor stopped");
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop_workers();
    }
}
