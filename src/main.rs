use sitewatch::logging::{self, LogTarget};
use sitewatch::probe::Probe;
use sitewatch::probe_engine::CurlProbe;
use sitewatch::remote::{self, RemoteClient};
use sitewatch::runtime::Monitor;
use sitewatch::settings::{AppSettings, Mode, load_from_cli};
use sitewatch::store::Store;
use sitewatch::ui::run_dashboard;
use std::error::Error;
use std::net::TcpListener;
use std::sync::Arc;

fn main() {
    if let Err(err) = run() {
        eprintln!("sitewatch: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let settings = load_from_cli()?;
    let log_target = if settings.mode.uses_terminal() {
        LogTarget::for_terminal_ui()
    } else {
        LogTarget::Stderr
    };
    logging::init(&log_target)?;

    match settings.mode {
        Mode::Run => run_local(&settings),
        Mode::Daemon => run_daemon(&settings),
        Mode::Show { addr } => {
            let client = RemoteClient::connect(addr)?;
            tracing::info!(addr = %client.addr(), "connected to daemon");
            run_dashboard(&client, settings.config.ui_refresh_hz)?;
            Ok(())
        }
        Mode::Stop { addr } => {
            let client = RemoteClient::connect(addr)?;
            client.stop()?;
            tracing::info!(addr = %client.addr(), "daemon asked to stop");
            Ok(())
        }
    }
}

fn start_monitor(settings: &AppSettings) -> Result<Monitor, Box<dyn Error>> {
    let timeout = settings.config.probe_timeout();
    let monitor = Monitor::start(&settings.config, |_| {
        Box::new(CurlProbe::new(timeout)) as Box<dyn Probe>
    })?;
    Ok(monitor)
}

fn run_local(settings: &AppSettings) -> Result<(), Box<dyn Error>> {
    let monitor = start_monitor(settings)?;
    let store: &Store = monitor.store();
    let result = run_dashboard(store, settings.config.ui_refresh_hz);
    monitor.shutdown();
    result?;
    Ok(())
}

fn run_daemon(settings: &AppSettings) -> Result<(), Box<dyn Error>> {
    let listener = TcpListener::bind(settings.config.listen)?;
    let monitor = start_monitor(settings)?;
    let server = remote::serve(listener, Arc::clone(monitor.store()))?;

    // Blocks until a client sends `stop`.
    if let Ok(peer) = server.stop_requests().recv() {
        tracing::info!(%peer, "shutting down");
    }
    server.shutdown();
    monitor.shutdown();
    Ok(())
}
