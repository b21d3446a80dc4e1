use crate::config::{ConfigError, MonitorConfig};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "sitewatch")]
#[command(about = "HTTP availability monitor with windowed statistics and alerts", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor targets and show the dashboard (default)
    Run(MonitorArgs),
    /// Monitor targets headless and serve the remote channel
    Daemon {
        #[command(flatten)]
        monitor: MonitorArgs,

        /// Address for the remote channel
        #[arg(long, value_name = "ADDR")]
        listen: Option<SocketAddr>,
    },
    /// Show the dashboard of a running daemon
    Show {
        #[command(flatten)]
        config: ConfigArg,

        /// Daemon address (defaults to the configured listen address)
        #[arg(long, value_name = "ADDR")]
        addr: Option<SocketAddr>,

        /// UI refresh rate (Hz)
        #[arg(long)]
        refresh_hz: Option<u16>,
    },
    /// Ask a running daemon to shut down
    Stop {
        #[command(flatten)]
        config: ConfigArg,

        /// Daemon address (defaults to the configured listen address)
        #[arg(long, value_name = "ADDR")]
        addr: Option<SocketAddr>,
    },
}

#[derive(Args, Debug, Default)]
struct ConfigArg {
    /// Configuration file (JSON)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
struct MonitorArgs {
    #[command(flatten)]
    config: ConfigArg,

    /// Target URL to monitor (repeatable, replaces configured targets)
    #[arg(short, long = "target", value_name = "URL")]
    targets: Vec<String>,

    /// UI refresh rate (Hz)
    #[arg(long)]
    refresh_hz: Option<u16>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Local monitor with the dashboard on top.
    Run,
    /// Headless monitor serving the remote channel.
    Daemon,
    Show { addr: SocketAddr },
    Stop { addr: SocketAddr },
}

impl Mode {
    pub fn uses_terminal(self) -> bool {
        matches!(self, Mode::Run | Mode::Show { .. })
    }
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub mode: Mode,
    pub config: MonitorConfig,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("ui refresh rate must be greater than zero (got {value})")]
    InvalidRefreshHz { value: u16 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub fn load_from_cli() -> Result<AppSettings, SettingsError> {
    let args = CliArgs::parse();
    from_args(args)
}

/// Resolves the command line against the configuration file. Monitoring modes
/// get a validated configuration.
pub fn from_args(args: CliArgs) -> Result<AppSettings, SettingsError> {
    let command = args
        .command
        .unwrap_or_else(|| Command::Run(MonitorArgs::default()));

    match command {
        Command::Run(monitor) => {
            let config = monitor_config(monitor)?;
            Ok(AppSettings {
                mode: Mode::Run,
                config,
            })
        }
        Command::Daemon { monitor, listen } => {
            let mut config = monitor_config(monitor)?;
            if let Some(listen) = listen {
                config.listen = listen;
            }
            Ok(AppSettings {
                mode: Mode::Daemon,
                config,
            })
        }
        Command::Show {
            config,
            addr,
            refresh_hz,
        } => {
            let mut config = MonitorConfig::discover(config.config.as_deref())?;
            apply_refresh_hz(&mut config, refresh_hz)?;
            Ok(AppSettings {
                mode: Mode::Show {
                    addr: addr.unwrap_or(config.listen),
                },
                config,
            })
        }
        Command::Stop { config, addr } => {
            let config = MonitorConfig::discover(config.config.as_deref())?;
            Ok(AppSettings {
                mode: Mode::Stop {
                    addr: addr.unwrap_or(config.listen),
                },
                config,
            })
        }
    }
}

fn monitor_config(args: MonitorArgs) -> Result<MonitorConfig, SettingsError> {
    let mut config = MonitorConfig::discover(args.config.config.as_deref())?;
    if !args.targets.is_empty() {
        config.targets = args.targets;
    }
    apply_refresh_hz(&mut config, args.refresh_hz)?;
    config.validate()?;
    Ok(config)
}

fn apply_refresh_hz(config: &mut MonitorConfig, refresh_hz: Option<u16>) -> Result<(), SettingsError> {
    match refresh_hz {
        Some(0) => Err(SettingsError::InvalidRefreshHz { value: 0 }),
        Some(value) => {
            config.ui_refresh_hz = value;
            Ok(())
        }
        None => Ok(()),
    }
}
