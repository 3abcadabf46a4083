use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use solmon_service::config::Config;
use solmon_service::dashboard::Dashboard;
use solmon_service::ingest::fronius::FroniusClient;
use solmon_service::logging::{LogLevel, init_logger};
use solmon_service::monitor::{Monitor, TickReport};
use solmon_service::series::SeriesStore;
use solmon_service::sites::find_site;
use solmon_service::verify::{self, DEFAULT_PROBE_TIMEOUT};

#[derive(Parser)]
#[command(author, version, about = "Realtime power monitoring for Fronius inverters")]
struct Args {
    /// TOML configuration; defaults to ./solmon.toml or the built-in registry.
    #[arg(long, env = "SOLMON_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "SOLMON_LOG_LEVEL", value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Also append log lines to this file.
    #[arg(long, env = "SOLMON_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll all sites periodically and redraw the dashboard.
    Watch {
        /// Seconds between ticks; overrides `refresh_interval_secs`.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,

        /// Stop after this many ticks.
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Poll all sites once.
    Once {
        /// Print the readings as JSON instead of the dashboard.
        #[arg(long)]
        json: bool,
    },

    /// Check which Solar API endpoints an inverter exposes.
    Probe {
        /// Inverter address, e.g. 192.168.1.181.
        host: String,

        #[arg(long, default_value_t = DEFAULT_PROBE_TIMEOUT.as_secs())]
        timeout: u64,

        #[arg(long)]
        json: bool,
    },

    /// List the configured sites, or show one of them.
    Sites {
        id: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let console_timestamps = matches!(args.command, Command::Watch { .. });
    init_logger(args.log_level, args.log_file.as_deref(), console_timestamps)?;

    match args.command {
        Command::Probe { host, timeout, json } => {
            let report = verify::run_probe(&host, Duration::from_secs(timeout))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                verify::print_summary(&report);
            }
        }
        Command::Watch { interval, ticks } => watch(&load_config(args.config.as_deref())?, interval, ticks)?,
        Command::Once { json } => once(&load_config(args.config.as_deref())?, json)?,
        Command::Sites { id } => list_sites(&load_config(args.config.as_deref())?, id.as_deref())?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::resolve(path).context("failed to load configuration")?;
    info!(sites = config.sites.len(), "configuration loaded");
    Ok(config)
}

fn new_monitor(config: &Config) -> anyhow::Result<Monitor<FroniusClient>> {
    let client = FroniusClient::new(config.request_timeout()).context("failed to build HTTP client")?;
    Ok(Monitor::new(
        client,
        config.sites.clone(),
        SeriesStore::with_capacity(config.history_capacity),
    ))
}

fn render(config: &Config, monitor: &Monitor<FroniusClient>, report: &TickReport) -> String {
    Dashboard {
        sites: monitor.sites(),
        store: monitor.store(),
        last_tick: Some(report),
        stale_after: config.stale_after(),
        now: Utc::now(),
    }
    .render()
}

fn watch(config: &Config, interval: Option<u64>, ticks: Option<u64>) -> anyhow::Result<()> {
    let interval = interval.map_or_else(|| config.refresh_interval(), Duration::from_secs);
    let mut monitor = new_monitor(config)?;
    info!(?interval, "watching {} site(s)", monitor.sites().len());

    let mut stdout = std::io::stdout();
    let mut write_error = None;
    monitor.run(interval, ticks, |monitor, report| {
        // Clear the screen and home the cursor before each redraw.
        let frame = render(config, monitor, report);
        match write!(stdout, "\x1b[2J\x1b[H{}", frame).and_then(|()| stdout.flush()) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                error!("cannot write to stdout, stopping: {}", err);
                write_error = Some(err);
                ControlFlow::Break(())
            }
        }
    });
    match write_error {
        Some(err) => Err(err).context("failed to draw the dashboard"),
        None => Ok(()),
    }
}

fn once(config: &Config, json: bool) -> anyhow::Result<()> {
    let mut monitor = new_monitor(config)?;
    let report = monitor.tick();
    if json {
        println!("{}", serde_json::to_string_pretty(&monitor.snapshot(&report))?);
    } else {
        print!("{}", render(config, &monitor, &report));
    }
    Ok(())
}

fn list_sites(config: &Config, id: Option<&str>) -> anyhow::Result<()> {
    match id {
        Some(id) => {
            let site = find_site(&config.sites, id)
                .with_context(|| format!("no site '{}' in the registry", id))?;
            println!("{}", site);
        }
        None => config.sites.iter().for_each(|site| println!("{}", site)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_watch_interval_is_rejected() {
        assert!(Args::try_parse_from(["solmon", "watch", "--interval", "0"]).is_err());
    }

    #[test]
    fn test_watch_accepts_interval_and_tick_limit() {
        let args = Args::try_parse_from(["solmon", "watch", "--interval", "2", "--ticks", "0"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Watch {
                interval: Some(2),
                ticks: Some(0)
            }
        ));
    }

    #[test]
    fn test_sites_takes_optional_id() {
        let args = Args::try_parse_from(["solmon", "sites", "ALTIERI"]).unwrap();
        assert!(matches!(args.command, Command::Sites { id: Some(ref id) } if id == "ALTIERI"));
    }
}
