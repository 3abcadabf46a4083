/// Structured logging for the solar monitoring service
///
/// Sets up `tracing` with a console layer on stderr (stdout belongs to the
/// dashboard) and an optional append-only log file for unattended runs.
/// Also provides the helpers that decide how loudly a per-site fetch failure
/// or a tick summary is reported.

use clap::ValueEnum;
use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::prelude::*;

use crate::model::{FetchError, Severity};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `min_level` when set. File output is
/// never colored and always timestamped.
pub fn init_logger(
    min_level: LogLevel,
    log_file: Option<&Path>,
    console_timestamps: bool,
) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(min_level).into())
        .from_env_lossy();

    let timed_console = console_timestamps.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S UTC".to_string()))
            .with_writer(std::io::stderr)
    });
    let plain_console = (!console_timestamps).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .without_time()
            .compact()
            .with_writer(std::io::stderr)
    });

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S UTC".to_string()))
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(timed_console)
        .with(plain_console)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a per-site fetch failure at the level its severity calls for.
///
/// Transport failures (site unreachable) are errors; schema failures
/// (unexpected payload shape) are warnings.
pub fn log_fetch_failure(site_id: &str, err: &FetchError) {
    match err.severity() {
        Severity::Error => error!(site = site_id, endpoint = %err.endpoint(), "fetch failed: {}", err),
        Severity::Warning => {
            warn!(site = site_id, endpoint = %err.endpoint(), "payload rejected: {}", err)
        }
    }
}

// ---------------------------------------------------------------------------
// Tick Summary Logging
// ---------------------------------------------------------------------------

/// Level at which a tick summary is reported.
pub fn summary_level(successful: usize, failed: usize) -> LogLevel {
    if failed == 0 {
        LogLevel::Info
    } else if successful == 0 {
        LogLevel::Error
    } else {
        LogLevel::Warning
    }
}

pub fn log_tick_summary(total: usize, successful: usize, failed: usize) {
    let message = format!("tick complete: {}/{} sites updated, {} failed", successful, total, failed);
    match summary_level(successful, failed) {
        LogLevel::Error => error!("{}", message),
        LogLevel::Warning => warn!("{}", message),
        LogLevel::Info | LogLevel::Debug => info!("{}", message),
    }
}
