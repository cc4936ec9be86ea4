//! Logging setup: human-readable output on stderr plus an
//! append-only, timestamped file with one file per day.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::DeployResult;

/// Default directory for log files.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// `deploy_YYYYMMDD.log` for the given day.
#[must_use]
pub fn log_file_name(day: NaiveDate) -> String {
    format!("deploy_{}.log", day.format("%Y%m%d"))
}

/// Install the global subscriber and return the log file path.
///
/// `RUST_LOG` overrides the default `info` level.
pub fn init(log_dir: &Path) -> DeployResult<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file_name(Local::now().date_naive()));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(path)
}
