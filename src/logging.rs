//! Tracing setup for the binary.
//!
//! The terminal belongs to the TUI, so log records go to a file only, through a
//! non-blocking writer. Keep the returned guard alive until shutdown or buffered
//! records are lost.

use std::fs;

use color_eyre::eyre::{Result, WrapErr};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::config::ConsoleConfig;

pub const LOG_FILE: &str = "warden.log";

/// Installs the global subscriber writing to `<log_dir>/warden.log`.
pub fn init(config: &ConsoleConfig) -> Result<WorkerGuard> {
    fs::create_dir_all(&config.log_dir)
        .wrap_err_with(|| format!("creating log directory {}", config.log_dir.display()))?;
    let level = config.level_filter()?;

    let file_appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::Layer::default()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .wrap_err("installing tracing subscriber")?;

    Ok(guard)
}
