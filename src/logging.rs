//! Tracing setup.
//!
//! The interactive UI owns the terminal, so it logs to a file; one-shot commands log to stderr.

use crate::cli::Cli;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_NAME: &str = "kinic-console.log";

/// Default location of the UI log file.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("kinic-console").join(LOG_FILE_NAME))
}

fn filter(verbose: bool, fallback: &str) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber. Returns the log file path when logging to a file.
pub fn init(args: &Cli, interactive: bool) -> Result<Option<PathBuf>> {
    if !interactive {
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .with(filter(args.verbose, "warn"))
            .try_init();
        return Ok(None);
    }

    let Some(path) = args.log_file.clone().or_else(default_log_path) else {
        // No writable data dir: stay silent rather than corrupt the UI.
        return Ok(None);
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(filter(args.verbose, "info"))
        .try_init();
    Ok(Some(path))
}
