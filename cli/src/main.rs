//! Nine Lives CLI - binary entry point.
//!
//! ```text
//! main() -> init_tracing() -> Cli::parse() -> commands::run()
//!                                                 |
//!                                                 v
//!                         Outcome::Done | Outcome::Rejected | Err(infrastructure)
//! ```
//!
//! Stdout carries command output only. Logs go to `~/.ninelives/logs/ninelives.log`.

mod cli;
mod commands;
mod render;

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    process::ExitCode,
    sync::Mutex,
};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::Cli;
use crate::commands::Outcome;

const LOG_FILE: &str = "ninelives.log";

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::debug!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than mixing logs into command output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    // Primary: ~/.ninelives/logs/ninelives.log
    let mut candidates = vec![ninelives_config::data_dir().join("logs").join(LOG_FILE)];

    // Fallback: ./.ninelives/logs/ninelives.log
    let local = PathBuf::from(".ninelives").join("logs").join(LOG_FILE);
    if !candidates.contains(&local) {
        candidates.push(local);
    }

    candidates
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match commands::run(&cli) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Rejected(message)) => {
            eprintln!("rejected: {message}");
            ExitCode::from(1)
        }
        Err(err) => {
            tracing::warn!("Command failed: {err:#}");
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
