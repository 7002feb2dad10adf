use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod config;
pub mod delays;
pub mod demo;
pub mod monitor;

use self::config::ConfigCommands;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the retry delay schedule for a strategy
    #[command(visible_alias = "d")]
    Delays {
        /// Named preset; the settings document's retry section when omitted
        #[arg(short, long, value_enum)]
        preset: Option<RetryPreset>,

        /// Number of attempts to show (defaults to the configured max retries)
        #[arg(short, long)]
        attempts: Option<usize>,

        /// Show delays without jitter
        #[arg(long)]
        no_jitter: bool,
    },

    /// Sample this process's memory and report pressure, trend and statistics
    #[command(visible_alias = "m")]
    Monitor {
        /// How long to sample for, in seconds
        #[arg(long, default_value = "30")]
        duration: u64,

        /// Sampling interval in milliseconds (overrides settings)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Workbook size in bytes to run an overflow prediction for
        #[arg(long)]
        predict: Option<u64>,
    },

    /// Drive a simulated workload through the controller and print what happens
    Demo {
        #[arg(value_enum, default_value = "memory")]
        scenario: Scenario,
    },

    /// Inspect and validate settings documents
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RetryPreset {
    Exponential,
    Linear,
    Fixed,
    Fast,
    Slow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Memory climbs into the critical band, then recovers
    Memory,
    /// The AI API fails until the breaker opens, then fallbacks take over
    Api,
    /// A large workbook is loaded
    File,
}

/// Resolve a path argument against the current directory
pub(crate) fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::env::current_dir()
        .map(|dir| dir.join(&path))
        .unwrap_or(path)
}
