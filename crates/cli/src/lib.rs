pub mod commands;
pub mod execute;
pub mod logging;

use clap::Parser;
use std::path::PathBuf;

pub use commands::Commands;

#[derive(Parser, Debug)]
#[command(name = "excelmind")]
#[command(about = "Inspect ExcelMind's retry, fallback and degradation behavior", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings document (JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
