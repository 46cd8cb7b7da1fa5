//! CLI definition using clap

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// modkeeper - keep a host's extension modules staged, loaded and reported
#[derive(Parser)]
#[command(name = "modkeeper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding `config.toml` and the managed `modules/` directory
    #[arg(long, global = true, env = "MODKEEPER_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Directory scanned for inbound packages (defaults to `<data-dir>/plugins`)
    #[arg(long, global = true)]
    pub inbound_dir: Option<PathBuf>,

    /// Configuration file (defaults to `<data-dir>/config.toml`)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// File name of the host's own package, never staged as a module
    #[arg(long, global = true)]
    pub host_package: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the default configuration file if none exists
    Init,

    /// Start the host and accept console commands until stopped
    Run,

    /// Start once, print the status report and shut down
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
}
