//! CLI argument definitions using clap.

use clap::{Parser, ValueEnum};
use pymaceuticals::config::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;

/// Pymaceuticals - tumor, metastasis and survival charts for a preclinical drug trial
#[derive(Parser, Debug)]
#[command(name = "pymaceuticals", author, version, about)]
pub struct Cli {
    /// Path to the TOML configuration file (built-in defaults when it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "PYMACEUTICALS_CONFIG")]
    pub config: PathBuf,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Write the charts without opening them
    #[arg(long)]
    pub no_show: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON structured logging
    Json,
}
