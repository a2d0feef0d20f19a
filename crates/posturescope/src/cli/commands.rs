//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::viz::TimeRange;

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Time range for statistics and charts
    #[arg(short, long, value_enum, default_value = "all")]
    pub range: TimeRangeArg,

    /// Print a full statistics block every N accepted samples
    #[arg(long, default_value = "30")]
    pub stats_every: u64,
}

/// Capture command arguments.
#[derive(Debug, Args)]
pub struct CaptureCommand {
    /// Override the configured countdown length in seconds
    #[arg(long)]
    pub countdown: Option<u32>,

    /// Display the snapshot without saving it
    #[arg(long)]
    pub no_save: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// How long to record the live stream, in seconds
    #[arg(short, long, default_value = "30")]
    pub duration: u64,

    /// Output file (defaults to a date-stamped name in the current dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Threshold management commands.
#[derive(Debug, Subcommand)]
pub enum ThresholdsCommand {
    /// Show the server's current thresholds
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Update the server's thresholds
    Set {
        /// Acceptable shoulder deviation in degrees
        #[arg(long)]
        shoulder: f64,

        /// Acceptable hip deviation in degrees
        #[arg(long)]
        hip: f64,

        /// Acceptable tilt deviation in degrees
        #[arg(long)]
        tilt: f64,
    },
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Output file (defaults to a timestamped name in the current dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Clear-history command arguments.
#[derive(Debug, Args)]
pub struct ClearHistoryCommand {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Time range argument for chart and statistics windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TimeRangeArg {
    /// Last hour
    #[value(name = "1h")]
    H1,
    /// Last six hours
    #[value(name = "6h")]
    H6,
    /// Last 24 hours
    #[value(name = "24h")]
    H24,
    /// Last seven days
    #[value(name = "7d")]
    D7,
    /// No filtering
    #[default]
    All,
}

impl From<TimeRangeArg> for TimeRange {
    fn from(arg: TimeRangeArg) -> Self {
        match arg {
            TimeRangeArg::H1 => Self::H1,
            TimeRangeArg::H6 => Self::H6,
            TimeRangeArg::H24 => Self::H24,
            TimeRangeArg::D7 => Self::D7,
            TimeRangeArg::All => Self::All,
        }
    }
}
