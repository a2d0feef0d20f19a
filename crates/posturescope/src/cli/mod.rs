//! Command-line interface for posturescope.
//!
//! This module provides the CLI structure and command definitions for the
//! `pscope` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CaptureCommand, ClearHistoryCommand, ConfigCommand, ExportCommand, ReportCommand,
    ThresholdsCommand, TimeRangeArg, WatchCommand,
};

/// pscope - Live posture telemetry in your terminal
///
/// A client for the posture measurement server: watches the realtime
/// measurement stream, derives statistics and trends, captures snapshots,
/// and exports history.
#[derive(Debug, Parser)]
#[command(name = "pscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch the live measurement stream with gauges and statistics
    Watch(WatchCommand),

    /// Run a countdown, snapshot the latest measurement, and save it
    Capture(CaptureCommand),

    /// Record the live stream for a while and export it as CSV
    Export(ExportCommand),

    /// View or update the server's threshold settings
    #[command(subcommand)]
    Thresholds(ThresholdsCommand),

    /// Download a server-generated report
    Report(ReportCommand),

    /// Clear the server's stored measurement history
    ClearHistory(ClearHistoryCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
