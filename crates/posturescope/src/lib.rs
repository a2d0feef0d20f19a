//! `posturescope` - A terminal client for a posture measurement server
//!
//! This library provides the client-side state machinery for consuming a
//! realtime posture measurement stream: connection management, stream
//! reduction into a bounded history, derived statistics, chart state, and
//! the countdown/capture/save workflow.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod capture;
pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod measurement;
pub mod reducer;
pub mod stats;
pub mod viz;

pub use api::ApiClient;
pub use capture::{CaptureState, CaptureWorkflow, MeasurementSink};
pub use config::Config;
pub use connection::{ClientEvent, ConnectionState, ConnectionTracker, ReconnectPolicy};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use measurement::{Measurement, RawSample, Thresholds};
pub use reducer::{DashboardState, HistoryBuffer, StreamReducer};
pub use stats::{StatsSummary, Trend};
pub use viz::{ChartState, TimeRange};
