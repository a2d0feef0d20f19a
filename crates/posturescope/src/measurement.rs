//! Core measurement types for posturescope.
//!
//! This module defines the fundamental data structures for representing
//! posture samples received from the measurement server, the threshold set
//! used for scoring and gauge coloring, and small display helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three posture angles reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleKind {
    /// Left/right shoulder line deviation from horizontal.
    Shoulder,
    /// Hip line deviation from horizontal.
    Hip,
    /// Head/frame tilt.
    Tilt,
}

impl AngleKind {
    /// All angle kinds in display order.
    pub const ALL: [Self; 3] = [Self::Shoulder, Self::Hip, Self::Tilt];
}

impl std::fmt::Display for AngleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shoulder => write!(f, "shoulder"),
            Self::Hip => write!(f, "hip"),
            Self::Tilt => write!(f, "tilt"),
        }
    }
}

/// A raw measurement frame as received off the wire.
///
/// All fields are optional; a frame missing any angle is malformed and is
/// dropped by the reducer rather than treated as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Shoulder angle in degrees, if present.
    pub shoulder_angle: Option<f64>,
    /// Hip angle in degrees, if present.
    pub hip_angle: Option<f64>,
    /// Tilt angle in degrees, if present.
    pub tilt_angle: Option<f64>,
}

impl RawSample {
    /// Create a raw sample with all three angles present.
    #[must_use]
    pub fn new(shoulder_angle: f64, hip_angle: f64, tilt_angle: f64) -> Self {
        Self {
            shoulder_angle: Some(shoulder_angle),
            hip_angle: Some(hip_angle),
            tilt_angle: Some(tilt_angle),
        }
    }

    /// Check that all three angle fields are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.shoulder_angle.is_some() && self.hip_angle.is_some() && self.tilt_angle.is_some()
    }

    /// Promote this sample to a timestamped [`Measurement`].
    ///
    /// Returns `None` if any angle field is missing.
    #[must_use]
    pub fn into_measurement(self, timestamp: DateTime<Utc>) -> Option<Measurement> {
        Some(Measurement {
            timestamp,
            shoulder_angle: self.shoulder_angle?,
            hip_angle: self.hip_angle?,
            tilt_angle: self.tilt_angle?,
        })
    }
}

/// A single timestamped posture sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// When this sample arrived at the client.
    pub timestamp: DateTime<Utc>,

    /// Shoulder angle in degrees.
    pub shoulder_angle: f64,

    /// Hip angle in degrees.
    pub hip_angle: f64,

    /// Tilt angle in degrees.
    pub tilt_angle: f64,
}

impl Measurement {
    /// Create a new measurement with the current time as its timestamp.
    #[must_use]
    pub fn now(shoulder_angle: f64, hip_angle: f64, tilt_angle: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            shoulder_angle,
            hip_angle,
            tilt_angle,
        }
    }

    /// Get the angle value for the given kind.
    #[must_use]
    pub fn angle(&self, kind: AngleKind) -> f64 {
        match kind {
            AngleKind::Shoulder => self.shoulder_angle,
            AngleKind::Hip => self.hip_angle,
            AngleKind::Tilt => self.tilt_angle,
        }
    }

    /// Check whether all three angles are within the given thresholds.
    #[must_use]
    pub fn is_within(&self, thresholds: &Thresholds) -> bool {
        self.shoulder_angle.abs() <= thresholds.shoulder_threshold
            && self.hip_angle.abs() <= thresholds.hip_threshold
            && self.tilt_angle.abs() <= thresholds.tilt_threshold
    }
}

/// Per-angle acceptable-deviation bounds in degrees.
///
/// Fetched from the server at startup and updated via an explicit
/// round-trip; the defaults match the server's out-of-the-box values and
/// are used until the first successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Acceptable shoulder deviation in degrees.
    pub shoulder_threshold: f64,
    /// Acceptable hip deviation in degrees.
    pub hip_threshold: f64,
    /// Acceptable tilt deviation in degrees.
    pub tilt_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            shoulder_threshold: 5.0,
            hip_threshold: 5.0,
            tilt_threshold: 2.0,
        }
    }
}

impl Thresholds {
    /// Get the threshold for the given angle kind.
    #[must_use]
    pub fn for_angle(&self, kind: AngleKind) -> f64 {
        match kind {
            AngleKind::Shoulder => self.shoulder_threshold,
            AngleKind::Hip => self.hip_threshold,
            AngleKind::Tilt => self.tilt_threshold,
        }
    }
}

/// Color zone for a gauge reading relative to its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeZone {
    /// Within the threshold.
    Ok,
    /// Within twice the threshold.
    Warn,
    /// Beyond twice the threshold.
    Alert,
}

impl GaugeZone {
    /// Classify an angle value against a threshold.
    #[must_use]
    pub fn classify(value: f64, threshold: f64) -> Self {
        let magnitude = value.abs();
        if magnitude <= threshold {
            Self::Ok
        } else if magnitude <= threshold * 2.0 {
            Self::Warn
        } else {
            Self::Alert
        }
    }
}

/// Gauge fill percentage for an angle value, capped at 100.
///
/// Gauges are scaled so that 90 degrees of deviation fills the bar.
#[must_use]
pub fn gauge_percent(value: f64) -> f64 {
    (value.abs() / 90.0 * 100.0).min(100.0)
}
