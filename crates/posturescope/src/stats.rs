//! Statistics derived from the measurement history.
//!
//! All derivations here are pure functions of a measurement slice and are
//! recomputed from scratch on every change to the filtered window. The
//! buffer is bounded, so a full recomputation stays well within one event
//! turn.

use serde::{Deserialize, Serialize};

use crate::measurement::{AngleKind, Measurement, Thresholds};

/// Coarse direction of change across a numeric sequence.
///
/// Computed by splitting the sequence into two contiguous halves by index
/// and comparing the mean magnitude of each half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Second-half average is strictly greater than the first.
    Up,
    /// Second-half average is strictly less than the first.
    Down,
    /// Equal halves, or fewer than two samples.
    #[default]
    Neutral,
}

impl Trend {
    /// Human-readable label for the trend.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Up => "Increasing",
            Self::Down => "Decreasing",
            Self::Neutral => "Stable",
        }
    }

    /// Arrow glyph for the trend.
    #[must_use]
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Up => "↑",
            Self::Down => "↓",
            Self::Neutral => "→",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Mean of absolute values; 0 when the slice is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64
}

/// Two-half trend over a numeric sequence.
///
/// The first half is the `floor(n/2)` earliest values, the second half the
/// remainder. Sequences shorter than two values are always neutral.
#[must_use]
pub fn trend(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend::Neutral;
    }
    let half = values.len() / 2;
    let first = average(&values[..half]);
    let second = average(&values[half..]);
    if second < first {
        Trend::Down
    } else if second > first {
        Trend::Up
    } else {
        Trend::Neutral
    }
}

/// Percentage of samples where all three angles are within thresholds,
/// rounded to the nearest integer. 0 when the slice is empty.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn posture_score(measurements: &[Measurement], thresholds: &Thresholds) -> u32 {
    if measurements.is_empty() {
        return 0;
    }
    let good = measurements
        .iter()
        .filter(|m| m.is_within(thresholds))
        .count();
    (good as f64 / measurements.len() as f64 * 100.0).round() as u32
}

/// Per-angle average and trend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleStats {
    /// Mean absolute deviation in degrees.
    pub average: f64,
    /// Coarse direction of change.
    pub trend: Trend,
}

/// Aggregate statistics over a measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Shoulder angle statistics.
    pub shoulder: AngleStats,
    /// Hip angle statistics.
    pub hip: AngleStats,
    /// Tilt angle statistics.
    pub tilt: AngleStats,
    /// Percentage of samples within all three thresholds.
    pub posture_score: u32,
    /// Number of samples the summary was computed over.
    pub sample_count: usize,
}

impl StatsSummary {
    /// Compute all statistics for the given window.
    #[must_use]
    pub fn compute(measurements: &[Measurement], thresholds: &Thresholds) -> Self {
        let angle_stats = |kind: AngleKind| {
            let values: Vec<f64> = measurements.iter().map(|m| m.angle(kind)).collect();
            AngleStats {
                average: average(&values),
                trend: trend(&values),
            }
        };

        Self {
            shoulder: angle_stats(AngleKind::Shoulder),
            hip: angle_stats(AngleKind::Hip),
            tilt: angle_stats(AngleKind::Tilt),
            posture_score: posture_score(measurements, thresholds),
            sample_count: measurements.len(),
        }
    }

    /// An empty summary (zero averages, neutral trends, zero score).
    #[must_use]
    pub fn empty() -> Self {
        Self::compute(&[], &Thresholds::default())
    }

    /// Statistics for the given angle kind.
    #[must_use]
    pub fn for_angle(&self, kind: AngleKind) -> AngleStats {
        match kind {
            AngleKind::Shoulder => self.shoulder,
            AngleKind::Hip => self.hip,
            AngleKind::Tilt => self.tilt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Measurement;

    #[test]
    fn test_average_empty_is_zero() {
        assert_eq!(average(&[]), 0.0);
    }

    #[test]
    fn test_average_uses_absolute_values() {
        assert_eq!(average(&[-3.0, 4.0]), 3.5);
    }

    #[test]
    fn test_average_single_value() {
        assert_eq!(average(&[-7.0]), 7.0);
    }

    #[test]
    fn test_trend_short_sequences_neutral() {
        assert_eq!(trend(&[]), Trend::Neutral);
        assert_eq!(trend(&[5.0]), Trend::Neutral);
    }

    #[test]
    fn test_trend_down() {
        assert_eq!(trend(&[10.0, 10.0, 2.0, 2.0]), Trend::Down);
    }

    #[test]
    fn test_trend_up() {
        assert_eq!(trend(&[2.0, 2.0, 10.0, 10.0]), Trend::Up);
    }

    #[test]
    fn test_trend_equal_halves_neutral() {
        assert_eq!(trend(&[3.0, 3.0, 3.0, 3.0]), Trend::Neutral);
    }

    #[test]
    fn test_trend_odd_length_split() {
        // First half = floor(5/2) = 2 values, second half = 3 values.
        // first avg = 10, second avg = (10 + 1 + 1) / 3 = 4 -> down
        assert_eq!(trend(&[10.0, 10.0, 10.0, 1.0, 1.0]), Trend::Down);
    }

    #[test]
    fn test_trend_sign_insensitive() {
        // Magnitudes shrink even though signs flip
        assert_eq!(trend(&[-10.0, 10.0, -2.0, 2.0]), Trend::Down);
    }

    #[test]
    fn test_posture_score_empty_is_zero() {
        assert_eq!(posture_score(&[], &Thresholds::default()), 0);
    }

    #[test]
    fn test_posture_score_one_in_four() {
        let thresholds = Thresholds::default();
        let samples = vec![
            Measurement::now(1.0, 1.0, 1.0),   // good
            Measurement::now(10.0, 1.0, 1.0),  // bad shoulder
            Measurement::now(1.0, 10.0, 1.0),  // bad hip
            Measurement::now(1.0, 1.0, 10.0),  // bad tilt
        ];
        assert_eq!(posture_score(&samples, &thresholds), 25);
    }

    #[test]
    fn test_posture_score_rounds_to_nearest() {
        let thresholds = Thresholds::default();
        // 1 of 3 good -> 33.33 -> 33
        let samples = vec![
            Measurement::now(1.0, 1.0, 1.0),
            Measurement::now(10.0, 1.0, 1.0),
            Measurement::now(10.0, 1.0, 1.0),
        ];
        assert_eq!(posture_score(&samples, &thresholds), 33);

        // 2 of 3 good -> 66.67 -> 67
        let samples = vec![
            Measurement::now(1.0, 1.0, 1.0),
            Measurement::now(1.0, 1.0, 1.0),
            Measurement::now(10.0, 1.0, 1.0),
        ];
        assert_eq!(posture_score(&samples, &thresholds), 67);
    }

    #[test]
    fn test_posture_score_all_good() {
        let thresholds = Thresholds::default();
        let samples = vec![Measurement::now(0.0, 0.0, 0.0); 10];
        assert_eq!(posture_score(&samples, &thresholds), 100);
    }

    #[test]
    fn test_summary_empty() {
        let summary = StatsSummary::empty();
        assert_eq!(summary.sample_count, 0);
        assert_eq!(summary.posture_score, 0);
        assert_eq!(summary.shoulder.average, 0.0);
        assert_eq!(summary.shoulder.trend, Trend::Neutral);
    }

    #[test]
    fn test_summary_compute() {
        let thresholds = Thresholds::default();
        let samples = vec![
            Measurement::now(10.0, 2.0, 1.0),
            Measurement::now(10.0, 2.0, 1.0),
            Measurement::now(2.0, 2.0, 1.0),
            Measurement::now(2.0, 2.0, 1.0),
        ];

        let summary = StatsSummary::compute(&samples, &thresholds);
        assert_eq!(summary.sample_count, 4);
        assert_eq!(summary.shoulder.average, 6.0);
        assert_eq!(summary.shoulder.trend, Trend::Down);
        assert_eq!(summary.hip.trend, Trend::Neutral);
        // 2 of 4 samples have shoulder within 5 degrees
        assert_eq!(summary.posture_score, 50);
    }

    #[test]
    fn test_summary_for_angle() {
        let summary = StatsSummary::compute(
            &[Measurement::now(4.0, 2.0, 1.0)],
            &Thresholds::default(),
        );
        assert_eq!(summary.for_angle(AngleKind::Shoulder).average, 4.0);
        assert_eq!(summary.for_angle(AngleKind::Hip).average, 2.0);
        assert_eq!(summary.for_angle(AngleKind::Tilt).average, 1.0);
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(Trend::Up.label(), "Increasing");
        assert_eq!(Trend::Down.label(), "Decreasing");
        assert_eq!(Trend::Neutral.label(), "Stable");
        assert_eq!(Trend::Up.glyph(), "↑");
        assert_eq!(Trend::Down.glyph(), "↓");
        assert_eq!(Trend::Neutral.glyph(), "→");
    }

    #[test]
    fn test_trend_display() {
        assert_eq!(Trend::Up.to_string(), "up");
        assert_eq!(Trend::Down.to_string(), "down");
        assert_eq!(Trend::Neutral.to_string(), "neutral");
    }
}
