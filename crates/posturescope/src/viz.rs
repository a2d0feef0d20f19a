//! Chart state, time-range filtering, row search, and CSV export.
//!
//! The trend and distribution views are never updated independently:
//! [`ChartState::rebuild`] derives both from one filtered window, so the two
//! views always agree on which samples they show.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::measurement::Measurement;

/// CSV header line for history exports.
pub const CSV_HEADER: &str = "timestamp,shoulder_angle,hip_angle,tilt_angle";

/// Recognized time-range filters for the chart views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    /// Last hour.
    H1,
    /// Last six hours.
    H6,
    /// Last 24 hours.
    H24,
    /// Last seven days.
    D7,
    /// No filtering.
    #[default]
    All,
}

impl TimeRange {
    /// The window length in hours, or `None` for [`TimeRange::All`].
    #[must_use]
    pub fn hours(&self) -> Option<i64> {
        match self {
            Self::H1 => Some(1),
            Self::H6 => Some(6),
            Self::H24 => Some(24),
            Self::D7 => Some(168),
            Self::All => None,
        }
    }

    /// Keep only measurements within the window ending at `now`.
    #[must_use]
    pub fn filter(&self, measurements: &[Measurement], now: DateTime<Utc>) -> Vec<Measurement> {
        match self.hours() {
            None => measurements.to_vec(),
            Some(hours) => {
                let cutoff = now - Duration::hours(hours);
                measurements
                    .iter()
                    .filter(|m| m.timestamp > cutoff)
                    .copied()
                    .collect()
            }
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::H1 => write!(f, "1h"),
            Self::H6 => write!(f, "6h"),
            Self::H24 => write!(f, "24h"),
            Self::D7 => write!(f, "7d"),
            Self::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Self::H1),
            "6h" => Ok(Self::H6),
            "24h" => Ok(Self::H24),
            "7d" => Ok(Self::D7),
            "all" => Ok(Self::All),
            other => Err(format!("unrecognized time range '{other}'")),
        }
    }
}

/// Per-angle series for the time-series trend view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    /// X axis: sample timestamps.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Shoulder angle values.
    pub shoulder: Vec<f64>,
    /// Hip angle values.
    pub hip: Vec<f64>,
    /// Tilt angle values.
    pub tilt: Vec<f64>,
}

/// Per-angle value arrays for the distribution view (no x axis).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionSeries {
    /// Shoulder angle values.
    pub shoulder: Vec<f64>,
    /// Hip angle values.
    pub hip: Vec<f64>,
    /// Tilt angle values.
    pub tilt: Vec<f64>,
}

/// Both chart views, derived from one filtered window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartState {
    /// Time-series trend view.
    pub trend: TrendSeries,
    /// Distribution view.
    pub distribution: DistributionSeries,
}

impl ChartState {
    /// Rebuild both views from the given window in one step.
    #[must_use]
    pub fn rebuild(window: &[Measurement]) -> Self {
        let shoulder: Vec<f64> = window.iter().map(|m| m.shoulder_angle).collect();
        let hip: Vec<f64> = window.iter().map(|m| m.hip_angle).collect();
        let tilt: Vec<f64> = window.iter().map(|m| m.tilt_angle).collect();

        Self {
            trend: TrendSeries {
                timestamps: window.iter().map(|m| m.timestamp).collect(),
                shoulder: shoulder.clone(),
                hip: hip.clone(),
                tilt: tilt.clone(),
            },
            distribution: DistributionSeries {
                shoulder,
                hip,
                tilt,
            },
        }
    }
}

/// Case-insensitive substring match for the tabular history view.
///
/// Operates on the full rendered row text and is independent of the chart
/// window.
#[must_use]
pub fn row_matches(row_text: &str, query: &str) -> bool {
    row_text.to_lowercase().contains(&query.to_lowercase())
}

/// Render a history row the way the tabular view does.
#[must_use]
pub fn render_row(measurement: &Measurement) -> String {
    format!(
        "{} {:.1}° {:.1}° {:.1}°",
        measurement.timestamp.format("%Y-%m-%d %H:%M:%S"),
        measurement.shoulder_angle,
        measurement.hip_angle,
        measurement.tilt_angle
    )
}

/// Produce the CSV text for the full (unfiltered) history.
///
/// Header row first, one record per line, comma-separated.
#[must_use]
pub fn export_csv(measurements: &[Measurement]) -> String {
    let mut lines = Vec::with_capacity(measurements.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for m in measurements {
        lines.push(format!(
            "{},{},{},{}",
            m.timestamp.to_rfc3339(),
            m.shoulder_angle,
            m.hip_angle,
            m.tilt_angle
        ));
    }
    lines.join("\n")
}

/// File name for a CSV export made at the given time.
#[must_use]
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("posture_history_{}.csv", now.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(now: DateTime<Utc>, minutes_ago: i64, shoulder: f64) -> Measurement {
        Measurement {
            timestamp: now - Duration::minutes(minutes_ago),
            shoulder_angle: shoulder,
            hip_angle: 0.0,
            tilt_angle: 0.0,
        }
    }

    #[test]
    fn test_time_range_parse() {
        assert_eq!("1h".parse::<TimeRange>().unwrap(), TimeRange::H1);
        assert_eq!("6h".parse::<TimeRange>().unwrap(), TimeRange::H6);
        assert_eq!("24h".parse::<TimeRange>().unwrap(), TimeRange::H24);
        assert_eq!("7d".parse::<TimeRange>().unwrap(), TimeRange::D7);
        assert_eq!("all".parse::<TimeRange>().unwrap(), TimeRange::All);
        assert!("2h".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_time_range_display_roundtrip() {
        for range in [
            TimeRange::H1,
            TimeRange::H6,
            TimeRange::H24,
            TimeRange::D7,
            TimeRange::All,
        ] {
            assert_eq!(range.to_string().parse::<TimeRange>().unwrap(), range);
        }
    }

    #[test]
    fn test_time_range_hours() {
        assert_eq!(TimeRange::H1.hours(), Some(1));
        assert_eq!(TimeRange::D7.hours(), Some(168));
        assert_eq!(TimeRange::All.hours(), None);
    }

    #[test]
    fn test_filter_one_hour_window() {
        let now = Utc::now();
        let two_hours_old = at(now, 120, 10.0);
        let half_hour_old = at(now, 30, 2.0);

        let window = TimeRange::H1.filter(&[two_hours_old, half_hour_old], now);

        assert_eq!(window.len(), 1);
        assert_eq!(window[0].shoulder_angle, 2.0);
    }

    #[test]
    fn test_filter_all_keeps_everything() {
        let now = Utc::now();
        let data = vec![at(now, 120, 10.0), at(now, 30, 2.0)];

        let window = TimeRange::All.filter(&data, now);
        assert_eq!(window, data);
    }

    #[test]
    fn test_filter_preserves_order() {
        let now = Utc::now();
        let data = vec![at(now, 50, 1.0), at(now, 40, 2.0), at(now, 10, 3.0)];

        let window = TimeRange::H1.filter(&data, now);
        let shoulders: Vec<f64> = window.iter().map(|m| m.shoulder_angle).collect();
        assert_eq!(shoulders, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_chart_state_rebuild() {
        let now = Utc::now();
        let window = vec![at(now, 2, 1.0), at(now, 1, -3.0)];

        let charts = ChartState::rebuild(&window);

        assert_eq!(charts.trend.timestamps.len(), 2);
        assert_eq!(charts.trend.shoulder, vec![1.0, -3.0]);
        assert_eq!(charts.distribution.shoulder, vec![1.0, -3.0]);
        assert_eq!(charts.trend.hip, charts.distribution.hip);
        assert_eq!(charts.trend.tilt, charts.distribution.tilt);
    }

    #[test]
    fn test_chart_state_rebuild_empty() {
        let charts = ChartState::rebuild(&[]);
        assert!(charts.trend.timestamps.is_empty());
        assert!(charts.distribution.shoulder.is_empty());
    }

    #[test]
    fn test_row_matches_case_insensitive() {
        assert!(row_matches("2025-01-02 10:00:00 4.5° 1.2° 0.3°", "10:00"));
        assert!(row_matches("Shoulder OK", "shoulder"));
        assert!(row_matches("Shoulder OK", "OK"));
        assert!(!row_matches("Shoulder OK", "hip"));
        // Empty query matches every row
        assert!(row_matches("anything", ""));
    }

    #[test]
    fn test_render_row_format() {
        let m = Measurement {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 2, 10, 30, 0).unwrap(),
            shoulder_angle: 4.56,
            hip_angle: -1.0,
            tilt_angle: 0.25,
        };
        let row = render_row(&m);
        assert!(row.contains("2025-01-02 10:30:00"));
        assert!(row.contains("4.6°"));
        assert!(row.contains("-1.0°"));
        assert!(row.contains("0.2°"));
    }

    #[test]
    fn test_export_csv_two_records() {
        let t1 = Utc.with_ymd_and_hms(2025, 1, 2, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 1, 2, 11, 0, 0).unwrap();
        let records = vec![
            Measurement {
                timestamp: t1,
                shoulder_angle: 1.0,
                hip_angle: 2.0,
                tilt_angle: 0.5,
            },
            Measurement {
                timestamp: t2,
                shoulder_angle: -3.0,
                hip_angle: 4.0,
                tilt_angle: -1.0,
            },
        ];

        let csv = export_csv(&records);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,shoulder_angle,hip_angle,tilt_angle");
        assert_eq!(lines[1], format!("{},1,2,0.5", t1.to_rfc3339()));
        assert_eq!(lines[2], format!("{},-3,4,-1", t2.to_rfc3339()));
    }

    #[test]
    fn test_export_csv_empty_is_header_only() {
        assert_eq!(export_csv(&[]), CSV_HEADER);
    }

    #[test]
    fn test_export_filename_has_date() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(export_filename(now), "posture_history_2025-03-14.csv");
    }
}
