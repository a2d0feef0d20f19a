//! Measurement stream reduction.
//!
//! The [`StreamReducer`] is the single write path into the in-memory
//! history: every accepted sample is appended to a bounded FIFO buffer and
//! overwrites the latest-measurement slot. Downstream consumers (statistics
//! and chart state) are recomputed synchronously by [`DashboardState`] on
//! every accepted sample, so both views always reflect the same window.

use chrono::{DateTime, Utc};

use crate::measurement::{Measurement, RawSample, Thresholds};
use crate::stats::StatsSummary;
use crate::viz::{ChartState, TimeRange};

/// Bounded, FIFO-evicted ordered collection of measurements.
///
/// Insertion order equals arrival order; when the buffer is at capacity the
/// oldest entry is evicted first. Only the reducer writes to it.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: std::collections::VecDeque<Measurement>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 (rejected earlier by config validation).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be greater than 0");
        Self {
            entries: std::collections::VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a measurement, evicting the oldest entry if at capacity.
    pub fn push(&mut self, measurement: Measurement) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(measurement);
    }

    /// Number of retained measurements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer holds no measurements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read-only view of the retained measurements in arrival order.
    #[must_use]
    pub fn as_slice(&self) -> Vec<Measurement> {
        self.entries.iter().copied().collect()
    }

    /// Iterate over the retained measurements in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.entries.iter()
    }

    /// Drop all retained measurements.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Reduces the incoming measurement stream into the history buffer and the
/// latest-measurement slot.
#[derive(Debug, Clone)]
pub struct StreamReducer {
    history: HistoryBuffer,
    latest: Option<Measurement>,
    accepted: u64,
    rejected: u64,
}

impl StreamReducer {
    /// Create a reducer with the given history capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            history: HistoryBuffer::new(capacity),
            latest: None,
            accepted: 0,
            rejected: 0,
        }
    }

    /// Ingest a raw sample stamped with the given arrival time.
    ///
    /// Returns the accepted measurement, or `None` if the sample was
    /// missing any angle field (malformed input is dropped, not fatal).
    pub fn ingest(&mut self, sample: RawSample, arrived_at: DateTime<Utc>) -> Option<Measurement> {
        let Some(measurement) = sample.into_measurement(arrived_at) else {
            self.rejected += 1;
            tracing::debug!("dropping malformed sample: {sample:?}");
            return None;
        };

        self.history.push(measurement);
        self.latest = Some(measurement);
        self.accepted += 1;
        Some(measurement)
    }

    /// The most recent accepted measurement, if any has ever arrived.
    #[must_use]
    pub fn latest(&self) -> Option<Measurement> {
        self.latest
    }

    /// Read-only view of the history buffer.
    #[must_use]
    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Number of samples accepted since startup.
    #[must_use]
    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    /// Number of malformed samples dropped since startup.
    #[must_use]
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Reset the history buffer. The latest slot is kept; it reflects the
    /// most recent live reading, not stored history.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

/// Aggregated dashboard view state.
///
/// Owns the reducer, the cached threshold set, the selected time range, and
/// the derived statistics and chart state. Every accepted sample and every
/// range or threshold change recomputes the derived state in one step.
#[derive(Debug, Clone)]
pub struct DashboardState {
    reducer: StreamReducer,
    thresholds: Thresholds,
    range: TimeRange,
    stats: StatsSummary,
    charts: ChartState,
}

impl DashboardState {
    /// Create dashboard state with the given history capacity and the
    /// default threshold set.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            reducer: StreamReducer::new(capacity),
            thresholds: Thresholds::default(),
            range: TimeRange::All,
            stats: StatsSummary::empty(),
            charts: ChartState::default(),
        }
    }

    /// Ingest a sample and recompute statistics and charts.
    ///
    /// Returns the accepted measurement, or `None` if it was dropped.
    pub fn on_sample(&mut self, sample: RawSample, arrived_at: DateTime<Utc>) -> Option<Measurement> {
        let accepted = self.reducer.ingest(sample, arrived_at)?;
        self.recompute(arrived_at);
        Some(accepted)
    }

    /// Change the selected time range and recompute derived state.
    pub fn set_range(&mut self, range: TimeRange, now: DateTime<Utc>) {
        self.range = range;
        self.recompute(now);
    }

    /// Replace the cached threshold set and recompute derived state.
    pub fn set_thresholds(&mut self, thresholds: Thresholds, now: DateTime<Utc>) {
        self.thresholds = thresholds;
        self.recompute(now);
    }

    /// Drop all history (after a successful server-side clear) and
    /// recompute derived state.
    pub fn clear_history(&mut self, now: DateTime<Utc>) {
        self.reducer.clear_history();
        self.recompute(now);
    }

    fn recompute(&mut self, now: DateTime<Utc>) {
        let all = self.reducer.history().as_slice();
        let window = self.range.filter(&all, now);
        // Stats and both chart views are rebuilt from the same window
        // before control returns to the caller.
        self.stats = StatsSummary::compute(&window, &self.thresholds);
        self.charts = ChartState::rebuild(&window);
    }

    /// The underlying reducer.
    #[must_use]
    pub fn reducer(&self) -> &StreamReducer {
        &self.reducer
    }

    /// The cached threshold set.
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// The selected time range.
    #[must_use]
    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Statistics over the current window.
    #[must_use]
    pub fn stats(&self) -> &StatsSummary {
        &self.stats
    }

    /// Chart state over the current window.
    #[must_use]
    pub fn charts(&self) -> &ChartState {
        &self.charts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(shoulder: f64) -> RawSample {
        RawSample::new(shoulder, 0.0, 0.0)
    }

    #[test]
    fn test_buffer_push_and_order() {
        let mut buffer = HistoryBuffer::new(3);
        buffer.push(Measurement::now(1.0, 0.0, 0.0));
        buffer.push(Measurement::now(2.0, 0.0, 0.0));

        let entries = buffer.as_slice();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].shoulder_angle, 1.0);
        assert_eq!(entries[1].shoulder_angle, 2.0);
    }

    #[test]
    fn test_buffer_fifo_eviction() {
        let mut buffer = HistoryBuffer::new(3);
        for i in 0..5 {
            buffer.push(Measurement::now(f64::from(i), 0.0, 0.0));
        }

        let entries = buffer.as_slice();
        assert_eq!(entries.len(), 3);
        // Oldest two evicted; last three retained in arrival order
        assert_eq!(entries[0].shoulder_angle, 2.0);
        assert_eq!(entries[1].shoulder_angle, 3.0);
        assert_eq!(entries[2].shoulder_angle, 4.0);
    }

    #[test]
    fn test_buffer_never_exceeds_capacity() {
        let mut reducer = StreamReducer::new(100);
        let now = Utc::now();
        for i in 0..250 {
            reducer.ingest(sample(f64::from(i)), now);
        }

        assert_eq!(reducer.history().len(), 100);
        let entries = reducer.history().as_slice();
        // Contents equal the last 100 events in arrival order
        for (offset, entry) in entries.iter().enumerate() {
            assert_eq!(entry.shoulder_angle, f64::from(150 + offset as i32));
        }
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn test_buffer_zero_capacity_panics() {
        let _ = HistoryBuffer::new(0);
    }

    #[test]
    fn test_reducer_updates_latest() {
        let mut reducer = StreamReducer::new(10);
        assert!(reducer.latest().is_none());

        reducer.ingest(sample(1.0), Utc::now());
        reducer.ingest(sample(2.0), Utc::now());

        assert_eq!(reducer.latest().unwrap().shoulder_angle, 2.0);
        assert_eq!(reducer.accepted_count(), 2);
    }

    #[test]
    fn test_reducer_rejects_incomplete_sample() {
        let mut reducer = StreamReducer::new(10);
        let malformed = RawSample {
            shoulder_angle: Some(1.0),
            hip_angle: None,
            tilt_angle: Some(0.5),
        };

        assert!(reducer.ingest(malformed, Utc::now()).is_none());
        assert!(reducer.history().is_empty());
        assert!(reducer.latest().is_none());
        assert_eq!(reducer.rejected_count(), 1);
    }

    #[test]
    fn test_reducer_clear_keeps_latest() {
        let mut reducer = StreamReducer::new(10);
        reducer.ingest(sample(3.0), Utc::now());
        reducer.clear_history();

        assert!(reducer.history().is_empty());
        assert!(reducer.latest().is_some());
    }

    #[test]
    fn test_dashboard_recomputes_on_sample() {
        let mut dashboard = DashboardState::new(10);
        let now = Utc::now();

        dashboard.on_sample(RawSample::new(4.0, 1.0, 1.0), now);

        assert_eq!(dashboard.stats().sample_count, 1);
        assert_eq!(dashboard.stats().shoulder.average, 4.0);
        assert_eq!(dashboard.charts().trend.shoulder, vec![4.0]);
        assert_eq!(dashboard.charts().distribution.shoulder, vec![4.0]);
    }

    #[test]
    fn test_dashboard_charts_and_stats_share_window() {
        let mut dashboard = DashboardState::new(10);
        let now = Utc::now();
        let old = now - Duration::hours(2);
        let recent = now - Duration::minutes(30);

        dashboard.on_sample(RawSample::new(10.0, 0.0, 0.0), old);
        dashboard.on_sample(RawSample::new(2.0, 0.0, 0.0), recent);
        dashboard.set_range(TimeRange::H1, now);

        // Both derived views reflect only the sample inside the window
        assert_eq!(dashboard.stats().sample_count, 1);
        assert_eq!(dashboard.charts().trend.shoulder, vec![2.0]);
        assert_eq!(dashboard.charts().distribution.shoulder, vec![2.0]);
    }

    #[test]
    fn test_dashboard_threshold_change_rescores() {
        let mut dashboard = DashboardState::new(10);
        let now = Utc::now();
        dashboard.on_sample(RawSample::new(4.0, 1.0, 1.0), now);
        assert_eq!(dashboard.stats().posture_score, 100);

        let strict = Thresholds {
            shoulder_threshold: 1.0,
            hip_threshold: 1.0,
            tilt_threshold: 1.0,
        };
        dashboard.set_thresholds(strict, now);
        assert_eq!(dashboard.stats().posture_score, 0);
    }

    #[test]
    fn test_dashboard_clear_history() {
        let mut dashboard = DashboardState::new(10);
        let now = Utc::now();
        dashboard.on_sample(RawSample::new(4.0, 1.0, 1.0), now);

        dashboard.clear_history(now);

        assert_eq!(dashboard.stats().sample_count, 0);
        assert_eq!(dashboard.stats().posture_score, 0);
        assert!(dashboard.charts().trend.timestamps.is_empty());
    }

    #[test]
    fn test_dashboard_rejected_sample_leaves_state_untouched() {
        let mut dashboard = DashboardState::new(10);
        let now = Utc::now();
        dashboard.on_sample(RawSample::new(4.0, 1.0, 1.0), now);
        let before = *dashboard.stats();

        let malformed = RawSample {
            shoulder_angle: None,
            hip_angle: Some(1.0),
            tilt_angle: Some(1.0),
        };
        assert!(dashboard.on_sample(malformed, now).is_none());
        assert_eq!(*dashboard.stats(), before);
    }
}
