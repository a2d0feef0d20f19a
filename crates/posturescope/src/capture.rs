//! The countdown/capture/save workflow.
//!
//! A short-lived state machine: `idle -> counting_down -> captured ->
//! {saving -> idle | captured}`. The snapshot is a by-value copy of the
//! latest measurement at countdown zero and survives a failed save so the
//! user can retry. At most one save is in flight at a time; the guard
//! transitions are separated from the async call so they can be tested
//! without a server.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::measurement::Measurement;

/// Destination for captured snapshots.
///
/// Implemented by [`crate::api::ApiClient`] against the server's
/// persistence endpoint, and by test doubles.
#[async_trait]
pub trait MeasurementSink: Send + Sync {
    /// Persist one captured measurement.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the save or the request
    /// fails; the caller keeps the snapshot for retry.
    async fn save_measurement(&self, measurement: &Measurement) -> Result<()>;
}

/// Workflow states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureState {
    /// Nothing in progress.
    Idle,
    /// Countdown running; `remaining` ticks left.
    CountingDown {
        /// Seconds until the snapshot is taken.
        remaining: u32,
    },
    /// A snapshot is held, awaiting save or discard.
    Captured(Measurement),
    /// The snapshot is being sent to the persistence endpoint.
    Saving(Measurement),
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Still counting; `remaining` ticks left.
    Counting {
        /// Seconds until the snapshot is taken.
        remaining: u32,
    },
    /// Countdown reached zero and a snapshot was taken.
    Captured(Measurement),
    /// Countdown reached zero but no measurement has ever arrived;
    /// the workflow returned to idle.
    NothingToCapture,
    /// The workflow was not counting; the tick was ignored.
    NotCounting,
}

/// The capture workflow state machine.
#[derive(Debug, Clone)]
pub struct CaptureWorkflow {
    state: CaptureState,
    countdown_from: u32,
}

impl CaptureWorkflow {
    /// Create an idle workflow counting down from `countdown_from`.
    #[must_use]
    pub fn new(countdown_from: u32) -> Self {
        Self {
            state: CaptureState::Idle,
            countdown_from,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// The held snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Measurement> {
        match self.state {
            CaptureState::Captured(m) | CaptureState::Saving(m) => Some(m),
            _ => None,
        }
    }

    /// Start the countdown. Only valid from idle.
    ///
    /// # Errors
    ///
    /// Returns an error if a countdown, snapshot, or save is already in
    /// progress.
    pub fn start_countdown(&mut self) -> Result<u32> {
        match self.state {
            CaptureState::Idle => {
                self.state = CaptureState::CountingDown {
                    remaining: self.countdown_from,
                };
                Ok(self.countdown_from)
            }
            _ => Err(Error::CaptureTransition {
                message: format!("countdown requested in state {:?}", self.state),
            }),
        }
    }

    /// Advance the countdown by one tick.
    ///
    /// At zero, the current latest measurement is copied by value into the
    /// snapshot; if none has ever arrived the workflow returns to idle.
    pub fn tick(&mut self, latest: Option<Measurement>) -> TickOutcome {
        let CaptureState::CountingDown { remaining } = self.state else {
            return TickOutcome::NotCounting;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.state = CaptureState::CountingDown { remaining };
            return TickOutcome::Counting { remaining };
        }

        match latest {
            Some(measurement) => {
                self.state = CaptureState::Captured(measurement);
                TickOutcome::Captured(measurement)
            }
            None => {
                self.state = CaptureState::Idle;
                TickOutcome::NothingToCapture
            }
        }
    }

    /// Cancel a running countdown and return to idle.
    pub fn cancel_countdown(&mut self) {
        if matches!(self.state, CaptureState::CountingDown { .. }) {
            self.state = CaptureState::Idle;
        }
    }

    /// Discard the held snapshot without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if no snapshot is held or a save is in flight.
    pub fn discard(&mut self) -> Result<()> {
        match self.state {
            CaptureState::Captured(_) => {
                self.state = CaptureState::Idle;
                Ok(())
            }
            CaptureState::Saving(_) => Err(Error::SaveInFlight),
            _ => Err(Error::CaptureTransition {
                message: "discard requested with no snapshot held".to_string(),
            }),
        }
    }

    /// Begin a save: `captured -> saving`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SaveInFlight`] if a save is already running, or a
    /// transition error if no snapshot is held.
    pub fn begin_save(&mut self) -> Result<Measurement> {
        match self.state {
            CaptureState::Captured(measurement) => {
                self.state = CaptureState::Saving(measurement);
                Ok(measurement)
            }
            CaptureState::Saving(_) => Err(Error::SaveInFlight),
            _ => Err(Error::CaptureTransition {
                message: "save requested with no snapshot held".to_string(),
            }),
        }
    }

    /// Complete a save: to idle on success, back to `captured` on failure
    /// so the snapshot can be retried.
    pub fn complete_save(&mut self, success: bool) {
        if let CaptureState::Saving(measurement) = self.state {
            self.state = if success {
                CaptureState::Idle
            } else {
                CaptureState::Captured(measurement)
            };
        }
    }

    /// Send the held snapshot to the sink.
    ///
    /// # Errors
    ///
    /// Propagates the guard errors from [`Self::begin_save`] and any sink
    /// error; on sink failure the snapshot is retained.
    pub async fn save(&mut self, sink: &dyn MeasurementSink) -> Result<Measurement> {
        let measurement = self.begin_save()?;
        match sink.save_measurement(&measurement).await {
            Ok(()) => {
                self.complete_save(true);
                Ok(measurement)
            }
            Err(e) => {
                self.complete_save(false);
                Err(e)
            }
        }
    }
}
