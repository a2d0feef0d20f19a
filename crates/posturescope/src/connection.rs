//! Realtime connection management.
//!
//! One WebSocket connection to the measurement server, with bounded
//! reconnection and a linear backoff between a floor and ceiling delay.
//! The connection state machine is kept separate from the socket loop so
//! transitions can be tested without a live server; the loop pushes typed
//! [`ClientEvent`]s through an mpsc channel for the UI layer to consume.

use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::measurement::RawSample;

/// Name of the realtime event carrying measurement payloads.
pub const MEASUREMENTS_EVENT: &str = "measurements";

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// A connect attempt is in progress.
    #[default]
    Connecting,
    /// The socket is established.
    Connected,
    /// The transport was lost; a retry is pending.
    Disconnected,
    /// All attempts were exhausted. Terminal until a restart.
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Typed events pushed from the connection loop to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The connection state changed. Carries the attempt counter so the
    /// overlay can show "attempt N of M".
    StateChanged {
        /// The new state.
        state: ConnectionState,
        /// Connection attempts made since the last successful connect.
        attempts: u32,
    },
    /// A measurement frame arrived.
    Sample(RawSample),
}

/// Reconnection backoff policy: linear in the attempt number, clamped to a
/// ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Ceiling on the retry delay.
    pub max_delay: Duration,
    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given attempt (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.initial_delay.saturating_mul(attempt.max(1));
        scaled.min(self.max_delay)
    }
}

/// Tracks connection state transitions and the attempt counter.
///
/// Owned by the connection loop; read by the UI through the events it
/// emits. Every transition is observable, so failure is never silent.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    state: ConnectionState,
    attempts: u32,
    max_attempts: u32,
}

impl ConnectionTracker {
    /// Create a tracker that gives up after `max_attempts` failed attempts.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: ConnectionState::Connecting,
            attempts: 0,
            max_attempts,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Attempts made since the last successful connect.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// A connect attempt is starting.
    pub fn on_connecting(&mut self) {
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Connecting;
        }
    }

    /// The socket was established; the attempt counter resets.
    pub fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.attempts = 0;
    }

    /// The transport was lost mid-session.
    pub fn on_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// A connect attempt failed. Returns `true` if the tracker has now
    /// entered the terminal [`ConnectionState::Failed`] state.
    pub fn on_attempt_failed(&mut self) -> bool {
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            self.state = ConnectionState::Failed;
            true
        } else {
            self.state = ConnectionState::Disconnected;
            false
        }
    }

    /// Whether the tracker is in the terminal failed state.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.state == ConnectionState::Failed
    }
}

/// A realtime frame as sent by the server: an event name plus payload.
#[derive(Debug, Deserialize)]
struct SocketFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Decode a text frame into a raw sample.
///
/// Returns `None` for frames that are not `measurements` events or that
/// fail to parse; the stream carries other event types we don't consume.
#[must_use]
pub fn decode_frame(text: &str) -> Option<RawSample> {
    let frame: SocketFrame = serde_json::from_str(text).ok()?;
    if frame.event != MEASUREMENTS_EVENT {
        debug!("ignoring frame event '{}'", frame.event);
        return None;
    }
    serde_json::from_value(frame.data).ok()
}

/// The realtime socket loop.
///
/// Connects to the measurement socket, forwards decoded samples and state
/// transitions through `tx`, and retries per the policy. Returns when the
/// receiver is dropped or the attempt budget is exhausted.
#[derive(Debug)]
pub struct ConnectionManager {
    url: Url,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
}

impl ConnectionManager {
    /// Create a manager for the given socket URL.
    #[must_use]
    pub fn new(url: Url, policy: ReconnectPolicy, connect_timeout: Duration) -> Self {
        Self {
            url,
            policy,
            connect_timeout,
        }
    }

    /// Run the connection loop until the receiver is dropped or the
    /// attempt budget is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionExhausted`] once the maximum number of
    /// attempts is reached.
    pub async fn run(&self, tx: mpsc::Sender<ClientEvent>) -> Result<()> {
        let mut tracker = ConnectionTracker::new(self.policy.max_attempts);

        loop {
            tracker.on_connecting();
            if Self::emit(&tx, &tracker).await.is_err() {
                return Ok(());
            }

            match tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
                .await
            {
                Ok(Ok((stream, _response))) => {
                    info!("connected to {}", self.url);
                    tracker.on_connected();
                    if Self::emit(&tx, &tracker).await.is_err() {
                        return Ok(());
                    }

                    if Self::read_stream(stream, &tx).await.is_err() {
                        // Receiver dropped; shut down quietly.
                        return Ok(());
                    }

                    warn!("connection to {} lost", self.url);
                    tracker.on_disconnected();
                    if Self::emit(&tx, &tracker).await.is_err() {
                        return Ok(());
                    }

                    // A transport loss is not a failed attempt; retry after
                    // the floor delay.
                    tokio::time::sleep(self.policy.initial_delay).await;
                    continue;
                }
                Ok(Err(e)) => {
                    warn!("connect to {} failed: {e}", self.url);
                }
                Err(_elapsed) => {
                    warn!(
                        "connect to {} timed out after {:?}",
                        self.url, self.connect_timeout
                    );
                }
            }

            if tracker.on_attempt_failed() {
                let _ = Self::emit(&tx, &tracker).await;
                return Err(Error::ConnectionExhausted {
                    attempts: tracker.attempts(),
                });
            }
            let _ = Self::emit(&tx, &tracker).await;

            let delay = self.policy.delay_for(tracker.attempts());
            debug!(
                "retrying in {:?} (attempt {}/{})",
                delay,
                tracker.attempts(),
                self.policy.max_attempts
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Read frames until the stream ends. Returns `Err(())` only when the
    /// event receiver is gone.
    async fn read_stream<S>(
        mut stream: S,
        tx: &mpsc::Sender<ClientEvent>,
    ) -> std::result::Result<(), ()>
    where
        S: StreamExt<Item = tokio_tungstenite::tungstenite::Result<Message>> + Unpin,
    {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if let Some(sample) = decode_frame(&text) {
                        if tx.send(ClientEvent::Sample(sample)).await.is_err() {
                            return Err(());
                        }
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("websocket read error: {e}");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn emit(
        tx: &mpsc::Sender<ClientEvent>,
        tracker: &ConnectionTracker,
    ) -> std::result::Result<(), ()> {
        tx.send(ClientEvent::StateChanged {
            state: tracker.state(),
            attempts: tracker.attempts(),
        })
        .await
        .map_err(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionState::Failed.to_string(), "failed");
    }

    #[test]
    fn test_policy_linear_delay() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(5), Duration::from_millis(5000));
    }

    #[test]
    fn test_policy_delay_clamped_to_ceiling() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(6), Duration::from_millis(5000));
        assert_eq!(policy.delay_for(100), Duration::from_millis(5000));
    }

    #[test]
    fn test_policy_delay_zero_attempt_treated_as_first() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
    }

    #[test]
    fn test_tracker_connect_resets_attempts() {
        let mut tracker = ConnectionTracker::new(5);
        tracker.on_attempt_failed();
        tracker.on_attempt_failed();
        assert_eq!(tracker.attempts(), 2);

        tracker.on_connected();
        assert_eq!(tracker.state(), ConnectionState::Connected);
        assert_eq!(tracker.attempts(), 0);
    }

    #[test]
    fn test_tracker_disconnect() {
        let mut tracker = ConnectionTracker::new(5);
        tracker.on_connected();
        tracker.on_disconnected();
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_tracker_fails_at_max_attempts() {
        let mut tracker = ConnectionTracker::new(3);

        assert!(!tracker.on_attempt_failed());
        assert!(!tracker.on_attempt_failed());
        assert_eq!(tracker.state(), ConnectionState::Disconnected);

        assert!(tracker.on_attempt_failed());
        assert!(tracker.is_failed());
        assert_eq!(tracker.attempts(), 3);
    }

    #[test]
    fn test_tracker_failed_is_terminal() {
        let mut tracker = ConnectionTracker::new(1);
        assert!(tracker.on_attempt_failed());

        tracker.on_connecting();
        assert_eq!(tracker.state(), ConnectionState::Failed);
    }

    #[test]
    fn test_decode_measurements_frame() {
        let text = r#"{"event":"measurements","data":{"shoulder_angle":1.5,"hip_angle":-2.0,"tilt_angle":0.5}}"#;
        let sample = decode_frame(text).unwrap();
        assert_eq!(sample.shoulder_angle, Some(1.5));
        assert_eq!(sample.hip_angle, Some(-2.0));
        assert_eq!(sample.tilt_angle, Some(0.5));
    }

    #[test]
    fn test_decode_frame_missing_field_still_decodes() {
        // Missing angles are carried through; the reducer rejects them.
        let text = r#"{"event":"measurements","data":{"shoulder_angle":1.5}}"#;
        let sample = decode_frame(text).unwrap();
        assert!(!sample.is_complete());
    }

    #[test]
    fn test_decode_ignores_other_events() {
        let text = r#"{"event":"connection_status","data":{"status":"connected"}}"#;
        assert!(decode_frame(text).is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_frame("not json").is_none());
        assert!(decode_frame("{}").is_none());
    }

    #[tokio::test]
    async fn test_run_exhausts_attempts_against_dead_endpoint() {
        // Nothing listens on this port; every attempt fails fast.
        let url = Url::parse("ws://127.0.0.1:1/socket").unwrap();
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            max_attempts: 2,
        };
        let manager = ConnectionManager::new(url, policy, Duration::from_millis(200));

        let (tx, mut rx) = mpsc::channel(32);
        let result = manager.run(tx).await;

        assert!(result.unwrap_err().is_connection_exhausted());

        let mut saw_failed = false;
        while let Some(event) = rx.recv().await {
            if let ClientEvent::StateChanged { state, .. } = event {
                if state == ConnectionState::Failed {
                    saw_failed = true;
                }
            }
        }
        assert!(saw_failed, "terminal failure must be observable");
    }
}
