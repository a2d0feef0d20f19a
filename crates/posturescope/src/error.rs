//! Error types for posturescope.
//!
//! This module defines all error types used throughout the posturescope
//! crate, providing detailed context for debugging and user-friendly error
//! messages.

use thiserror::Error;

/// The main error type for posturescope operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Connection Errors ===
    /// The WebSocket connection could not be established.
    #[error("failed to connect to {url}: {message}")]
    Connect {
        /// The endpoint that was dialed.
        url: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The connect attempt exceeded the configured timeout.
    #[error("connection to {url} timed out after {seconds}s")]
    ConnectTimeout {
        /// The endpoint that was dialed.
        url: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// All reconnection attempts were exhausted.
    #[error("connection failed after {attempts} attempts; reload required")]
    ConnectionExhausted {
        /// How many attempts were made.
        attempts: u32,
    },

    /// A WebSocket transport error occurred mid-stream.
    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    // === Request Errors ===
    /// An HTTP request failed at the transport level.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status} for {operation}")]
    Api {
        /// The operation being performed.
        operation: &'static str,
        /// The HTTP status code.
        status: u16,
    },

    /// The server rejected a measurement save.
    #[error("measurement save rejected: {message}")]
    SaveRejected {
        /// The server-supplied reason.
        message: String,
    },

    /// A save was requested while another save is still in flight.
    #[error("a save is already in flight")]
    SaveInFlight,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A URL in the configuration could not be parsed.
    #[error("invalid url '{url}': {message}")]
    InvalidUrl {
        /// The offending value.
        url: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Workflow Errors ===
    /// A capture workflow transition was requested from the wrong state.
    #[error("invalid capture transition: {message}")]
    CaptureTransition {
        /// Description of the rejected transition.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for posturescope operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl Error {
    /// Create a new connect error.
    #[must_use]
    pub fn connect(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new save-rejected error.
    #[must_use]
    pub fn save_rejected(message: impl Into<String>) -> Self {
        Self::SaveRejected {
            message: message.into(),
        }
    }

    /// Create an API status error for the named operation.
    #[must_use]
    pub fn api(operation: &'static str, status: u16) -> Self {
        Self::Api { operation, status }
    }

    /// Check if this error means the connection gave up for good.
    #[must_use]
    pub fn is_connection_exhausted(&self) -> bool {
        matches!(self, Self::ConnectionExhausted { .. })
    }

    /// Check if this error is the in-flight save guard.
    #[must_use]
    pub fn is_save_in_flight(&self) -> bool {
        matches!(self, Self::SaveInFlight)
    }
}
