// ── Core error types ──
//
// User-facing errors from htsp-core. Consumers never see frame-level
// failures directly; the `From<htsp_api::Error>` impl translates wire
// errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    /// Required settings are missing or malformed. Never retried.
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to server at {addr}: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Server disconnected")]
    Disconnected,

    /// The connection dropped while waiting for the initial sync. The
    /// next operation reconnects.
    #[error("Connection lost before the initial sync completed")]
    SyncInterrupted,

    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    // ── Operation errors ─────────────────────────────────────────────
    /// The server refused or failed a request and said why.
    #[error("{method} rejected by server: {message}")]
    RequestFailed { method: String, message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Configuration problems surface to the caller instead of being
    /// swallowed into an empty result.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

// ── Conversion from wire-layer errors ────────────────────────────────

impl From<htsp_api::Error> for CoreError {
    fn from(err: htsp_api::Error) -> Self {
        match err {
            htsp_api::Error::Connect { addr, reason } => CoreError::ConnectionFailed { addr, reason },
            htsp_api::Error::Io(e) => CoreError::ConnectionFailed {
                addr: String::new(),
                reason: e.to_string(),
            },
            htsp_api::Error::Closed => CoreError::Disconnected,
            htsp_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            htsp_api::Error::Codec(message) | htsp_api::Error::Protocol(message) => {
                CoreError::Protocol { message }
            }
            htsp_api::Error::FrameTooLarge { size, max } => CoreError::Protocol {
                message: format!("frame of {size} bytes exceeds {max}"),
            },
            htsp_api::Error::DuplicateSequence { seq } => {
                CoreError::Internal(format!("sequence number {seq} reused while pending"))
            }
            htsp_api::Error::RequestFailed { method, message } => {
                CoreError::RequestFailed { method, message }
            }
            htsp_api::Error::AccessDenied { method } => CoreError::AuthenticationFailed {
                message: format!("server denied access to {method}"),
            },
            htsp_api::Error::NotAuthenticated => CoreError::AuthenticationFailed {
                message: "session is not authenticated".into(),
            },
        }
    }
}
