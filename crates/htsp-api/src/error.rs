use thiserror::Error;

/// Top-level error type for the `htsp-api` crate.
///
/// Covers every failure mode of the wire layer: transport, framing,
/// handshake, and server-reported request failures. `htsp-core` maps
/// these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// TCP connection could not be established.
    #[error("Cannot connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    /// I/O failure on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection is gone (receive loop stopped or writer closed).
    #[error("Connection closed")]
    Closed,

    /// Connect or request deadline elapsed.
    #[error("Timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Framing ─────────────────────────────────────────────────────
    /// Malformed frame or field on the wire.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Frame length exceeds the configured ceiling.
    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Well-formed message with unexpected content.
    #[error("Protocol error: {0}")]
    Protocol(String),

    // ── Correlation ─────────────────────────────────────────────────
    /// A request was registered with a sequence number that is still pending.
    #[error("Sequence number {seq} is already pending")]
    DuplicateSequence { seq: u32 },

    // ── Server-reported ─────────────────────────────────────────────
    /// The server answered with an `error` field.
    #[error("{method} failed: {message}")]
    RequestFailed { method: String, message: String },

    /// The server answered with `noaccess`.
    #[error("Access denied for {method}")]
    AccessDenied { method: String },

    /// A method requiring authentication was called before `authenticate`.
    #[error("Session is not authenticated")]
    NotAuthenticated,
}

impl Error {
    /// Returns `true` if the connection can no longer be used and the
    /// session must be rebuilt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Closed
                | Self::Codec(_)
                | Self::FrameTooLarge { .. }
                | Self::Protocol(_)
        )
    }

    /// Returns `true` if the server rejected the request on its merits.
    pub fn is_server_reported(&self) -> bool {
        matches!(self, Self::RequestFailed { .. } | Self::AccessDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(Error::Closed.is_fatal());
        assert!(Error::Codec("bad".into()).is_fatal());
        assert!(!Error::Timeout { timeout_secs: 5 }.is_fatal());
        assert!(
            !Error::RequestFailed {
                method: "addDvrEntry".into(),
                message: "nope".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn server_reported_classification() {
        assert!(Error::AccessDenied { method: "getTicket".into() }.is_server_reported());
        assert!(!Error::NotAuthenticated.is_server_reported());
    }
}
