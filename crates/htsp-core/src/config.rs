// ── Runtime session configuration ──
//
// Describes *how* to reach one HTSP server. Carries credentials and
// timing knobs but never touches disk; the CLI builds a
// `SessionConfig` from its profile and hands it in.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::CoreError;

/// Default HTSP (binary protocol) port.
pub const DEFAULT_HTSP_PORT: u16 = 9982;
/// Default port of the server's HTTP interface, used for stream URLs.
pub const DEFAULT_HTTP_PORT: u16 = 9981;
/// Per-operation deadline.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Ceiling on the wait for the initial metadata sync.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Configuration for a session against a single server.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Host name or address of the server.
    pub host: String,
    pub htsp_port: u16,
    pub http_port: u16,
    /// Use `https` when building stream URLs.
    pub http_tls: bool,
    pub username: String,
    pub password: SecretString,
    /// Name announced in `hello`.
    pub client_name: String,
    pub operation_timeout: Duration,
    pub sync_timeout: Duration,
    pub connect_timeout: Duration,
    /// Streaming profile appended to stream URLs (`?profile=`).
    pub stream_profile: Option<String>,
    /// Priority sent with new timers when the request carries none.
    pub default_priority: Option<u32>,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password,
            ..Self::default()
        }
    }

    /// Reject configurations that can never produce a session.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.host.trim().is_empty() {
            return Err(CoreError::Config {
                message: "server host is not set".into(),
            });
        }
        if self.username.trim().is_empty() {
            return Err(CoreError::Config {
                message: "username is not set".into(),
            });
        }
        if self.htsp_port == 0 || self.http_port == 0 {
            return Err(CoreError::Config {
                message: "ports must be non-zero".into(),
            });
        }
        if self.operation_timeout.is_zero() || self.sync_timeout.is_zero() {
            return Err(CoreError::Config {
                message: "timeouts must be non-zero".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn connect_options(&self) -> htsp_api::ConnectOptions {
        let mut options = htsp_api::ConnectOptions::new(self.host.clone(), self.htsp_port);
        options.client_name.clone_from(&self.client_name);
        options.connect_timeout = self.connect_timeout;
        options
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            htsp_port: DEFAULT_HTSP_PORT,
            http_port: DEFAULT_HTTP_PORT,
            http_tls: false,
            username: String::new(),
            password: SecretString::from(String::new()),
            client_name: "htspctl".into(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            connect_timeout: Duration::from_secs(10),
            stream_profile: None,
            default_priority: None,
        }
    }
}
