//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use htsp_config::ConfigError;
use htsp_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to server at {addr}")]
    #[diagnostic(
        code(htspctl::connection_failed),
        help(
            "Check that the server is running and its HTSP port is reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { addr: String, reason: String },

    #[error("Server closed the connection")]
    #[diagnostic(code(htspctl::disconnected))]
    Disconnected,

    #[error("Connection lost before the initial sync completed")]
    #[diagnostic(
        code(htspctl::sync_interrupted),
        help("The server dropped the session mid-sync. Run the command again to reconnect.")
    )]
    SyncInterrupted,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(htspctl::auth_failed),
        help(
            "Verify the username and password.\n\
             Run: htspctl config set-password --new-password <PASSWORD>"
        )
    )]
    AuthFailed,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(htspctl::no_credentials),
        help(
            "Pass --username and --password, set HTSP_USERNAME / HTSP_PASSWORD,\n\
             or store a password with: htspctl config set-password"
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(htspctl::not_found),
        help("Run: htspctl {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{message}")]
    #[diagnostic(code(htspctl::rejected))]
    Rejected { message: String },

    #[error("Protocol error: {message}")]
    #[diagnostic(code(htspctl::protocol))]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(htspctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(htspctl::profile_not_found),
        help("Create one with: htspctl config init --name {name} --server <HOST> --user <USER>")
    )]
    ProfileNotFound { name: String },

    #[error("No server configured")]
    #[diagnostic(
        code(htspctl::no_config),
        help(
            "Create a profile with: htspctl config init --server <HOST> --user <USER>\n\
             or pass --host. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(htspctl::config))]
    Config(Box<ConfigError>),

    // ── Timeout / interruption ───────────────────────────────────────
    #[error("Timed out after {seconds}s")]
    #[diagnostic(
        code(htspctl::timeout),
        help("Increase the limit with --timeout or --sync-timeout, or check server load.")
    )]
    Timeout { seconds: u64 },

    #[error("Interrupted")]
    #[diagnostic(code(htspctl::interrupted))]
    Interrupted,

    #[error("Internal error: {0}")]
    #[diagnostic(code(htspctl::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(htspctl::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    #[diagnostic(code(htspctl::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected | Self::SyncInterrupted => {
                exit_code::CONNECTION
            }
            Self::AuthFailed | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            Self::Interrupted => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound { name },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { addr, reason } => Self::ConnectionFailed { addr, reason },
            CoreError::AuthenticationFailed { .. } => Self::AuthFailed,
            CoreError::Disconnected => Self::Disconnected,
            CoreError::SyncInterrupted => Self::SyncInterrupted,
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::Cancelled => Self::Interrupted,
            err @ CoreError::RequestFailed { .. } => Self::Rejected {
                message: err.to_string(),
            },
            CoreError::Protocol { message } => Self::Protocol { message },
            CoreError::ValidationFailed { message } => Self::Validation {
                field: "request".into(),
                reason: message,
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}
