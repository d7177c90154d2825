// ── Command API ──
//
// Every write operation against the server is a `Command`. The session
// executes commands as supervised requests; its best-effort helpers
// (`create_timer`, `cancel_timer`, ...) wrap `execute` and only log
// failures.

pub mod requests;

use htsp_api::HtspMessage;

pub use requests::{SeriesTimerRequest, TimerRequest, UpdateTimerRequest};

/// All write operations against a server.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Timers & recordings ──────────────────────────────────────────
    CreateTimer(TimerRequest),
    UpdateTimer { id: u32, update: UpdateTimerRequest },
    /// Stop a pending or in-progress recording, keeping any file.
    CancelTimer { id: u32 },
    /// Remove a recording and its file.
    DeleteRecording { id: u32 },

    // ── Series timers ────────────────────────────────────────────────
    CreateSeriesTimer(SeriesTimerRequest),
    /// Replace a rule with `rule`.
    UpdateSeriesTimer { id: String, rule: SeriesTimerRequest },
    CancelSeriesTimer { id: String },
}

impl Command {
    /// Operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateTimer(_) => "create_timer",
            Self::UpdateTimer { .. } => "update_timer",
            Self::CancelTimer { .. } => "cancel_timer",
            Self::DeleteRecording { .. } => "delete_recording",
            Self::CreateSeriesTimer(_) => "create_series_timer",
            Self::UpdateSeriesTimer { .. } => "update_series_timer",
            Self::CancelSeriesTimer { .. } => "cancel_series_timer",
        }
    }
}

/// Outcome of a successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    /// The server created an entity with this identifier.
    Created { id: String },
}

impl CommandResult {
    /// Interpret an add/update/delete reply. `success: 0` without an
    /// error text still counts as a failure.
    pub(crate) fn from_reply(method: &str, reply: &HtspMessage) -> Result<Self, crate::CoreError> {
        if reply.bool("success") == Some(false) {
            return Err(crate::CoreError::RequestFailed {
                method: method.to_owned(),
                message: reply.error().unwrap_or("server reported failure").to_owned(),
            });
        }
        Ok(match reply.get("id") {
            Some(htsp_api::Value::Str(id)) => Self::Created { id: id.clone() },
            Some(value) => value
                .as_s64()
                .map_or(Self::Ok, |id| Self::Created { id: id.to_string() }),
            None => Self::Ok,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reply_with_numeric_id_is_created() {
        let reply = HtspMessage::new().with("success", 1_u32).with("id", 12_u32);
        assert_eq!(
            CommandResult::from_reply("addDvrEntry", &reply).unwrap(),
            CommandResult::Created { id: "12".into() }
        );
    }

    #[test]
    fn reply_with_string_id_is_created() {
        let reply = HtspMessage::new().with("success", 1_u32).with("id", "abc");
        assert_eq!(
            CommandResult::from_reply("addAutorecEntry", &reply).unwrap(),
            CommandResult::Created { id: "abc".into() }
        );
    }

    #[test]
    fn unsuccessful_reply_fails() {
        let reply = HtspMessage::new().with("success", 0_u32);
        let err = CommandResult::from_reply("deleteDvrEntry", &reply).unwrap_err();
        assert!(err.to_string().contains("server reported failure"));
    }

    #[test]
    fn bare_reply_is_ok() {
        assert_eq!(
            CommandResult::from_reply("cancelDvrEntry", &HtspMessage::new()).unwrap(),
            CommandResult::Ok
        );
    }
}
