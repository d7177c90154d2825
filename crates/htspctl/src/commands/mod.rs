//! Command dispatch: routes parsed CLI commands to their handlers.

pub mod channels;
pub mod config_cmd;
pub mod programs;
pub mod recordings;
pub mod series;
pub mod status;
pub mod stream;
pub mod util;

use tokio_util::sync::CancellationToken;

use htsp_core::HtspSession;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server command to its handler. The session is already
/// connected and synced.
pub async fn dispatch(
    cmd: Command,
    session: &HtspSession,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match cmd {
        Command::Channels(args) => channels::handle(session, args, global, cancel).await,
        Command::Tuners(args) => channels::handle_tuners(session, args, global, cancel).await,
        Command::Recordings(args) => recordings::handle_recordings(session, args, global, cancel).await,
        Command::Timers(args) => recordings::handle_timers(session, args, global, cancel).await,
        Command::Series(args) => series::handle(session, args, global, cancel).await,
        Command::Programs(args) => programs::handle(session, args, global, cancel).await,
        Command::Stream(args) => stream::handle(session, args, global, cancel).await,
        Command::Status => status::handle(session, global, cancel).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before connecting".into(),
        )),
    }
}
