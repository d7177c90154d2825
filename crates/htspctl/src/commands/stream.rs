//! Stream URL handler.

use tokio_util::sync::CancellationToken;

use htsp_core::{HtspSession, StreamInfo};

use crate::cli::{GlobalOpts, StreamArgs, StreamCommand};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    session: &HtspSession,
    args: StreamArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let (info, what) = match args.command {
        StreamCommand::Channel { channel } => {
            let channels = session.channels(cancel).await;
            let channel = util::resolve_channel(&channels, &channel)?;
            (session.channel_stream(channel.id, cancel).await, "channel")
        }
        StreamCommand::Recording { id } => (session.recording_stream(id, cancel).await, "recording"),
    };

    // A missing ticket has already been logged by the session
    let info: StreamInfo = info.ok_or_else(|| CliError::Rejected {
        message: format!("the server did not issue a stream ticket for this {what}"),
    })?;
    let out = output::render_single(&global.output, &info, |i| i.url.to_string(), |i| i.url.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
