//! Server status handler.

use std::fmt::Write as _;

use bytesize::ByteSize;
use tokio_util::sync::CancellationToken;

use htsp_core::{HtspSession, ServerStatus};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn detail(s: &ServerStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Server:      {} {}", s.server_name, s.server_version);
    let _ = writeln!(out, "Protocol:    v{}", s.protocol_version);
    if !s.capabilities.is_empty() {
        let _ = writeln!(out, "Features:    {}", s.capabilities.join(", "));
    }
    let _ = writeln!(
        out,
        "Disk:        {} free of {}",
        ByteSize(s.free_bytes),
        ByteSize(s.total_bytes)
    );
    let _ = writeln!(out, "Sync:        {}", s.sync_state);
    let _ = writeln!(out, "Channels:    {}", s.channel_count);
    let _ = writeln!(out, "Recordings:  {}", s.recording_count);
    let _ = writeln!(out, "Timers:      {}", s.timer_count);
    let _ = writeln!(out, "Series:      {}", s.series_count);
    for tuner in &s.tuners {
        let _ = writeln!(out, "Tuner:       {} ({} channels)", tuner.name, tuner.channel_count());
    }
    out.trim_end().to_owned()
}

pub async fn handle(session: &HtspSession, global: &GlobalOpts, cancel: &CancellationToken) -> Result<(), CliError> {
    let status = session.server_status(cancel).await.ok_or_else(|| CliError::Protocol {
        message: "server status unavailable".into(),
    })?;
    let out = output::render_single(&global.output, &status, detail, |s| s.server_name.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
