//! Program guide handler.

use chrono::{Duration, Utc};
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use htsp_core::{HtspSession, Program};

use crate::cli::{GlobalOpts, ProgramsArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ProgramRow {
    #[tabled(rename = "Event")]
    event_id: u32,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Stop")]
    stop: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Episode")]
    episode: String,
    #[tabled(rename = "Timer")]
    timer: String,
}

impl From<&Program> for ProgramRow {
    fn from(p: &Program) -> Self {
        let episode = match (p.season_number, p.episode_number) {
            (Some(s), Some(e)) => format!("S{s:02}E{e:02}"),
            (None, Some(e)) => format!("E{e:02}"),
            _ => p.subtitle.clone().unwrap_or_default(),
        };
        Self {
            event_id: p.event_id,
            start: output::format_time(p.start),
            stop: output::format_time(p.stop),
            title: p.title.clone().unwrap_or_default(),
            episode,
            timer: p.dvr_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

pub async fn handle(
    session: &HtspSession,
    args: ProgramsArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let channels = session.channels(cancel).await;
    let channel = util::resolve_channel(&channels, &args.channel)?;

    let from = args.from.unwrap_or_else(Utc::now);
    let to = from + Duration::hours(i64::from(args.hours));
    let programs = session.programs(channel.id, from, to, cancel).await;

    let out = output::render_list(&global.output, &programs, |p| ProgramRow::from(p), |p| {
        p.event_id.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
