//! Recording and timer command handlers.

use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use htsp_core::{
    Command as CoreCommand, HtspSession, RecordingView, TimerRequest, UpdateTimerRequest,
};

use crate::cli::{
    GlobalOpts, RecordingsArgs, RecordingsCommand, TimerAddArgs, TimerOptions, TimerUpdateArgs, TimersArgs,
    TimersCommand,
};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RecordingRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Length")]
    length: String,
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Size")]
    size: String,
}

impl RecordingRow {
    fn new(view: &RecordingView, color: bool) -> Self {
        let r = &view.recording;
        let mut state = output::paint_state(r.state, color);
        if let Some(ref error) = r.error {
            state = format!("{state} ({error})");
        }
        Self {
            id: r.id,
            start: output::format_time(r.start),
            length: output::format_duration(r.duration()),
            channel: view.channel_name.clone().unwrap_or_default(),
            title: r.display_title().to_owned(),
            state,
            size: r
                .data_size
                .map(|b| bytesize::ByteSize(b).to_string())
                .unwrap_or_default(),
        }
    }
}

fn title_text(view: &RecordingView) -> String {
    let r = &view.recording;
    format!(
        "{} {} {}",
        r.display_title(),
        r.subtitle.as_deref().unwrap_or_default(),
        view.channel_name.as_deref().unwrap_or_default()
    )
}

fn render_views(views: &[RecordingView], global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        views,
        |v| RecordingRow::new(v, color),
        |v| v.recording.id.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Request builders ────────────────────────────────────────────────

fn timer_request(args: TimerAddArgs) -> Result<TimerRequest, CliError> {
    let base = match (args.event, args.channel, args.start, args.stop) {
        (Some(event), ..) => TimerRequest::for_event(event),
        (None, Some(channel), Some(start), Some(stop)) => {
            TimerRequest::manual(channel, start, stop, args.title.clone().unwrap_or_default())
        }
        _ => {
            return Err(CliError::Validation {
                field: "timer".into(),
                reason: "pass --event, or --channel with --start and --stop".into(),
            });
        }
    };
    let TimerOptions {
        start_extra,
        stop_extra,
        priority,
        retention,
    } = args.options;
    Ok(TimerRequest {
        title: args.title.or(base.title.clone()).filter(|t| !t.is_empty()),
        start_extra,
        stop_extra,
        priority,
        retention,
        ..base
    })
}

fn timer_update(args: TimerUpdateArgs) -> UpdateTimerRequest {
    UpdateTimerRequest {
        title: args.title,
        start: args.start,
        stop: args.stop,
        start_extra: args.options.start_extra,
        stop_extra: args.options.stop_extra,
        priority: args.options.priority,
        retention: args.options.retention,
        ..UpdateTimerRequest::default()
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_recordings(
    session: &HtspSession,
    args: RecordingsArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match args.command {
        RecordingsCommand::List { list, failed } => {
            let all = session.recordings(cancel).await;
            let views = util::apply_list_args(
                all.into_iter().filter(|v| !failed || v.recording.is_failed()),
                &list,
                title_text,
            );
            render_views(&views, global)
        }

        RecordingsCommand::Stop { id } => {
            let result = session.execute(CoreCommand::CancelTimer { id }, cancel).await?;
            util::report(&result, "Recording stopped", global.quiet);
            Ok(())
        }

        RecordingsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete recording {id} and its file?"), global.yes)? {
                return Ok(());
            }
            let result = session
                .execute(CoreCommand::DeleteRecording { id }, cancel)
                .await?;
            util::report(&result, "Recording deleted", global.quiet);
            Ok(())
        }
    }
}

pub async fn handle_timers(
    session: &HtspSession,
    args: TimersArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match args.command {
        TimersCommand::List(list) => {
            let all = session.timers(cancel).await;
            let views = util::apply_list_args(all, &list, title_text);
            render_views(&views, global)
        }

        TimersCommand::Add(add) => {
            let request = timer_request(add)?;
            let result = session.execute(CoreCommand::CreateTimer(request), cancel).await?;
            util::report(&result, "Timer created", global.quiet);
            Ok(())
        }

        TimersCommand::Update(update) => {
            let id = update.id;
            let result = session
                .execute(
                    CoreCommand::UpdateTimer {
                        id,
                        update: timer_update(update),
                    },
                    cancel,
                )
                .await?;
            util::report(&result, "Timer updated", global.quiet);
            Ok(())
        }

        TimersCommand::Cancel { id } => {
            let result = session.execute(CoreCommand::CancelTimer { id }, cancel).await?;
            util::report(&result, "Timer cancelled", global.quiet);
            Ok(())
        }
    }
}
