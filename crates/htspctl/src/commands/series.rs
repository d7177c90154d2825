//! Series timer command handlers.

use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use htsp_core::{Command as CoreCommand, HtspSession, SeriesRuleView, SeriesTimerRequest};

use crate::cli::{GlobalOpts, SeriesArgs, SeriesCommand, SeriesRuleArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct SeriesRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Title match")]
    title: String,
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Days")]
    days: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

fn clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

impl From<&SeriesRuleView> for SeriesRow {
    fn from(view: &SeriesRuleView) -> Self {
        let rule = &view.rule;
        let window = match (rule.start, rule.start_window) {
            (Some(from), Some(to)) => format!("{}-{}", clock(from), clock(to)),
            (Some(from), None) => format!("after {}", clock(from)),
            (None, Some(to)) => format!("before {}", clock(to)),
            (None, None) => "any".into(),
        };
        Self {
            id: rule.id.clone(),
            name: rule.display_name().to_owned(),
            title: rule.title.clone().unwrap_or_default(),
            channel: view.channel_name.clone().unwrap_or_else(|| "any".into()),
            days: rule.days_of_week.to_string(),
            window,
            enabled: if rule.enabled { "yes".into() } else { "no".into() },
        }
    }
}

/// Build a full rule from flags. Durations are given in minutes.
fn series_request(args: SeriesRuleArgs) -> SeriesTimerRequest {
    SeriesTimerRequest {
        name: args.name,
        channel_id: args.channel,
        days_of_week: args.days,
        start: args.after,
        start_window: args.before,
        min_duration: args.min_duration.map(|m| m.saturating_mul(60)),
        max_duration: args.max_duration.map(|m| m.saturating_mul(60)),
        priority: args.options.priority,
        retention: args.options.retention,
        start_extra: args.options.start_extra,
        stop_extra: args.options.stop_extra,
        dup_detect: args.dup_detect,
        comment: args.comment,
        enabled: Some(!args.disabled),
        ..SeriesTimerRequest::new(args.title)
    }
}

pub async fn handle(
    session: &HtspSession,
    args: SeriesArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match args.command {
        SeriesCommand::List(list) => {
            let all = session.series_timers(cancel).await;
            let views = util::apply_list_args(all, &list, |v| {
                format!("{} {}", v.rule.display_name(), v.rule.title.as_deref().unwrap_or_default())
            });
            let out = output::render_list(&global.output, &views, |v| SeriesRow::from(v), |v| v.rule.id.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SeriesCommand::Add(rule) => {
            let result = session
                .execute(CoreCommand::CreateSeriesTimer(series_request(rule)), cancel)
                .await?;
            util::report(&result, "Series timer created", global.quiet);
            Ok(())
        }

        SeriesCommand::Update { id, rule } => {
            let result = session
                .execute(
                    CoreCommand::UpdateSeriesTimer {
                        id,
                        rule: series_request(rule),
                    },
                    cancel,
                )
                .await?;
            util::report(&result, "Series timer updated", global.quiet);
            Ok(())
        }

        SeriesCommand::Remove { id } => {
            if !util::confirm(&format!("Remove series timer {id}?"), global.yes)? {
                return Ok(());
            }
            let result = session
                .execute(CoreCommand::CancelSeriesTimer { id }, cancel)
                .await?;
            util::report(&result, "Series timer removed", global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    #[test]
    fn flags_become_rule_with_seconds() {
        let cli = Cli::try_parse_from([
            "htspctl",
            "series",
            "add",
            "News",
            "--days",
            "weekdays",
            "--after",
            "19:30",
            "--min-duration",
            "20",
        ])
        .unwrap();
        let Command::Series(SeriesArgs {
            command: SeriesCommand::Add(rule),
        }) = cli.command
        else {
            panic!("expected series add");
        };
        let request = series_request(rule);
        assert_eq!(request.title, "News");
        assert_eq!(request.start, Some(19 * 60 + 30));
        assert_eq!(request.min_duration, Some(1200));
        assert_eq!(request.days_of_week.unwrap().0, 0x1f);
        assert_eq!(request.enabled, Some(true));
    }

    #[test]
    fn window_column_reads_naturally() {
        assert_eq!(clock(20 * 60 + 5), "20:05");
    }
}
