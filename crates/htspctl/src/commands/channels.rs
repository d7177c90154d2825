//! Channel and tuner command handlers.

use std::fmt::Write as _;
use std::sync::Arc;

use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use htsp_core::{Channel, ChannelKind, HtspSession, TunerInput};

use crate::cli::{ChannelKindArg, ChannelsArgs, ChannelsCommand, GlobalOpts, TunersArgs, TunersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "#")]
    number: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Tuners")]
    tuners: String,
    #[tabled(rename = "CA")]
    encrypted: String,
}

impl From<&Arc<Channel>> for ChannelRow {
    fn from(c: &Arc<Channel>) -> Self {
        Self {
            id: c.id,
            number: c.display_number(),
            name: c.name.clone(),
            kind: c.kind().to_string(),
            tuners: c.tuner_names().join(", "),
            encrypted: if c.is_encrypted() { "yes".into() } else { String::new() },
        }
    }
}

#[derive(Tabled)]
struct TunerRow {
    #[tabled(rename = "Tuner")]
    name: String,
    #[tabled(rename = "Channels")]
    channels: usize,
    #[tabled(rename = "Service types")]
    service_types: String,
}

impl From<&Arc<TunerInput>> for TunerRow {
    fn from(t: &Arc<TunerInput>) -> Self {
        Self {
            name: t.name.clone(),
            channels: t.channel_count(),
            service_types: t.service_types.join(", "),
        }
    }
}

fn detail(c: &Arc<Channel>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:       {}", c.id);
    let _ = writeln!(out, "Number:   {}", c.display_number());
    let _ = writeln!(out, "Name:     {}", c.name);
    let _ = writeln!(out, "Kind:     {}", c.kind());
    if let Some(ref icon) = c.icon {
        let _ = writeln!(out, "Icon:     {icon}");
    }
    if let Some(event) = c.now_event_id {
        let _ = writeln!(out, "Now:      event {event}");
    }
    if let Some(event) = c.next_event_id {
        let _ = writeln!(out, "Next:     event {event}");
    }
    for service in &c.services {
        let ca = service
            .ca_name
            .as_deref()
            .map(|ca| format!(" [{ca}]"))
            .unwrap_or_default();
        let _ = writeln!(out, "Service:  {} ({}){ca}", service.name, service.service_type);
    }
    out.trim_end().to_owned()
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle(
    session: &HtspSession,
    args: ChannelsArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let channels = session.channels(cancel).await;
    match args.command {
        ChannelsCommand::List { list, kind } => {
            let wanted = kind.map(|k| match k {
                ChannelKindArg::Tv => ChannelKind::Tv,
                ChannelKindArg::Radio => ChannelKind::Radio,
            });
            let snap = util::apply_list_args(
                channels.into_iter().filter(|c| wanted.is_none_or(|k| c.kind() == k)),
                &list,
                |c| c.name.clone(),
            );
            let out = output::render_list(&global.output, &snap, |c| ChannelRow::from(c), |c| c.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ChannelsCommand::Get { channel } => {
            let channel = util::resolve_channel(&channels, &channel)?;
            let out = output::render_single(&global.output, &channel, detail, |c| c.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

pub async fn handle_tuners(
    session: &HtspSession,
    args: TunersArgs,
    global: &GlobalOpts,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    match args.command {
        TunersCommand::List => {
            let tuners = session.tuners(cancel).await;
            let out = output::render_list(&global.output, &tuners, |t| TunerRow::from(t), |t| t.name.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
