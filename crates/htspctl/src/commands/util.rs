//! Shared helpers for command handlers.

use std::sync::Arc;

use htsp_core::{Channel, CommandResult};

use crate::cli::ListArgs;
use crate::error::CliError;
use crate::output;

/// Resolve a channel by ID, falling back to its display number.
pub fn resolve_channel(channels: &[Arc<Channel>], identifier: &str) -> Result<Arc<Channel>, CliError> {
    let by_id = identifier
        .parse::<u32>()
        .ok()
        .and_then(|id| channels.iter().find(|c| c.id == id));
    by_id
        .or_else(|| channels.iter().find(|c| c.display_number() == identifier))
        .cloned()
        .ok_or_else(|| CliError::NotFound {
            resource_type: "channel".into(),
            identifier: identifier.into(),
            list_command: "channels list".into(),
        })
}

/// Keep items whose text matches `--filter`, then cut to `--limit`.
pub fn apply_list_args<T>(items: impl IntoIterator<Item = T>, args: &ListArgs, text: impl Fn(&T) -> String) -> Vec<T> {
    let needle = args.filter.as_deref().map(str::to_lowercase);
    let filtered = items
        .into_iter()
        .filter(|item| needle.as_deref().is_none_or(|n| text(item).to_lowercase().contains(n)));
    match args.limit {
        Some(limit) => filtered.take(limit).collect(),
        None => filtered.collect(),
    }
}

/// Announce a completed command, with the new entity's id if any.
pub fn report(result: &CommandResult, what: &str, quiet: bool) {
    let message = match result {
        CommandResult::Created { id } => format!("{what} (id {id})"),
        CommandResult::Ok => what.to_owned(),
    };
    output::notice(&message, quiet);
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
