//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Local, Utc};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use htsp_core::RecordingState;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Recording state label, colored by outcome when `color` is set.
pub fn paint_state(state: RecordingState, color: bool) -> String {
    let label = state.to_string();
    if !color {
        return label;
    }
    match state {
        RecordingState::Recording => label.red().bold().to_string(),
        RecordingState::Scheduled => label.cyan().to_string(),
        RecordingState::Completed => label.green().to_string(),
        _ => label.yellow().to_string(),
    }
}

/// `2024-05-01 20:15` in local time, or empty.
pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// `1h 05m`, or empty.
pub fn format_duration(duration: Option<chrono::Duration>) -> String {
    duration
        .filter(|d| *d >= chrono::Duration::zero())
        .map(|d| format!("{}h {:02}m", d.num_hours(), d.num_minutes() % 60))
        .unwrap_or_default()
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn`, since single-item detail
/// views don't use the `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Status line on stderr, suppressed by `--quiet`.
pub fn notice(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        id: u32,
        name: &'static str,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "Name")]
        name: String,
    }

    fn items() -> Vec<Item> {
        vec![Item { id: 1, name: "One" }, Item { id: 2, name: "Two" }]
    }

    fn render(format: &OutputFormat) -> String {
        render_list(
            format,
            &items(),
            |i| ItemRow {
                name: i.name.to_owned(),
            },
            |i| i.id.to_string(),
        )
        .unwrap()
    }

    #[test]
    fn plain_lists_identifiers() {
        assert_eq!(render(&OutputFormat::Plain), "1\n2");
    }

    #[test]
    fn compact_json_is_single_line() {
        assert_eq!(
            render(&OutputFormat::JsonCompact),
            r#"[{"id":1,"name":"One"},{"id":2,"name":"Two"}]"#
        );
    }

    #[test]
    fn table_has_header_and_rows() {
        let table = render(&OutputFormat::Table);
        assert!(table.contains("Name"));
        assert!(table.contains("Two"));
    }

    #[test]
    fn uncolored_state_is_plain_label() {
        assert_eq!(paint_state(RecordingState::Completed, false), "completed");
    }

    #[test]
    fn durations_render_hours_and_minutes() {
        assert_eq!(
            format_duration(Some(chrono::Duration::minutes(65))),
            "1h 05m"
        );
        assert_eq!(format_duration(None), "");
    }
}
