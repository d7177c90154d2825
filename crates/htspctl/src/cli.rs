//! Clap derive structures for the `htspctl` CLI.
//!
//! Defines the command tree, global flags, and the value parsers for
//! day masks and clock times.

use chrono::{DateTime, Utc, Weekday};
use clap::{Args, Parser, Subcommand, ValueEnum};

use htsp_core::Weekdays;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// htspctl -- query and schedule recordings on an HTSP television backend
#[derive(Debug, Parser)]
#[command(
    name = "htspctl",
    version,
    about = "Browse channels and manage recordings on an HTSP TV backend",
    long_about = "Talks the HTSP binary protocol to a TV backend server.\n\n\
        Every command connects, waits for the server's initial sync, and\n\
        then answers from the synchronized channel and recording caches.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "HTSP_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server host (overrides profile)
    #[arg(long, short = 'H', env = "HTSP_HOST", global = true)]
    pub host: Option<String>,

    /// HTSP port (overrides profile)
    #[arg(long, env = "HTSP_PORT", global = true)]
    pub port: Option<u16>,

    /// HTTP port used for stream URLs (overrides profile)
    #[arg(long, global = true)]
    pub http_port: Option<u16>,

    /// Account name
    #[arg(long, short = 'u', env = "HTSP_USERNAME", global = true)]
    pub username: Option<String>,

    /// Account password
    #[arg(long, env = "HTSP_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HTSP_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Per-operation timeout in seconds
    #[arg(long, env = "HTSP_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Ceiling on the initial sync in seconds
    #[arg(long, global = true)]
    pub sync_timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List channels
    #[command(alias = "ch")]
    Channels(ChannelsArgs),

    /// List tuner inputs derived from channel services
    Tuners(TunersArgs),

    /// Manage finished and in-progress recordings
    #[command(alias = "rec")]
    Recordings(RecordingsArgs),

    /// Manage one-off timers
    Timers(TimersArgs),

    /// Manage series timers (recurring recording rules)
    Series(SeriesArgs),

    /// Show the program guide of a channel
    #[command(alias = "epg")]
    Programs(ProgramsArgs),

    /// Print a playable URL for a channel or recording
    Stream(StreamArgs),

    /// Show server identity, disk space, and cache sizes
    Status,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared List Arguments ────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Case-insensitive substring to match against names and titles
    #[arg(long, short = 'f')]
    pub filter: Option<String>,

    /// Max rows to show
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CHANNELS & TUNERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ChannelsArgs {
    #[command(subcommand)]
    pub command: ChannelsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChannelsCommand {
    /// List channels in number order
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Only TV or radio channels
        #[arg(long)]
        kind: Option<ChannelKindArg>,
    },

    /// Show one channel
    Get {
        /// Channel ID or display number
        channel: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ChannelKindArg {
    Tv,
    Radio,
}

#[derive(Debug, Args)]
pub struct TunersArgs {
    #[command(subcommand)]
    pub command: TunersCommand,
}

#[derive(Debug, Subcommand)]
pub enum TunersCommand {
    /// List tuner inputs
    #[command(alias = "ls")]
    List,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RECORDINGS & TIMERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RecordingsArgs {
    #[command(subcommand)]
    pub command: RecordingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RecordingsCommand {
    /// List recordings, newest last
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Only recordings that failed or were missed
        #[arg(long)]
        failed: bool,
    },

    /// Stop an in-progress recording, keeping the file
    Stop {
        /// Recording ID
        id: u32,
    },

    /// Delete a recording and its file
    #[command(alias = "rm")]
    Delete {
        /// Recording ID
        id: u32,
    },
}

#[derive(Debug, Args)]
pub struct TimersArgs {
    #[command(subcommand)]
    pub command: TimersCommand,
}

#[derive(Debug, Subcommand)]
pub enum TimersCommand {
    /// List pending timers, soonest first
    #[command(alias = "ls")]
    List(ListArgs),

    /// Schedule a recording of a guide event or a time window
    Add(TimerAddArgs),

    /// Change a pending timer
    Update(TimerUpdateArgs),

    /// Cancel a pending timer
    #[command(alias = "rm")]
    Cancel {
        /// Timer ID
        id: u32,
    },
}

#[derive(Debug, Args)]
pub struct TimerAddArgs {
    /// Guide event to record
    #[arg(long, short = 'e', conflicts_with_all = ["channel", "start", "stop"])]
    pub event: Option<u32>,

    /// Channel ID for a manual timer
    #[arg(long, short = 'c', requires_all = ["start", "stop"])]
    pub channel: Option<u32>,

    /// Start time (RFC 3339, e.g. 2024-05-01T20:00:00Z)
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// Stop time (RFC 3339)
    #[arg(long)]
    pub stop: Option<DateTime<Utc>>,

    /// Title of the recording
    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[command(flatten)]
    pub options: TimerOptions,
}

#[derive(Debug, Args)]
pub struct TimerUpdateArgs {
    /// Timer ID
    pub id: u32,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    #[arg(long)]
    pub stop: Option<DateTime<Utc>>,

    #[command(flatten)]
    pub options: TimerOptions,
}

/// Padding, priority, and retention shared by timer commands.
#[derive(Debug, Args)]
pub struct TimerOptions {
    /// Minutes to start early
    #[arg(long)]
    pub start_extra: Option<i64>,

    /// Minutes to keep recording after the end
    #[arg(long)]
    pub stop_extra: Option<i64>,

    /// Scheduling priority (0 = important .. 4 = unimportant)
    #[arg(long)]
    pub priority: Option<u32>,

    /// Days to keep the recording
    #[arg(long)]
    pub retention: Option<u32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERIES TIMERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SeriesArgs {
    #[command(subcommand)]
    pub command: SeriesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SeriesCommand {
    /// List series timers
    #[command(alias = "ls")]
    List(ListArgs),

    /// Create a series timer matching a title
    Add(SeriesRuleArgs),

    /// Replace a series timer's settings
    Update {
        /// Series timer ID
        id: String,

        #[command(flatten)]
        rule: SeriesRuleArgs,
    },

    /// Remove a series timer
    #[command(alias = "rm")]
    Remove {
        /// Series timer ID
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct SeriesRuleArgs {
    /// Title to match against guide events
    pub title: String,

    /// Rule name shown in listings
    #[arg(long)]
    pub name: Option<String>,

    /// Restrict to one channel
    #[arg(long, short = 'c')]
    pub channel: Option<u32>,

    /// Days to record on: daily, weekdays, weekends, or a list like mon,wed,fri
    #[arg(long, value_parser = parse_weekdays)]
    pub days: Option<Weekdays>,

    /// Earliest start time of day (HH:MM)
    #[arg(long, value_parser = parse_time_of_day)]
    pub after: Option<u32>,

    /// Latest start time of day (HH:MM)
    #[arg(long, value_parser = parse_time_of_day)]
    pub before: Option<u32>,

    /// Minimum duration in minutes
    #[arg(long)]
    pub min_duration: Option<u32>,

    /// Maximum duration in minutes
    #[arg(long)]
    pub max_duration: Option<u32>,

    /// Duplicate detection mode (server-defined number)
    #[arg(long)]
    pub dup_detect: Option<u32>,

    /// Free-text comment
    #[arg(long)]
    pub comment: Option<String>,

    /// Create the rule disabled
    #[arg(long)]
    pub disabled: bool,

    #[command(flatten)]
    pub options: TimerOptions,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  GUIDE & STREAMS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ProgramsArgs {
    /// Channel ID or display number
    pub channel: String,

    /// Window start (RFC 3339, defaults to now)
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,

    /// Window length in hours
    #[arg(long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..=336))]
    pub hours: u32,
}

#[derive(Debug, Args)]
pub struct StreamArgs {
    #[command(subcommand)]
    pub command: StreamCommand,
}

#[derive(Debug, Subcommand)]
pub enum StreamCommand {
    /// Live stream of a channel
    Channel {
        /// Channel ID or display number
        channel: String,
    },

    /// Playback of a recording
    Recording {
        /// Recording ID
        id: u32,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG & COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or replace a profile
    Init(ConfigInitArgs),

    /// Display current configuration (secrets masked)
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active profile's password in the system keyring
    SetPassword {
        /// Password to store (prompted for when omitted)
        #[arg(long = "new-password", env = "HTSP_NEW_PASSWORD", hide_env_values = true)]
        secret: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Profile name
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Server host
    #[arg(long = "server")]
    pub server: String,

    /// HTSP port
    #[arg(long = "htsp-port", default_value = "9982")]
    pub htsp_port: u16,

    /// Account name
    #[arg(long = "user")]
    pub user: String,

    /// Environment variable holding the password
    #[arg(long)]
    pub password_env: Option<String>,

    /// Streaming profile for stream URLs
    #[arg(long)]
    pub stream_profile: Option<String>,

    /// Make this the default profile
    #[arg(long)]
    pub make_default: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

// ── Value parsers ────────────────────────────────────────────────────

/// `daily`, `weekdays`, `weekends`, or a comma list of day names.
pub fn parse_weekdays(s: &str) -> Result<Weekdays, String> {
    match s.to_ascii_lowercase().as_str() {
        "daily" | "all" => return Ok(Weekdays::ALL),
        "weekdays" => {
            return Ok(Weekdays::from_days(&[
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]));
        }
        "weekends" => return Ok(Weekdays::from_days(&[Weekday::Sat, Weekday::Sun])),
        _ => {}
    }
    let days = s
        .split(',')
        .map(|d| {
            d.trim()
                .parse::<Weekday>()
                .map_err(|_| format!("unknown day '{}'", d.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Weekdays::from_days(&days))
}

/// `HH:MM` to minutes after midnight.
pub fn parse_time_of_day(s: &str) -> Result<u32, String> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| format!("expected HH:MM, got '{s}'"))?;
    let h: u32 = h.parse().map_err(|_| format!("bad hour in '{s}'"))?;
    let m: u32 = m.parse().map_err(|_| format!("bad minute in '{s}'"))?;
    if h > 23 || m > 59 {
        return Err(format!("'{s}' is not a time of day"));
    }
    Ok(h * 60 + m)
}
