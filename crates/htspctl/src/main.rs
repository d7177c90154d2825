mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::io::IsTerminal;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use htsp_core::{HtspSession, SyncState};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    // Ctrl-C cancels whatever operation is in flight
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if let Err(err) = run(cli, &cancel).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a server connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "htspctl", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = config::load_config_or_default();
            let session_config = config::build_session_config(&cli.global, &cfg)?;
            let session = HtspSession::new(session_config)?;

            connect_with_progress(&session, cli.global.quiet, cancel).await?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let outcome = commands::dispatch(cmd, &session, &cli.global, cancel).await;
            session.disconnect().await;
            outcome
        }
    }
}

/// Connect and wait for the initial sync, with a spinner on interactive
/// terminals.
async fn connect_with_progress(
    session: &HtspSession,
    quiet: bool,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    if quiet || !std::io::stderr().is_terminal() {
        return Ok(session.connect(cancel).await?);
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Connecting to {}", session.config().host));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut states = session.subscribe_state();
    let progress = spinner.clone();
    let watcher = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            if state == SyncState::SyncInProgress {
                progress.set_message("Waiting for initial sync");
            }
        }
    });

    let result = session.connect(cancel).await;
    watcher.abort();
    spinner.finish_and_clear();
    Ok(result?)
}
