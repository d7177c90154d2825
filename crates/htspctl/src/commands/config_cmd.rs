//! Config subcommand handlers. None of these touch the network.

use std::fmt::Write as _;

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "sync_timeout = {}", cfg.defaults.sync_timeout);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "host = \"{}\"", p.host);
        let _ = writeln!(out, "htsp_port = {}", p.htsp_port);
        let _ = writeln!(out, "http_port = {}", p.http_port);
        if p.https {
            let _ = writeln!(out, "https = true");
        }
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref sp) = p.stream_profile {
            let _ = writeln!(out, "stream_profile = \"{sp}\"");
        }
        if let Some(priority) = p.priority {
            let _ = writeln!(out, "priority = {priority}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out
}

fn init_profile(cfg: &mut Config, args: ConfigInitArgs) {
    let profile = Profile {
        host: args.server,
        htsp_port: args.htsp_port,
        http_port: htsp_core::config::DEFAULT_HTTP_PORT,
        username: Some(args.user),
        password_env: args.password_env,
        stream_profile: args.stream_profile,
        ..Profile::default()
    };
    if args.make_default || cfg.profiles.is_empty() {
        cfg.default_profile = Some(args.name.clone());
    }
    cfg.profiles.insert(args.name, profile);
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init(init) => {
            let mut cfg = config::load_config_or_default();
            let name = init.name.clone();
            init_profile(&mut cfg, init);
            let path = config::save_config(&cfg)?;
            output::notice(
                &format!("Profile '{name}' written to {}", path.display()),
                global.quiet,
            );
            output::notice(
                "Store its password with: htspctl config set-password",
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            output::print_output(&format_config_redacted(&cfg), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let active = config::active_profile_name(global, &cfg);
            let lines: Vec<String> = cfg
                .profiles
                .iter()
                .map(|(name, p)| {
                    let marker = if *name == active { "*" } else { " " };
                    format!("{marker} {name}\t{}:{}", p.host, p.htsp_port)
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound { name });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::notice(&format!("Default profile set to '{name}'"), global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { secret } => {
            let cfg = config::load_config_or_default();
            let profile = config::active_profile_name(global, &cfg);
            let secret = match secret {
                Some(secret) => secret,
                None => rpassword::prompt_password(format!("Password for '{profile}': "))?,
            };
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            htsp_config::store_password(&profile, &secret)?;
            output::notice(&format!("Password stored in keyring for '{profile}'"), global.quiet);
            Ok(())
        }
    }
}
