//! CLI configuration: thin wrapper around `htsp_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--host, --port, --username, --password, --timeout).

use std::time::Duration;

use htsp_core::SessionConfig;
use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use htsp_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `SessionConfig` from the config file, profile, and CLI overrides.
///
/// Flags win over profile values. Without a matching profile, `--host`
/// alone is enough to describe a server.
pub fn build_session_config(global: &GlobalOpts, cfg: &Config) -> Result<SessionConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);
    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.host.is_some() => Profile {
            htsp_port: htsp_core::config::DEFAULT_HTSP_PORT,
            http_port: htsp_core::config::DEFAULT_HTTP_PORT,
            ..Profile::default()
        },
        // Naming a profile that doesn't exist is an error in its own right
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound { name: profile_name });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    apply_overrides(&mut profile, global);
    let mut session = htsp_config::profile_to_session_config(&profile, &profile_name, &cfg.defaults)?;
    // A flag password beats env and keyring, which resolution checks first
    if let Some(ref password) = global.password {
        session.password = SecretString::from(password.clone());
    }
    if let Some(secs) = global.sync_timeout {
        session.sync_timeout = Duration::from_secs(secs);
    }
    session.validate()?;
    Ok(session)
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(port) = global.port {
        profile.htsp_port = port;
    }
    if let Some(port) = global.http_port {
        profile.http_port = port;
    }
    if global.username.is_some() {
        profile.username.clone_from(&global.username);
    }
    if global.password.is_some() {
        profile.password.clone_from(&global.password);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["htspctl"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_profile() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                host: "tvh.lan".into(),
                htsp_port: 9982,
                http_port: 9981,
                username: Some("kodi".into()),
                password: Some("from-file".into()),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn flags_override_profile() {
        let g = global(&[
            "--host",
            "10.1.1.1",
            "--port",
            "19982",
            "--password",
            "flag",
            "--timeout",
            "30",
        ]);
        let session = build_session_config(&g, &config_with_profile()).unwrap();
        assert_eq!(session.host, "10.1.1.1");
        assert_eq!(session.htsp_port, 19982);
        assert_eq!(session.username, "kodi");
        assert_eq!(session.password.expose_secret(), "flag");
        assert_eq!(session.operation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn host_flag_works_without_profile() {
        let g = global(&["--host", "tv", "--username", "u", "--password", "p"]);
        let session = build_session_config(&g, &Config::default()).unwrap();
        assert_eq!(session.host, "tv");
        assert_eq!(session.htsp_port, 9982);
    }

    #[test]
    fn missing_server_is_reported() {
        let g = global(&[]);
        assert!(matches!(
            build_session_config(&g, &Config::default()),
            Err(CliError::NoConfig { .. })
        ));
    }

    #[test]
    fn unknown_named_profile_is_reported() {
        let g = global(&["--profile", "attic"]);
        assert!(matches!(
            build_session_config(&g, &config_with_profile()),
            Err(CliError::ProfileNotFound { .. })
        ));
    }
}
