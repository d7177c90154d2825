//! Integration tests for the `htspctl` binary.
//!
//! Argument parsing, help, completions, and error handling run without a
//! server; the end-to-end cases talk to a small in-process HTSP server.
#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;

use assert_cmd::cargo::cargo_bin_cmd;
use futures_util::{SinkExt, StreamExt};
use predicates::prelude::*;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio_util::codec::Framed;

use htsp_api::{HtsmsgCodec, HtspMessage, Value};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `htspctl` binary with env isolation.
///
/// Clears all `HTSP_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn htspctl() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("htspctl");
    cmd.env("HOME", "/tmp/htspctl-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/htspctl-test-nonexistent")
        .env_remove("HTSP_PROFILE")
        .env_remove("HTSP_HOST")
        .env_remove("HTSP_PORT")
        .env_remove("HTSP_USERNAME")
        .env_remove("HTSP_PASSWORD")
        .env_remove("HTSP_OUTPUT")
        .env_remove("HTSP_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Minimal server: accepts any credentials, announces two channels and
/// one timer, then completes the initial sync.
fn start_server(rt: &Runtime) -> SocketAddr {
    let listener = rt.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
    let addr = listener.local_addr().unwrap();
    rt.spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(Framed::new(socket, HtsmsgCodec::new())));
        }
    });
    addr
}

async fn serve(mut framed: Framed<tokio::net::TcpStream, HtsmsgCodec>) {
    while let Some(Ok(request)) = framed.next().await {
        let mut reply = HtspMessage::new();
        if let Some(seq) = request.seq() {
            reply.set("seq", seq);
        }
        let mut pushes = Vec::new();
        match request.method_name() {
            Some("hello") => {
                reply.set("htspversion", 34_u32);
                reply.set("servername", "Test TVH");
                reply.set("serverversion", "4.3");
                reply.set("challenge", vec![7_u8; 32]);
            }
            Some("enableAsyncMetadata") => {
                pushes = vec![
                    channel(1, 101, "News 24", "DVB-T/Mux 1/News 24"),
                    channel(2, 102, "Radio One", "DVB-T/Mux 2/Radio One"),
                    HtspMessage::method("dvrEntryAdd")
                        .with("id", 10_u32)
                        .with("channel", 1_u32)
                        .with("start", 4_000_000_000_i64)
                        .with("stop", 4_000_003_600_i64)
                        .with("title", "Evening News")
                        .with("state", "scheduled"),
                    HtspMessage::method("initialSyncCompleted"),
                ];
            }
            Some("addDvrEntry") => {
                if request.contains("eventId") {
                    reply.set("success", 1_i64);
                    reply.set("id", 11_u32);
                } else {
                    reply.set("success", 0_i64);
                    reply.set("error", "Event does not exist");
                }
            }
            Some("getTicket") => {
                reply.set("path", "/stream/channelid/1");
                reply.set("ticket", "T123");
            }
            _ => {
                reply.set("success", 1_i64);
            }
        }
        if framed.send(reply).await.is_err() {
            return;
        }
        for push in pushes {
            if framed.send(push).await.is_err() {
                return;
            }
        }
    }
}

fn channel(id: u32, number: u32, name: &str, service: &str) -> HtspMessage {
    let service_type = if name.starts_with("Radio") { "Radio" } else { "HDTV" };
    HtspMessage::method("channelAdd")
        .with("channelId", id)
        .with("channelNumber", number)
        .with("channelName", name)
        .with(
            "services",
            vec![Value::from(
                HtspMessage::new()
                    .with("name", service)
                    .with("type", service_type),
            )],
        )
}

fn server_cmd(addr: SocketAddr) -> assert_cmd::Command {
    let mut cmd = htspctl();
    cmd.args([
        "--host",
        "127.0.0.1",
        "--port",
        &addr.port().to_string(),
        "--username",
        "kodi",
        "--password",
        "secret",
        "--timeout",
        "20",
        "--color",
        "never",
    ]);
    cmd
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = htspctl().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    htspctl().arg("--help").assert().success().stdout(
        predicate::str::contains("channels")
            .and(predicate::str::contains("recordings"))
            .and(predicate::str::contains("timers"))
            .and(predicate::str::contains("series")),
    );
}

#[test]
fn test_version_flag() {
    htspctl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("htspctl"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    htspctl()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    htspctl()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = htspctl().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_channels_without_server_config() {
    htspctl()
        .args(["channels", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No server configured"));
}

#[test]
fn test_config_show_no_config() {
    htspctl().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_init_then_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let isolated = |cmd: &mut assert_cmd::Command| {
        cmd.env("HOME", dir.path()).env("XDG_CONFIG_HOME", dir.path());
    };

    let mut init = htspctl();
    isolated(&mut init);
    init.args(["config", "init", "--name", "lab", "--server", "tvh.lan", "--user", "kodi"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Profile 'lab' written"));

    let mut profiles = htspctl();
    isolated(&mut profiles);
    profiles
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* lab\ttvh.lan:9982"));
}

#[test]
fn test_invalid_day_list_is_usage_error() {
    htspctl()
        .args(["series", "add", "News", "--days", "funday"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("funday"));
}

#[test]
fn test_unreachable_server_exit_code() {
    // Bind then drop to get a port with nothing listening
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    htspctl()
        .args([
            "--host",
            "127.0.0.1",
            "--port",
            &port.to_string(),
            "-u",
            "kodi",
            "--password",
            "x",
            "status",
        ])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Could not connect"));
}

// ── Against a live server ───────────────────────────────────────────

#[test]
fn test_channels_list_plain() {
    let rt = Runtime::new().unwrap();
    let addr = start_server(&rt);
    server_cmd(addr)
        .args(["--output", "plain", "channels", "list"])
        .assert()
        .success()
        .stdout("1\n2\n");
}

#[test]
fn test_channels_list_json_filters_radio() {
    let rt = Runtime::new().unwrap();
    let addr = start_server(&rt);
    let output = server_cmd(addr)
        .args(["-o", "json-compact", "channels", "list", "--kind", "radio"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Radio One"]);
}

#[test]
fn test_tuners_are_derived_from_services() {
    let rt = Runtime::new().unwrap();
    let addr = start_server(&rt);
    server_cmd(addr)
        .args(["-o", "plain", "tuners", "list"])
        .assert()
        .success()
        .stdout("DVB-T\n");
}

#[test]
fn test_timers_list_shows_channel_name() {
    let rt = Runtime::new().unwrap();
    let addr = start_server(&rt);
    server_cmd(addr)
        .args(["timers", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Evening News").and(predicate::str::contains("News 24")),
        );
}

#[test]
fn test_timer_add_reports_created_id() {
    let rt = Runtime::new().unwrap();
    let addr = start_server(&rt);
    server_cmd(addr)
        .args(["timers", "add", "--event", "500"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Timer created (id 11)"));
}

#[test]
fn test_rejected_timer_exit_code() {
    let rt = Runtime::new().unwrap();
    let addr = start_server(&rt);
    server_cmd(addr)
        .args([
            "timers",
            "add",
            "--channel",
            "1",
            "--start",
            "2030-01-01T20:00:00Z",
            "--stop",
            "2030-01-01T21:00:00Z",
        ])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("Event does not exist"));
}

#[test]
fn test_stream_url_carries_ticket() {
    let rt = Runtime::new().unwrap();
    let addr = start_server(&rt);
    server_cmd(addr)
        .args(["--http-port", "9981", "stream", "channel", "101"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "http://127.0.0.1:9981/stream/channelid/1?ticket=T123",
        ));
}
