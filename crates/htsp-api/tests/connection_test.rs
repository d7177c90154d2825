#![allow(clippy::unwrap_used)]
// Integration tests for `HtspConnection` against an in-memory fake server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use htsp_api::connection::auth_digest;
use htsp_api::{ConnectOptions, Error, EventListener, HtsmsgCodec, HtspConnection, HtspMessage};

// ── Helpers ─────────────────────────────────────────────────────────

const CHALLENGE: &[u8] = b"0123456789abcdef0123456789abcdef";

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl EventListener for Recorder {
    fn on_event(&self, method: &str, _message: &HtspMessage) {
        self.events.lock().unwrap().push(method.to_owned());
    }

    fn on_error(&self, error: &Error) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

type ServerSide = Framed<DuplexStream, HtsmsgCodec>;

fn setup() -> (HtspConnection, ServerSide, Arc<Recorder>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let recorder = Arc::new(Recorder::default());
    let conn = HtspConnection::from_stream(
        client,
        ConnectOptions::new("fake", 9982),
        recorder.clone(),
    );
    (conn, Framed::new(server, HtsmsgCodec::new()), recorder)
}

fn reply_to(request: &HtspMessage) -> HtspMessage {
    HtspMessage::new().with("seq", request.seq().unwrap())
}

/// Answer `hello` and `authenticate` like a real server would.
async fn serve_handshake(server: &mut ServerSide, password: &str) {
    let hello = server.next().await.unwrap().unwrap();
    assert_eq!(hello.method_name(), Some("hello"));
    assert_eq!(hello.u32("htspversion"), Some(34));
    server
        .send(
            reply_to(&hello)
                .with("htspversion", 34_u32)
                .with("servername", "Tvheadend")
                .with("serverversion", "4.3-2000")
                .with("challenge", CHALLENGE.to_vec()),
        )
        .await
        .unwrap();

    let auth = server.next().await.unwrap().unwrap();
    assert_eq!(auth.method_name(), Some("authenticate"));
    let mut reply = reply_to(&auth);
    if auth.bin("digest") != Some(auth_digest(password, CHALLENGE).as_slice()) {
        reply.set("noaccess", 1_i64);
    }
    server.send(reply).await.unwrap();
}

// ── Handshake ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_hello_and_authenticate_success() {
    let (conn, mut server, _) = setup();
    let server_task = tokio::spawn(async move {
        serve_handshake(&mut server, "secret").await;
        server
    });

    let info = conn.hello().await.unwrap();
    assert_eq!(info.name, "Tvheadend");
    assert_eq!(info.protocol_version, 34);

    let ok = conn
        .authenticate("kodi", &SecretString::from("secret".to_string()))
        .await
        .unwrap();
    assert!(ok);
    assert!(conn.is_authenticated());
    assert_eq!(conn.server_info().unwrap().version, "4.3-2000");
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_authenticate_wrong_password_keeps_session_open() {
    let (conn, mut server, _) = setup();
    let server_task = tokio::spawn(async move {
        serve_handshake(&mut server, "secret").await;
        server
    });

    conn.hello().await.unwrap();
    let ok = conn
        .authenticate("kodi", &SecretString::from("wrong".to_string()))
        .await
        .unwrap();
    assert!(!ok);
    assert!(!conn.is_authenticated());
    assert!(!conn.needs_restart());
    let _server = server_task.await.unwrap();
}

#[tokio::test]
async fn test_authenticate_before_hello_is_protocol_error() {
    let (conn, _server, _) = setup();
    let result = conn
        .authenticate("kodi", &SecretString::from("secret".to_string()))
        .await;
    assert!(matches!(result, Err(Error::Protocol(_))));
}

#[tokio::test]
async fn test_enable_async_metadata_requires_auth() {
    let (conn, _server, _) = setup();
    assert!(matches!(
        conn.enable_async_metadata(false).await,
        Err(Error::NotAuthenticated)
    ));
}

// ── Correlation ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_out_of_order_replies_are_correlated() {
    let (conn, mut server, _) = setup();
    let server_task = tokio::spawn(async move {
        let first = server.next().await.unwrap().unwrap();
        let second = server.next().await.unwrap().unwrap();
        // answer in reverse order
        server
            .send(reply_to(&second).with("path", "/second"))
            .await
            .unwrap();
        server
            .send(reply_to(&first).with("path", "/first"))
            .await
            .unwrap();
        server
    });

    let (a, b) = tokio::join!(
        conn.request(HtspMessage::method("getTicket").with("channelId", 1_u32)),
        conn.request(HtspMessage::method("getTicket").with("channelId", 2_u32)),
    );
    let a = a.unwrap();
    let b = b.unwrap();
    assert_ne!(a.str("path"), b.str("path"));
    assert!(["/first", "/second"].contains(&a.str("path").unwrap()));
    let _server = server_task.await.unwrap();
}

#[tokio::test]
async fn test_server_error_becomes_request_failed() {
    let (conn, mut server, _) = setup();
    tokio::spawn(async move {
        let req = server.next().await.unwrap().unwrap();
        server
            .send(reply_to(&req).with("error", "Event does not exist"))
            .await
            .unwrap();
        server
    });

    let result = conn
        .request(HtspMessage::method("addDvrEntry").with("eventId", 99_u32))
        .await;
    match result {
        Err(Error::RequestFailed { method, message }) => {
            assert_eq!(method, "addDvrEntry");
            assert_eq!(message, "Event does not exist");
        }
        other => panic!("expected RequestFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_explicit_duplicate_seq_is_rejected() {
    let (conn, _server, _) = setup();
    let (tx1, _rx1) = tokio::sync::oneshot::channel();
    let (tx2, _rx2) = tokio::sync::oneshot::channel();
    conn.send_message(HtspMessage::method("getDiskSpace").with("seq", 500_u32), tx1)
        .await
        .unwrap();
    let second = conn
        .send_message(HtspMessage::method("getDiskSpace").with("seq", 500_u32), tx2)
        .await;
    assert!(matches!(second, Err(Error::DuplicateSequence { seq: 500 })));
}

#[tokio::test]
async fn test_dropped_request_releases_pending_entry() {
    let (conn, mut server, _) = setup();

    let result = tokio::time::timeout(
        Duration::from_millis(50),
        conn.request(HtspMessage::method("getDiskSpace")),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(conn.correlator().pending_count(), 0);

    // the exchange is still on the wire; its late reply is discarded
    let req = server.next().await.unwrap().unwrap();
    server.send(reply_to(&req)).await.unwrap();
    let (seen_tx, mut seen_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        let next = server.next().await.unwrap().unwrap();
        server.send(reply_to(&next)).await.unwrap();
        seen_tx.send(server).await.unwrap();
    });
    conn.request(HtspMessage::method("getDiskSpace")).await.unwrap();
    assert_eq!(conn.correlator().unclaimed_count(), 1);
    assert!(seen_rx.recv().await.is_some());
}

// ── Push events & failure ───────────────────────────────────────────

#[tokio::test]
async fn test_push_events_reach_listener_in_order() {
    let (conn, mut server, recorder) = setup();
    server
        .send(HtspMessage::method("channelAdd").with("channelId", 1_u32))
        .await
        .unwrap();
    server
        .send(HtspMessage::method("initialSyncCompleted"))
        .await
        .unwrap();

    // a request round-trip guarantees the earlier frames were dispatched
    let server_task = tokio::spawn(async move {
        let req = server.next().await.unwrap().unwrap();
        server
            .send(
                reply_to(&req)
                    .with("freediskspace", 10_i64)
                    .with("totaldiskspace", 20_i64),
            )
            .await
            .unwrap();
        server
    });
    let space = conn.disk_space().await.unwrap();
    assert_eq!(space.free_bytes, 10);
    assert_eq!(space.total_bytes, 20);

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["channelAdd".to_owned(), "initialSyncCompleted".to_owned()]
    );
    let _server = server_task.await.unwrap();
}

#[tokio::test]
async fn test_server_close_marks_restart_and_reports_error() {
    let (conn, server, recorder) = setup();
    let (tx, rx) = tokio::sync::oneshot::channel();
    conn.send_message(HtspMessage::method("getDiskSpace"), tx)
        .await
        .unwrap();

    drop(server);

    // pending waiters are released when the loop stops
    assert!(rx.await.is_err());
    assert!(conn.needs_restart());
    assert!(!recorder.errors.lock().unwrap().is_empty());
    assert!(matches!(
        conn.request(HtspMessage::method("getDiskSpace")).await,
        Err(Error::Closed)
    ));
}

#[tokio::test]
async fn test_close_stops_session_without_error_report() {
    let (conn, _server, recorder) = setup();
    conn.close();
    assert!(conn.needs_restart());
    tokio::task::yield_now().await;
    assert!(recorder.errors.lock().unwrap().is_empty());
}
