//! HTSP connection session.
//!
//! Owns one duplex byte stream. Outgoing messages are serialised through
//! an `mpsc` writer task; a single receive task decodes frames and routes
//! them through the [`Correlator`]. Once either task fails the connection
//! reports [`needs_restart`](HtspConnection::needs_restart) and is never
//! repaired in place: callers drop it and open a new one.
//!
//! ```rust,ignore
//! let conn = HtspConnection::open(&ConnectOptions::new("tvh.lan", 9982), listener).await?;
//! conn.hello().await?;
//! if conn.authenticate("kodi", &password).await? {
//!     conn.enable_async_metadata(false).await?;
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::codec::{DEFAULT_MAX_FRAME, HtsmsgCodec};
use crate::correlator::{Correlator, EventListener, ResponseHandler};
use crate::error::Error;
use crate::message::{HtspMessage, SEQ_FIELD, Value};

const WRITE_QUEUE: usize = 64;

/// Protocol version this client speaks.
pub const HTSP_VERSION: u32 = 34;

// ── Options ──────────────────────────────────────────────────────────

/// Where and how to open a connection.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    /// Reported to the server in `hello`.
    pub client_name: String,
    pub client_version: String,
    pub htsp_version: u32,
    pub connect_timeout: Duration,
    pub max_frame: usize,
}

impl ConnectOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_name: env!("CARGO_PKG_NAME").into(),
            client_version: env!("CARGO_PKG_VERSION").into(),
            htsp_version: HTSP_VERSION,
            connect_timeout: Duration::from_secs(10),
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Server identity ──────────────────────────────────────────────────

/// Identity reported by the server in its `hello` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: u32,
    pub capabilities: Vec<String>,
    pub webroot: Option<String>,
}

impl ServerInfo {
    fn from_hello(reply: &HtspMessage) -> Result<Self, Error> {
        let protocol_version = reply
            .u32("htspversion")
            .ok_or_else(|| Error::Protocol("hello reply without htspversion".into()))?;
        Ok(Self {
            name: reply.str("servername").unwrap_or_default().to_owned(),
            version: reply.str("serverversion").unwrap_or_default().to_owned(),
            protocol_version,
            capabilities: reply
                .list("servercapability")
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            webroot: reply.str("webroot").map(str::to_owned),
        })
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c == name)
    }
}

/// Recording storage reported by `getDiskSpace`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskSpace {
    pub free_bytes: u64,
    pub total_bytes: u64,
}

// ── Link state ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct LinkState {
    connected: AtomicBool,
    authenticated: AtomicBool,
    failed: AtomicBool,
}

impl LinkState {
    fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Removes the pending entry if the request future is dropped early.
struct PendingGuard<'a> {
    correlator: &'a Correlator,
    seq: u32,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.correlator.abandon(self.seq);
    }
}

// ── HtspConnection ───────────────────────────────────────────────────

/// One live HTSP session over one byte stream.
pub struct HtspConnection {
    options: ConnectOptions,
    correlator: Arc<Correlator>,
    writer: mpsc::Sender<HtspMessage>,
    state: Arc<LinkState>,
    server: ArcSwapOption<ServerInfo>,
    challenge: ArcSwapOption<Bytes>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl HtspConnection {
    /// Open a TCP connection and start the writer and receive tasks.
    pub async fn open(
        options: &ConnectOptions,
        listener: Arc<dyn EventListener>,
    ) -> Result<Self, Error> {
        let addr = options.addr();
        info!(%addr, "connecting to HTSP server");

        let stream = tokio::time::timeout(options.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::Connect {
                addr: addr.clone(),
                reason: format!("timed out after {}s", options.connect_timeout.as_secs()),
            })?
            .map_err(|e| Error::Connect {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;

        Ok(Self::from_stream(stream, options.clone(), listener))
    }

    /// Run a session over an already-connected stream.
    pub fn from_stream<S>(stream: S, options: ConnectOptions, listener: Arc<dyn EventListener>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let framed = Framed::new(stream, HtsmsgCodec::with_max_frame(options.max_frame));
        let (sink, source) = framed.split();
        let (writer, writer_rx) = mpsc::channel(WRITE_QUEUE);

        let correlator = Arc::new(Correlator::new(listener));
        let state = Arc::new(LinkState::default());
        state.connected.store(true, Ordering::SeqCst);
        let cancel = CancellationToken::new();

        let tasks = vec![
            tokio::spawn(write_loop(sink, writer_rx, Arc::clone(&state), cancel.clone())),
            tokio::spawn(receive_loop(
                source,
                Arc::clone(&correlator),
                Arc::clone(&state),
                cancel.clone(),
            )),
        ];

        Self {
            options,
            correlator,
            writer,
            state,
            server: ArcSwapOption::empty(),
            challenge: ArcSwapOption::empty(),
            cancel,
            tasks,
        }
    }

    // ── Health ───────────────────────────────────────────────────────

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.authenticated.load(Ordering::SeqCst)
    }

    /// `true` once no send or receive can succeed any more.
    pub fn needs_restart(&self) -> bool {
        self.state.failed.load(Ordering::SeqCst) || !self.is_connected()
    }

    /// Server identity from the last successful `hello`.
    pub fn server_info(&self) -> Option<Arc<ServerInfo>> {
        self.server.load_full()
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Transmit `message` and register `handler` for its reply.
    ///
    /// A `seq` is allocated unless the message already carries one; an
    /// explicit `seq` that is still pending is rejected. Returns the key
    /// the reply will be matched on.
    pub async fn send_message(
        &self,
        mut message: HtspMessage,
        handler: ResponseHandler,
    ) -> Result<u32, Error> {
        let seq = self.stamp(&mut message);
        self.correlator.register(seq, handler)?;
        if let Err(e) = self.transmit(message).await {
            self.correlator.abandon(seq);
            return Err(e);
        }
        Ok(seq)
    }

    /// Send a request and wait for its correlated reply.
    ///
    /// Server-side `error` and `noaccess` replies become errors. Dropping
    /// the returned future forgets the pending entry; a late reply is then
    /// discarded by the correlator.
    pub async fn request(&self, mut message: HtspMessage) -> Result<HtspMessage, Error> {
        let method = message.method_name().unwrap_or("<none>").to_owned();
        let seq = self.stamp(&mut message);

        let (tx, rx) = oneshot::channel();
        self.correlator.register(seq, tx)?;
        let _guard = PendingGuard {
            correlator: &self.correlator,
            seq,
        };

        debug!(%method, seq, "sending request");
        self.transmit(message).await?;
        let reply = rx.await.map_err(|_| Error::Closed)?;
        check_reply(&method, reply)
    }

    /// Protocol negotiation. Records server identity and the auth challenge.
    pub async fn hello(&self) -> Result<Arc<ServerInfo>, Error> {
        let reply = self
            .request(
                HtspMessage::method("hello")
                    .with("htspversion", self.options.htsp_version)
                    .with("clientname", self.options.client_name.as_str())
                    .with("clientversion", self.options.client_version.as_str()),
            )
            .await?;

        let info = Arc::new(ServerInfo::from_hello(&reply)?);
        let challenge = reply.bin("challenge").map(Bytes::copy_from_slice);
        self.challenge.store(challenge.map(Arc::new));
        self.server.store(Some(Arc::clone(&info)));

        info!(
            server = %info.name,
            version = %info.version,
            protocol = info.protocol_version,
            "HTSP hello complete"
        );
        Ok(info)
    }

    /// Credential handshake. `Ok(false)` means the server refused the
    /// credentials; the connection stays open but unauthenticated.
    pub async fn authenticate(&self, username: &str, password: &SecretString) -> Result<bool, Error> {
        let challenge = self
            .challenge
            .load_full()
            .ok_or_else(|| Error::Protocol("authenticate called before hello".into()))?;
        let digest = auth_digest(password.expose_secret(), &challenge);

        let msg = HtspMessage::method("authenticate")
            .with("username", username)
            .with("digest", digest);

        match self.request(msg).await {
            Ok(_) => {
                self.state.authenticated.store(true, Ordering::SeqCst);
                debug!(username, "authenticated");
                Ok(true)
            }
            Err(Error::AccessDenied { .. }) => {
                warn!(username, "server rejected credentials");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Ask the server to start pushing entity changes, beginning with the
    /// full initial replay terminated by `initialSyncCompleted`.
    pub async fn enable_async_metadata(&self, epg: bool) -> Result<(), Error> {
        if !self.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }
        let msg = HtspMessage::method("enableAsyncMetadata").with_opt("epg", epg.then_some(1_i64));
        self.request(msg).await?;
        Ok(())
    }

    pub async fn disk_space(&self) -> Result<DiskSpace, Error> {
        let reply = self.request(HtspMessage::method("getDiskSpace")).await?;
        let read = |name: &str| {
            reply
                .s64(name)
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(0)
        };
        Ok(DiskSpace {
            free_bytes: read("freediskspace"),
            total_bytes: read("totaldiskspace"),
        })
    }

    /// Stop both tasks and abandon every pending request.
    pub fn close(&self) {
        self.cancel.cancel();
        self.state.connected.store(false, Ordering::SeqCst);
        self.correlator.clear();
    }

    // ── Internals ────────────────────────────────────────────────────

    fn stamp(&self, message: &mut HtspMessage) -> u32 {
        if let Some(seq) = message.seq() {
            return seq;
        }
        let seq = self.correlator.next_seq();
        message.set(SEQ_FIELD, seq);
        seq
    }

    async fn transmit(&self, message: HtspMessage) -> Result<(), Error> {
        if self.needs_restart() {
            return Err(Error::Closed);
        }
        self.writer.send(message).await.map_err(|_| {
            self.state.mark_failed();
            Error::Closed
        })
    }
}

impl Drop for HtspConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// `SHA1(password || challenge)`, the digest `authenticate` expects.
pub fn auth_digest(password: &str, challenge: &[u8]) -> Vec<u8> {
    let mut hasher = Sha1::new();
    hasher.update(password.as_bytes());
    hasher.update(challenge);
    hasher.finalize().to_vec()
}

fn check_reply(method: &str, reply: HtspMessage) -> Result<HtspMessage, Error> {
    if reply.no_access() {
        return Err(Error::AccessDenied {
            method: method.to_owned(),
        });
    }
    if let Some(message) = reply.error() {
        return Err(Error::RequestFailed {
            method: method.to_owned(),
            message: message.to_owned(),
        });
    }
    Ok(reply)
}

// ── Background tasks ─────────────────────────────────────────────────

async fn write_loop<S>(
    mut sink: SplitSink<Framed<S, HtsmsgCodec>, HtspMessage>,
    mut rx: mpsc::Receiver<HtspMessage>,
    state: Arc<LinkState>,
    cancel: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = rx.recv() => {
                let Some(message) = next else { break };
                if let Err(e) = sink.send(message).await {
                    warn!(error = %e, "HTSP write failed");
                    state.mark_failed();
                    break;
                }
            }
        }
    }
    debug!("HTSP writer exiting");
}

/// The only dispatcher: one frame at a time, in wire order.
async fn receive_loop<S>(
    mut source: SplitStream<Framed<S, HtsmsgCodec>>,
    correlator: Arc<Correlator>,
    state: Arc<LinkState>,
    cancel: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let failure = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break None,
            frame = source.next() => match frame {
                Some(Ok(message)) => {
                    correlator.dispatch(message);
                }
                Some(Err(e)) => break Some(e),
                None => break Some(Error::Closed),
            }
        }
    };

    if let Some(e) = failure {
        error!(error = %e, "HTSP receive loop stopped");
        state.mark_failed();
        correlator.report_error(&e);
    } else {
        debug!("HTSP receive loop cancelled");
    }

    state.connected.store(false, Ordering::SeqCst);
    correlator.clear();
}
