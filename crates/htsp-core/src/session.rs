// ── Session coordinator ──
//
// Owns the one live connection to a server, rebuilds it lazily when it
// fails, gates reads on the initial-sync barrier, and runs every public
// operation under the supervisor. Public operations never fail: queries
// degrade to empty results and mutations to a log line. `connect` and
// `execute` are the exceptions for callers that need the error.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use htsp_api::{EventListener, HtspConnection, HtspMessage};
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::command::{Command, CommandResult, SeriesTimerRequest, TimerRequest, UpdateTimerRequest};
use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::{
    Channel, Program, RecordingView, SeriesRuleView, ServerStatus, StreamInfo, TunerInput,
};
use crate::router::EventRouter;
use crate::store::{DataStore, StoreStats};
use crate::supervisor::{Supervised, Supervisor};
use crate::sync::{SyncBarrier, SyncState};

/// First protocol version with `updateAutorecEntry`; older servers get
/// delete-then-add.
const UPDATE_AUTOREC_VERSION: u32 = 25;

// ── Link ─────────────────────────────────────────────────────────────

/// A connection together with the router feeding its events to the caches.
struct Link {
    connection: Arc<HtspConnection>,
    router: Arc<EventRouter>,
}

impl Drop for Link {
    fn drop(&mut self) {
        self.router.retire();
        self.connection.close();
    }
}

/// Puts the barrier back to `Disconnected` if establishing a session is
/// abandoned part way, including when the supervisor drops the future.
struct EstablishGuard<'a> {
    barrier: &'a SyncBarrier,
    armed: bool,
}

impl EstablishGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for EstablishGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.barrier.disconnected();
        }
    }
}

/// Counters describing the session's lifetime.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionStats {
    pub sync_state: SyncState,
    pub connected: bool,
    /// Sessions established, including the first.
    pub connects: u64,
    /// Replies that arrived after their caller gave up, current connection only.
    pub unclaimed_replies: u64,
    /// Push events of kinds the caches do not track, across all connections.
    pub ignored_events: u64,
    pub store: StoreStats,
}

// ── HtspSession ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`.
#[derive(Clone)]
pub struct HtspSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    store: Arc<DataStore>,
    barrier: Arc<SyncBarrier>,
    supervisor: Supervisor,
    link: Mutex<Option<Link>>,
    /// Mirror of the live connection for lock-free observability.
    current: ArcSwapOption<HtspConnection>,
    connects: AtomicU64,
    ignored_events: Arc<AtomicU64>,
}

impl HtspSession {
    /// Create a session. Does NOT connect; the first operation does.
    ///
    /// Fails only when the configuration can never work.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let supervisor = Supervisor::new(config.operation_timeout);
        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                store: Arc::new(DataStore::new()),
                barrier: Arc::new(SyncBarrier::new()),
                supervisor,
                link: Mutex::new(None),
                current: ArcSwapOption::empty(),
                connects: AtomicU64::new(0),
                ignored_events: Arc::new(AtomicU64::new(0)),
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn state(&self) -> SyncState {
        self.inner.barrier.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.inner.barrier.subscribe()
    }

    pub fn stats(&self) -> SessionStats {
        let current = self.inner.current.load_full();
        SessionStats {
            sync_state: self.state(),
            connected: current.as_ref().is_some_and(|c| c.is_connected()),
            connects: self.inner.connects.load(Ordering::Relaxed),
            unclaimed_replies: current.map_or(0, |c| c.correlator().unclaimed_count()),
            ignored_events: self.inner.ignored_events.load(Ordering::Relaxed),
            store: self.inner.store.stats(),
        }
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Make sure an authenticated session with async metadata exists,
    /// rebuilding it if the previous one failed.
    pub async fn ensure_connected(&self) -> Result<(), CoreError> {
        self.connection().await.map(|_| ())
    }

    /// Connect and wait for the initial sync, surfacing any failure.
    pub async fn connect(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let work = async {
            self.connection().await?;
            self.wait_synced().await
        };
        self.run("connect", cancel, work).await
    }

    /// Close the connection. The next operation reconnects.
    pub async fn disconnect(&self) {
        let mut link = self.inner.link.lock().await;
        if link.take().is_some() {
            info!(host = %self.inner.config.host, "disconnected");
        }
        self.inner.current.store(None);
        self.inner.barrier.disconnected();
    }

    async fn connection(&self) -> Result<Arc<HtspConnection>, CoreError> {
        let mut link = self.inner.link.lock().await;
        if let Some(current) = link.as_ref() {
            if !current.connection.needs_restart() {
                return Ok(Arc::clone(&current.connection));
            }
            info!("connection lost, rebuilding session");
        }
        // Dropping the stale link retires its router and closes it.
        drop(link.take());
        self.inner.current.store(None);
        self.inner.barrier.disconnected();

        let guard = EstablishGuard {
            barrier: &self.inner.barrier,
            armed: true,
        };
        let fresh = self.establish().await?;
        guard.disarm();

        let connection = Arc::clone(&fresh.connection);
        self.inner.current.store(Some(Arc::clone(&connection)));
        *link = Some(fresh);
        Ok(connection)
    }

    async fn establish(&self) -> Result<Link, CoreError> {
        let config = &self.inner.config;
        let router = Arc::new(EventRouter::new(
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.barrier),
            Arc::clone(&self.inner.ignored_events),
        ));
        let options = config.connect_options();
        debug!(addr = %options.addr(), "opening connection");
        let listener: Arc<dyn EventListener> = router.clone();
        let connection = HtspConnection::open(&options, listener).await?;
        let link = Link {
            connection: Arc::new(connection),
            router,
        };
        self.inner.barrier.connected();

        let server = link.connection.hello().await?;
        if !link
            .connection
            .authenticate(&config.username, &config.password)
            .await?
        {
            return Err(CoreError::AuthenticationFailed {
                message: format!("server rejected credentials for '{}'", config.username),
            });
        }

        self.inner.store.clean_all();
        self.inner.barrier.begin_sync();
        link.connection.enable_async_metadata(false).await?;

        let connects = self.inner.connects.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            server = %server.name,
            version = %server.version,
            protocol = server.protocol_version,
            connects,
            "session established"
        );
        Ok(link)
    }

    async fn wait_synced(&self) -> Result<(), CoreError> {
        self.inner
            .barrier
            .wait_complete(self.inner.config.sync_timeout)
            .await
    }

    // ── Snapshot operations ──────────────────────────────────────────

    pub async fn channels(&self, cancel: &CancellationToken) -> Vec<Arc<Channel>> {
        self.read("channels", cancel, |store| store.channels.build_channel_snapshot())
            .await
            .unwrap_or_default()
    }

    pub async fn tuners(&self, cancel: &CancellationToken) -> Vec<Arc<TunerInput>> {
        self.read("tuners", cancel, |store| store.tuners.build_tuner_snapshot())
            .await
            .unwrap_or_default()
    }

    /// Completed, in-progress, and failed recordings.
    pub async fn recordings(&self, cancel: &CancellationToken) -> Vec<RecordingView> {
        self.read("recordings", cancel, |store| {
            store.dvr.build_recording_snapshot(&store.channels)
        })
        .await
        .unwrap_or_default()
    }

    /// Scheduled, not yet started recordings.
    pub async fn timers(&self, cancel: &CancellationToken) -> Vec<RecordingView> {
        self.read("timers", cancel, |store| {
            store.dvr.build_timer_snapshot(&store.channels)
        })
        .await
        .unwrap_or_default()
    }

    pub async fn series_timers(&self, cancel: &CancellationToken) -> Vec<SeriesRuleView> {
        self.read("series_timers", cancel, |store| {
            store.autorec.build_series_snapshot(&store.channels)
        })
        .await
        .unwrap_or_default()
    }

    pub async fn server_status(&self, cancel: &CancellationToken) -> Option<ServerStatus> {
        let work = async {
            let connection = self.connection().await?;
            self.wait_synced().await?;
            let disk = connection.disk_space().await?;
            let server = connection.server_info().ok_or_else(|| CoreError::Protocol {
                message: "no server identity after hello".into(),
            })?;
            let store = &self.inner.store;
            Ok(ServerStatus {
                server_name: server.name.clone(),
                server_version: server.version.clone(),
                protocol_version: server.protocol_version,
                capabilities: server.capabilities.clone(),
                free_bytes: disk.free_bytes,
                total_bytes: disk.total_bytes,
                sync_state: self.state(),
                channel_count: store.channels.len(),
                recording_count: store.dvr.build_recording_snapshot(&store.channels).len(),
                timer_count: store.dvr.build_timer_snapshot(&store.channels).len(),
                series_count: store.autorec.len(),
                tuners: store.tuners.build_tuner_snapshot(),
            })
        };
        self.settle("server_status", cancel, work).await
    }

    // ── Request operations ───────────────────────────────────────────

    /// Guide entries of `channel_id` overlapping `[start, end)`.
    pub async fn programs(
        &self,
        channel_id: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Vec<Program> {
        if end <= start {
            return Vec::new();
        }
        let work = async {
            let connection = self.connection().await?;
            let reply = connection
                .request(
                    HtspMessage::method("getEvents")
                        .with("channelId", channel_id)
                        .with("maxTime", end.timestamp()),
                )
                .await?;
            let mut programs: Vec<Program> = reply
                .list("events")
                .unwrap_or_default()
                .iter()
                .filter_map(htsp_api::Value::as_map)
                .filter_map(Program::from_message)
                .filter(|p| p.overlaps(start, end))
                .collect();
            programs.sort_by_key(|p| (p.start, p.event_id));
            Ok(programs)
        };
        self.settle("programs", cancel, work)
            .await
            .unwrap_or_default()
    }

    pub async fn channel_stream(&self, channel_id: u32, cancel: &CancellationToken) -> Option<StreamInfo> {
        let request = HtspMessage::method("getTicket").with("channelId", channel_id);
        self.settle("channel_stream", cancel, self.ticket(request)).await
    }

    pub async fn recording_stream(&self, recording_id: u32, cancel: &CancellationToken) -> Option<StreamInfo> {
        let request = HtspMessage::method("getTicket").with("dvrId", recording_id);
        self.settle("recording_stream", cancel, self.ticket(request)).await
    }

    async fn ticket(&self, request: HtspMessage) -> Result<StreamInfo, CoreError> {
        let connection = self.connection().await?;
        let reply = connection.request(request).await?;
        let (Some(path), Some(ticket)) = (reply.str("path"), reply.str("ticket")) else {
            return Err(CoreError::Protocol {
                message: "getTicket reply without path or ticket".into(),
            });
        };
        Ok(StreamInfo {
            url: self.stream_url(path, ticket)?,
            path: path.to_owned(),
            ticket: ticket.to_owned(),
        })
    }

    fn stream_url(&self, path: &str, ticket: &str) -> Result<Url, CoreError> {
        let config = &self.inner.config;
        let scheme = if config.http_tls { "https" } else { "http" };
        let host = if config.host.contains(':') && !config.host.starts_with('[') {
            format!("[{}]", config.host)
        } else {
            config.host.clone()
        };
        let mut url = Url::parse(&format!("{scheme}://{host}:{}/", config.http_port)).map_err(|e| {
            CoreError::Config {
                message: format!("cannot build stream URL for host '{}': {e}", config.host),
            }
        })?;
        url.set_path(path);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("ticket", ticket);
            if let Some(profile) = &config.stream_profile {
                query.append_pair("profile", profile);
            }
        }
        Ok(url)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Execute a write operation, returning its outcome.
    pub async fn execute(&self, command: Command, cancel: &CancellationToken) -> Result<CommandResult, CoreError> {
        let name = command.name();
        let outcome = self.run(name, cancel, self.apply(command)).await;
        match &outcome {
            Ok(result) => info!(operation = name, ?result, "command applied"),
            Err(e) => warn!(operation = name, error = %e, "command failed"),
        }
        outcome
    }

    pub async fn create_timer(&self, request: TimerRequest, cancel: &CancellationToken) {
        let _ = self.execute(Command::CreateTimer(request), cancel).await;
    }

    pub async fn update_timer(&self, id: u32, update: UpdateTimerRequest, cancel: &CancellationToken) {
        let _ = self.execute(Command::UpdateTimer { id, update }, cancel).await;
    }

    pub async fn cancel_timer(&self, id: u32, cancel: &CancellationToken) {
        let _ = self.execute(Command::CancelTimer { id }, cancel).await;
    }

    pub async fn delete_recording(&self, id: u32, cancel: &CancellationToken) {
        let _ = self.execute(Command::DeleteRecording { id }, cancel).await;
    }

    pub async fn create_series_timer(&self, request: SeriesTimerRequest, cancel: &CancellationToken) {
        let _ = self.execute(Command::CreateSeriesTimer(request), cancel).await;
    }

    pub async fn update_series_timer(&self, id: impl Into<String>, rule: SeriesTimerRequest, cancel: &CancellationToken) {
        let command = Command::UpdateSeriesTimer { id: id.into(), rule };
        let _ = self.execute(command, cancel).await;
    }

    pub async fn cancel_series_timer(&self, id: impl Into<String>, cancel: &CancellationToken) {
        let _ = self.execute(Command::CancelSeriesTimer { id: id.into() }, cancel).await;
    }

    async fn apply(&self, command: Command) -> Result<CommandResult, CoreError> {
        let priority = self.inner.config.default_priority;
        let connection = self.connection().await?;
        match command {
            Command::CreateTimer(request) => send(&connection, request.to_message(priority)?).await,
            Command::UpdateTimer { id, update } => send(&connection, update.to_message(id)?).await,
            Command::CancelTimer { id } => {
                send(&connection, HtspMessage::method("cancelDvrEntry").with("id", id)).await
            }
            Command::DeleteRecording { id } => {
                send(&connection, HtspMessage::method("deleteDvrEntry").with("id", id)).await
            }
            Command::CreateSeriesTimer(request) => {
                send(&connection, request.to_add_message(priority)?).await
            }
            Command::UpdateSeriesTimer { id, rule } => {
                let native = connection
                    .server_info()
                    .is_some_and(|s| s.protocol_version >= UPDATE_AUTOREC_VERSION);
                if native {
                    send(&connection, rule.to_update_message(&id)?).await
                } else {
                    let add = rule.to_add_message(priority)?;
                    debug!(id = %id, "server lacks updateAutorecEntry, replacing rule");
                    send(&connection, HtspMessage::method("deleteAutorecEntry").with("id", id.as_str())).await?;
                    send(&connection, add).await
                }
            }
            Command::CancelSeriesTimer { id } => {
                send(&connection, HtspMessage::method("deleteAutorecEntry").with("id", id.as_str())).await
            }
        }
    }

    // ── Supervision helpers ──────────────────────────────────────────

    /// Run a cache read once the initial sync is complete.
    async fn read<T>(
        &self,
        name: &'static str,
        cancel: &CancellationToken,
        build: impl FnOnce(&DataStore) -> T,
    ) -> Option<T> {
        let work = async move {
            self.connection().await?;
            self.wait_synced().await?;
            Ok(build(&self.inner.store))
        };
        self.settle(name, cancel, work).await
    }

    /// Supervise `work`, folding every failure into an error.
    async fn run<T>(
        &self,
        name: &'static str,
        cancel: &CancellationToken,
        work: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        match self.inner.supervisor.run(name, cancel, work).await {
            Supervised::Completed(result) => result,
            Supervised::TimedOut => Err(CoreError::Timeout {
                timeout_secs: self.inner.supervisor.deadline().as_secs(),
            }),
            Supervised::Cancelled => Err(CoreError::Cancelled),
        }
    }

    /// Supervise `work`, logging failures and degrading them to `None`.
    async fn settle<T>(
        &self,
        name: &'static str,
        cancel: &CancellationToken,
        work: impl Future<Output = Result<T, CoreError>>,
    ) -> Option<T> {
        match self.inner.supervisor.run(name, cancel, work).await.into_option()? {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(operation = name, error = %e, "operation failed, returning empty result");
                None
            }
        }
    }
}

async fn send(connection: &HtspConnection, message: HtspMessage) -> Result<CommandResult, CoreError> {
    let method = message.method_name().unwrap_or_default().to_owned();
    let reply = connection.request(message).await?;
    CommandResult::from_reply(&method, &reply)
}
