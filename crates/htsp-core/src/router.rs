// ── Push-event router ──
//
// The session's `EventListener`. Runs on the receive loop, so every
// branch is a short synchronous cache mutation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use htsp_api::{EventListener, HtspMessage};
use tracing::{debug, trace, warn};

use crate::store::DataStore;
use crate::sync::SyncBarrier;

/// Routes push events of one connection into the session caches.
pub(crate) struct EventRouter {
    store: Arc<DataStore>,
    barrier: Arc<SyncBarrier>,
    /// Cleared when the connection is replaced; late events are dropped.
    active: AtomicBool,
    /// Shared with the session so the count survives reconnects.
    ignored: Arc<AtomicU64>,
}

impl EventRouter {
    pub(crate) fn new(store: Arc<DataStore>, barrier: Arc<SyncBarrier>, ignored: Arc<AtomicU64>) -> Self {
        Self {
            store,
            barrier,
            active: AtomicBool::new(true),
            ignored,
        }
    }

    /// Stop applying events from this router's connection.
    pub(crate) fn retire(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn route(&self, method: &str, message: &HtspMessage) {
        let store = &self.store;
        match method {
            "channelAdd" => {
                if let Some(channel) = store.channels.entity_add(message) {
                    store.tuners.channel_changed(&channel);
                }
            }
            "channelUpdate" => {
                let channel = store.channels.entity_update(message);
                if let Some(channel) = channel.filter(|_| message.contains("services")) {
                    store.tuners.channel_changed(&channel);
                }
            }
            "channelDelete" => {
                if let Some(id) = message.u32("channelId") {
                    store.tuners.channel_removed(id);
                }
                store.channels.entity_delete(message);
            }
            "dvrEntryAdd" => {
                store.dvr.entity_add(message);
            }
            "dvrEntryUpdate" => {
                store.dvr.entity_update(message);
            }
            "dvrEntryDelete" => {
                store.dvr.entity_delete(message);
            }
            "autorecEntryAdd" => {
                store.autorec.entity_add(message);
            }
            "autorecEntryUpdate" => {
                store.autorec.entity_update(message);
            }
            "autorecEntryDelete" => {
                store.autorec.entity_delete(message);
            }
            "initialSyncCompleted" => self.barrier.complete(),
            _ => {
                self.ignored.fetch_add(1, Ordering::Relaxed);
                trace!(method, "ignoring push event");
            }
        }
    }
}

impl EventListener for EventRouter {
    fn on_event(&self, method: &str, message: &HtspMessage) {
        if !self.active.load(Ordering::SeqCst) {
            debug!(method, "event from retired connection dropped");
            return;
        }
        self.route(method, message);
    }

    fn on_error(&self, error: &htsp_api::Error) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        // The session rebuilds lazily on the next operation.
        warn!(error = %error, "connection lost, session will be rebuilt");
        self.barrier.disconnected();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use htsp_api::Value;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sync::SyncState;

    fn setup() -> (EventRouter, Arc<DataStore>, Arc<SyncBarrier>) {
        let store = Arc::new(DataStore::new());
        let barrier = Arc::new(SyncBarrier::new());
        let ignored = Arc::new(AtomicU64::new(0));
        let router = EventRouter::new(Arc::clone(&store), Arc::clone(&barrier), ignored);
        (router, store, barrier)
    }

    fn send(router: &EventRouter, message: HtspMessage) {
        let method = message.method_name().unwrap().to_owned();
        router.on_event(&method, &message);
    }

    #[test]
    fn routes_by_method() {
        let (router, store, barrier) = setup();
        barrier.begin_sync();
        send(&router, HtspMessage::method("channelAdd").with("channelId", 1_u32));
        send(&router, HtspMessage::method("dvrEntryAdd").with("id", 10_u32).with("channel", 1_u32));
        send(&router, HtspMessage::method("autorecEntryAdd").with("id", "a"));
        send(&router, HtspMessage::method("initialSyncCompleted"));

        assert_eq!(store.channels.len(), 1);
        assert_eq!(store.dvr.len(), 1);
        assert_eq!(store.autorec.len(), 1);
        assert_eq!(barrier.state(), SyncState::SyncComplete);
    }

    #[test]
    fn unknown_kinds_are_ignored() {
        let (router, store, _) = setup();
        send(&router, HtspMessage::method("eventAdd").with("eventId", 5_u32));
        send(&router, HtspMessage::method("tagAdd").with("tagId", 2_u32));
        assert!(store.is_empty());
        assert_eq!(router.ignored.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn channel_delete_withdraws_tuners() {
        let (router, store, _) = setup();
        send(
            &router,
            HtspMessage::method("channelAdd").with("channelId", 1_u32).with(
                "services",
                vec![Value::from(HtspMessage::new().with("name", "IPTV/a").with("type", "HDTV"))],
            ),
        );
        assert_eq!(store.tuners.len(), 1);
        send(&router, HtspMessage::method("channelDelete").with("channelId", 1_u32));
        assert!(store.channels.is_empty());
        assert!(store.tuners.is_empty());
    }

    #[test]
    fn retired_router_drops_events() {
        let (router, store, barrier) = setup();
        barrier.begin_sync();
        router.retire();
        send(&router, HtspMessage::method("channelAdd").with("channelId", 1_u32));
        router.on_error(&htsp_api::Error::Closed);
        assert!(store.is_empty());
        assert_eq!(barrier.state(), SyncState::SyncInProgress);
    }

    #[test]
    fn receive_failure_marks_disconnected() {
        let (router, _, barrier) = setup();
        barrier.begin_sync();
        barrier.complete();
        router.on_error(&htsp_api::Error::Closed);
        assert_eq!(barrier.state(), SyncState::Disconnected);
    }
}
