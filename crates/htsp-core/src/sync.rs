// ── Initial-sync barrier ──
//
// Tracks where the session is in its connect → sync lifecycle and lets
// readers block until the caches hold a complete initial snapshot.
//
//   Disconnected ─▶ Connected ─▶ SyncInProgress ─▶ SyncComplete
//         ▲                                              │
//         └──────────────── receive failure ─────────────┘

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::CoreError;

/// Session lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncState {
    #[default]
    Disconnected,
    Connected,
    SyncInProgress,
    SyncComplete,
}

/// Gate on [`SyncState::SyncComplete`].
pub struct SyncBarrier {
    state: watch::Sender<SyncState>,
}

impl SyncBarrier {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SyncState::Disconnected);
        Self { state }
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn connected(&self) {
        self.transition(SyncState::Connected);
    }

    /// Caches were cleaned; push events for a fresh sync follow.
    pub fn begin_sync(&self) {
        self.transition(SyncState::SyncInProgress);
    }

    /// The server signalled the end of the initial sync. Ignored unless a
    /// sync is in progress.
    pub fn complete(&self) {
        let advanced = self.state.send_if_modified(|state| {
            if *state == SyncState::SyncInProgress {
                *state = SyncState::SyncComplete;
                true
            } else {
                false
            }
        });
        if advanced {
            info!("initial sync complete");
        } else {
            debug!(state = %self.state(), "sync completion outside a sync ignored");
        }
    }

    pub fn disconnected(&self) {
        self.transition(SyncState::Disconnected);
    }

    /// Block until the initial sync has completed, or `ceiling` elapses.
    ///
    /// Returns immediately when already complete. Losing the connection
    /// ends the wait with [`CoreError::SyncInterrupted`]; the caller's
    /// next operation rebuilds the session.
    pub async fn wait_complete(&self, ceiling: Duration) -> Result<(), CoreError> {
        let mut rx = self.state.subscribe();
        let settled = async {
            rx.wait_for(|s| matches!(s, SyncState::SyncComplete | SyncState::Disconnected))
                .await
                .map(|state| *state == SyncState::SyncComplete)
        };
        match tokio::time::timeout(ceiling, settled).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false) | Err(_)) => Err(CoreError::SyncInterrupted),
            Err(_) => Err(CoreError::Timeout {
                timeout_secs: ceiling.as_secs(),
            }),
        }
    }

    fn transition(&self, next: SyncState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "sync state");
        }
    }
}

impl Default for SyncBarrier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn complete_releases_waiters() {
        let barrier = Arc::new(SyncBarrier::new());
        barrier.connected();
        barrier.begin_sync();

        let waiter = {
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move { barrier.wait_complete(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        barrier.complete();
        assert!(waiter.await.unwrap().is_ok());
        assert_eq!(barrier.state(), SyncState::SyncComplete);
    }

    #[tokio::test]
    async fn already_complete_returns_immediately() {
        let barrier = SyncBarrier::new();
        barrier.begin_sync();
        barrier.complete();
        barrier
            .wait_complete(Duration::from_millis(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn disconnect_ends_the_wait() {
        let barrier = SyncBarrier::new();
        barrier.connected();
        barrier.begin_sync();
        let mut wait = tokio_test::task::spawn(barrier.wait_complete(Duration::from_secs(60)));
        tokio_test::assert_pending!(wait.poll());

        barrier.disconnected();
        assert!(wait.is_woken());
        let result = tokio_test::assert_ready!(wait.poll());
        assert!(matches!(result, Err(CoreError::SyncInterrupted)));
    }

    #[tokio::test]
    async fn waiting_while_disconnected_fails_fast() {
        let barrier = SyncBarrier::new();
        let result = barrier.wait_complete(Duration::from_secs(60)).await;
        assert!(matches!(result, Err(CoreError::SyncInterrupted)));
    }

    #[tokio::test(start_paused = true)]
    async fn ceiling_elapses_without_completion() {
        let barrier = SyncBarrier::new();
        barrier.begin_sync();
        let result = barrier.wait_complete(Duration::from_secs(900)).await;
        assert!(matches!(result, Err(CoreError::Timeout { timeout_secs: 900 })));
    }

    #[test]
    fn completion_requires_sync_in_progress() {
        let barrier = SyncBarrier::new();
        barrier.complete();
        assert_eq!(barrier.state(), SyncState::Disconnected);
        barrier.connected();
        barrier.complete();
        assert_eq!(barrier.state(), SyncState::Connected);
    }

    #[test]
    fn state_names() {
        assert_eq!(SyncState::SyncInProgress.to_string(), "sync_in_progress");
    }
}
