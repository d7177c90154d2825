// ── Operation supervisor ──
//
// Races an operation against a deadline and a caller's cancellation
// token. Whichever finishes first wins and the others are dropped, so
// a timed-out operation stops at its next await point and releases any
// pending request it registered.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::DEFAULT_OPERATION_TIMEOUT;

/// How a supervised operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Supervised<T> {
    Completed(T),
    TimedOut,
    Cancelled,
}

impl<T> Supervised<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut | Self::Cancelled => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Run `op` until it completes, `deadline` elapses, or `cancel` fires.
pub async fn supervise<F: Future>(
    deadline: Duration,
    cancel: &CancellationToken,
    op: F,
) -> Supervised<F::Output> {
    if cancel.is_cancelled() {
        return Supervised::Cancelled;
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Supervised::Cancelled,
        output = op => Supervised::Completed(output),
        () = tokio::time::sleep(deadline) => Supervised::TimedOut,
    }
}

/// A deadline shared by every operation of one session.
#[derive(Debug, Clone, Copy)]
pub struct Supervisor {
    deadline: Duration,
}

impl Supervisor {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// [`supervise`] with logging of abnormal endings.
    pub async fn run<F: Future>(
        &self,
        name: &'static str,
        cancel: &CancellationToken,
        op: F,
    ) -> Supervised<F::Output> {
        let outcome = supervise(self.deadline, cancel, op).await;
        match &outcome {
            Supervised::Completed(_) => {}
            Supervised::TimedOut => warn!(
                operation = name,
                deadline_secs = self.deadline.as_secs(),
                "operation timed out"
            ),
            Supervised::Cancelled => debug!(operation = name, "operation cancelled"),
        }
        outcome
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(DEFAULT_OPERATION_TIMEOUT)
    }
}
