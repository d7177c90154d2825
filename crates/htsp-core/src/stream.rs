// ── Cache subscriptions ──
//
// Lets a host react to cache changes instead of polling snapshots.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A subscription to one entity cache.
pub struct EntityStream<T: Send + Sync + 'static> {
    current: Snapshot<T>,
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Contents when the subscription was created or last advanced.
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    pub fn latest(&self) -> Snapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next mutation. `None` once the cache is gone.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Wait until the cache contents satisfy `predicate`.
    pub async fn wait_until(&mut self, mut predicate: impl FnMut(&[Arc<T>]) -> bool) -> Option<Snapshot<T>> {
        let snap = self
            .receiver
            .wait_for(|snap| predicate(snap))
            .await
            .ok()?
            .clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    pub fn into_stream(self) -> EntityWatchStream<T> {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a fresh snapshot after each mutation.
pub struct EntityWatchStream<T: Send + Sync + 'static> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T: Send + Sync + 'static> Stream for EntityWatchStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;
    use htsp_api::HtspMessage;

    use crate::store::ChannelStore;

    use super::*;

    fn add(id: u32) -> HtspMessage {
        HtspMessage::method("channelAdd").with("channelId", id)
    }

    #[tokio::test]
    async fn changed_yields_new_snapshot() {
        let store = ChannelStore::new();
        let mut stream = EntityStream::new(store.subscribe());
        assert!(stream.current().is_empty());

        store.entity_add(&add(1));
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(stream.current().len(), 1);
    }

    #[tokio::test]
    async fn wait_until_sees_later_state() {
        let store = Arc::new(ChannelStore::new());
        let mut stream = EntityStream::new(store.subscribe());
        let writer = Arc::clone(&store);
        tokio::spawn(async move {
            for id in 1..=3 {
                writer.entity_add(&add(id));
                tokio::task::yield_now().await;
            }
        });
        let snap = stream.wait_until(|s| s.len() == 3).await.unwrap();
        assert_eq!(snap.len(), 3);
    }

    #[tokio::test]
    async fn into_stream_emits_current_first() {
        let store = ChannelStore::new();
        store.entity_add(&add(1));
        let mut stream = EntityStream::new(store.subscribe()).into_stream();
        assert_eq!(stream.next().await.unwrap().len(), 1);
    }
}
