// ── Session data store ──
//
// The four entity caches of one session, cleaned together whenever a
// fresh initial sync begins.

use serde::Serialize;

use super::autorec::AutorecStore;
use super::cache::CacheStats;
use super::channels::{ChannelStore, TunerStore};
use super::dvr::DvrStore;
use crate::stream::EntityStream;
use crate::model::{Channel, Recording, SeriesRule};

/// All caches fed by push events.
#[derive(Default)]
pub struct DataStore {
    pub channels: ChannelStore,
    pub tuners: TunerStore,
    pub dvr: DvrStore,
    pub autorec: AutorecStore,
}

/// Counters for every cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub channels: CacheStats,
    pub dvr: CacheStats,
    pub autorec: CacheStats,
    pub tuners: usize,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty every cache ahead of a new initial sync.
    pub fn clean_all(&self) {
        self.channels.clean();
        self.tuners.clean();
        self.dvr.clean();
        self.autorec.clean();
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
            && self.tuners.is_empty()
            && self.dvr.is_empty()
            && self.autorec.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            channels: self.channels.stats(),
            dvr: self.dvr.stats(),
            autorec: self.autorec.stats(),
            tuners: self.tuners.len(),
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_channels(&self) -> EntityStream<Channel> {
        EntityStream::new(self.channels.subscribe())
    }

    pub fn subscribe_recordings(&self) -> EntityStream<Recording> {
        EntityStream::new(self.dvr.subscribe())
    }

    pub fn subscribe_series(&self) -> EntityStream<SeriesRule> {
        EntityStream::new(self.autorec.subscribe())
    }
}
