// ── DVR entry cache ──
//
// Holds every DVR entry regardless of state. Scheduled entries are
// surfaced as timers; everything else is a recording.

use std::sync::Arc;

use htsp_api::HtspMessage;
use tokio::sync::watch;

use super::cache::{CacheStats, EntityCache};
use super::channels::ChannelStore;
use crate::model::{Recording, RecordingView};

#[derive(Default)]
pub struct DvrStore {
    cache: EntityCache<Recording>,
}

impl DvrStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_add(&self, message: &HtspMessage) -> Option<u32> {
        self.cache.entity_add(message)
    }

    pub fn entity_update(&self, message: &HtspMessage) -> Option<u32> {
        self.cache.entity_update(message)
    }

    pub fn entity_delete(&self, message: &HtspMessage) -> Option<Arc<Recording>> {
        self.cache.entity_delete(message)
    }

    pub fn clean(&self) {
        self.cache.clear();
    }

    pub fn get(&self, id: u32) -> Option<Arc<Recording>> {
        self.cache.get(&id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<Recording>>>> {
        self.cache.subscribe()
    }

    /// Completed, in-progress, and failed entries, oldest first.
    pub fn build_recording_snapshot(&self, channels: &ChannelStore) -> Vec<RecordingView> {
        self.build(channels, |r| !r.is_timer())
    }

    /// Entries still waiting to start, soonest first.
    pub fn build_timer_snapshot(&self, channels: &ChannelStore) -> Vec<RecordingView> {
        self.build(channels, Recording::is_timer)
    }

    fn build(&self, channels: &ChannelStore, keep: impl Fn(&Recording) -> bool) -> Vec<RecordingView> {
        let mut views: Vec<RecordingView> = self
            .cache
            .snapshot()
            .iter()
            .filter(|r| keep(r))
            .map(|r| {
                let channel = r.channel_id.and_then(|id| channels.get(id));
                RecordingView {
                    recording: Arc::clone(r),
                    channel_name: channel.as_ref().map(|c| c.name.clone()),
                    channel_number: channel.as_ref().map(|c| c.display_number()),
                }
            })
            .collect();
        views.sort_by_key(|v| (v.recording.start, v.recording.id));
        views
    }
}
