// ── Channel & tuner caches ──

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use htsp_api::HtspMessage;
use tokio::sync::watch;

use super::cache::{CacheStats, EntityCache};
use crate::model::{Channel, ChannelService, TunerInput};

// ── ChannelStore ─────────────────────────────────────────────────────

/// Cache of every channel the server announced.
#[derive(Default)]
pub struct ChannelStore {
    cache: EntityCache<Channel>,
}

impl ChannelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_add(&self, message: &HtspMessage) -> Option<Arc<Channel>> {
        let id = self.cache.entity_add(message)?;
        self.cache.get(&id)
    }

    pub fn entity_update(&self, message: &HtspMessage) -> Option<Arc<Channel>> {
        let id = self.cache.entity_update(message)?;
        self.cache.get(&id)
    }

    pub fn entity_delete(&self, message: &HtspMessage) -> Option<Arc<Channel>> {
        self.cache.entity_delete(message)
    }

    pub fn clean(&self) {
        self.cache.clear();
    }

    pub fn get(&self, id: u32) -> Option<Arc<Channel>> {
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

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<Channel>>>> {
        self.cache.subscribe()
    }

    /// Channels in guide order: number, minor number, then name.
    pub fn build_channel_snapshot(&self) -> Vec<Arc<Channel>> {
        let mut channels: Vec<Arc<Channel>> = self.cache.snapshot().iter().cloned().collect();
        channels.sort_by(|a, b| {
            (a.number, a.sub_number.unwrap_or(0), &a.name, a.id)
                .cmp(&(b.number, b.sub_number.unwrap_or(0), &b.name, b.id))
        });
        channels
    }
}

// ── TunerStore ───────────────────────────────────────────────────────

/// Receiving inputs, derived from the service lists of known channels.
///
/// Keeps each channel's last announced services so that an update or
/// delete can withdraw the channel from inputs it no longer uses.
#[derive(Default)]
pub struct TunerStore {
    by_channel: DashMap<u32, Vec<ChannelService>>,
}

impl TunerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current services of `channel`.
    pub fn channel_changed(&self, channel: &Channel) {
        if channel.services.is_empty() {
            self.by_channel.remove(&channel.id);
        } else {
            self.by_channel.insert(channel.id, channel.services.clone());
        }
    }

    pub fn channel_removed(&self, channel_id: u32) {
        self.by_channel.remove(&channel_id);
    }

    pub fn clean(&self) {
        self.by_channel.clear();
    }

    /// Number of distinct inputs currently known.
    pub fn len(&self) -> usize {
        self.build_tuner_snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_channel.is_empty()
    }

    /// Inputs ordered by name, each with its channels ascending.
    pub fn build_tuner_snapshot(&self) -> Vec<Arc<TunerInput>> {
        let mut inputs: BTreeMap<String, TunerInput> = BTreeMap::new();
        for entry in &self.by_channel {
            let channel_id = *entry.key();
            for service in entry.value() {
                let name = service.tuner_name();
                if name.is_empty() {
                    continue;
                }
                let input = inputs.entry(name.to_owned()).or_insert_with(|| TunerInput {
                    name: name.to_owned(),
                    ..TunerInput::default()
                });
                input.channel_ids.push(channel_id);
                if !service.service_type.is_empty() {
                    input.service_types.push(service.service_type.clone());
                }
            }
        }
        inputs
            .into_values()
            .map(|mut input| {
                input.channel_ids.sort_unstable();
                input.channel_ids.dedup();
                input.service_types.sort();
                input.service_types.dedup();
                Arc::new(input)
            })
            .collect()
    }
}
