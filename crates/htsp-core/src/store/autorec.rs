// ── Series rule (autorec) cache ──

use std::sync::Arc;

use htsp_api::HtspMessage;
use tokio::sync::watch;

use super::cache::{CacheStats, EntityCache};
use super::channels::ChannelStore;
use crate::model::{SeriesRule, SeriesRuleView};

#[derive(Default)]
pub struct AutorecStore {
    cache: EntityCache<SeriesRule>,
}

impl AutorecStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_add(&self, message: &HtspMessage) -> Option<String> {
        self.cache.entity_add(message)
    }

    pub fn entity_update(&self, message: &HtspMessage) -> Option<String> {
        self.cache.entity_update(message)
    }

    pub fn entity_delete(&self, message: &HtspMessage) -> Option<Arc<SeriesRule>> {
        self.cache.entity_delete(message)
    }

    pub fn clean(&self) {
        self.cache.clear();
    }

    pub fn get(&self, id: &str) -> Option<Arc<SeriesRule>> {
        self.cache.get(&id.to_owned())
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

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<SeriesRule>>>> {
        self.cache.subscribe()
    }

    /// Rules ordered by display name, each joined with its channel.
    pub fn build_series_snapshot(&self, channels: &ChannelStore) -> Vec<SeriesRuleView> {
        let mut views: Vec<SeriesRuleView> = self
            .cache
            .snapshot()
            .iter()
            .map(|rule| SeriesRuleView {
                rule: Arc::clone(rule),
                channel_name: rule
                    .channel_id
                    .and_then(|id| channels.get(id))
                    .map(|c| c.name.clone()),
            })
            .collect();
        views.sort_by(|a, b| {
            (a.rule.display_name(), &a.rule.id).cmp(&(b.rule.display_name(), &b.rule.id))
        });
        views
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rule(id: &str, title: &str) -> HtspMessage {
        HtspMessage::method("autorecEntryAdd")
            .with("id", id)
            .with("enabled", 1_u32)
            .with("title", title)
    }

    #[test]
    fn series_snapshot_sorted_by_name() {
        let store = AutorecStore::new();
        store.entity_add(&rule("b", "Weather"));
        store.entity_add(&rule("a", "News"));
        let titles: Vec<String> = store
            .build_series_snapshot(&ChannelStore::new())
            .iter()
            .map(|v| v.rule.display_name().to_owned())
            .collect();
        assert_eq!(titles, vec!["News", "Weather"]);
    }

    #[test]
    fn rule_with_channel_is_joined() {
        let channels = ChannelStore::new();
        channels.entity_add(
            &HtspMessage::method("channelAdd")
                .with("channelId", 4_u32)
                .with("channelName", "Four"),
        );
        let store = AutorecStore::new();
        store.entity_add(&rule("x", "Film").with("channel", 4_u32));
        let views = store.build_series_snapshot(&channels);
        assert_eq!(views[0].channel_name.as_deref(), Some("Four"));
    }

    #[test]
    fn delete_removes_rule() {
        let store = AutorecStore::new();
        store.entity_add(&rule("x", "Film"));
        assert!(store.entity_delete(&HtspMessage::method("autorecEntryDelete").with("id", "x")).is_some());
        assert!(store.get("x").is_none());
    }
}
