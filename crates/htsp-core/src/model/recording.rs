// ── Recording (DVR entry) domain types ──

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a DVR entry, as reported by the server.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum RecordingState {
    #[default]
    Scheduled,
    Recording,
    Completed,
    Missed,
    Invalid,
}

/// One DVR entry: a pending timer, an active recording, or a finished one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: u32,
    pub channel_id: Option<u32>,
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
    /// Padding before `start`, minutes.
    pub start_extra: Option<i64>,
    /// Padding after `stop`, minutes.
    pub stop_extra: Option<i64>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub state: RecordingState,
    /// Failure text for recordings that did not complete cleanly.
    pub error: Option<String>,
    pub priority: Option<u32>,
    pub retention: Option<u32>,
    pub content_type: Option<u32>,
    pub event_id: Option<u32>,
    /// Series rule that created this entry.
    pub autorec_id: Option<String>,
    pub episode: Option<String>,
    pub data_size: Option<u64>,
    pub image: Option<String>,
}

impl Recording {
    /// Still waiting to start.
    pub fn is_timer(&self) -> bool {
        self.state == RecordingState::Scheduled
    }

    pub fn is_failed(&self) -> bool {
        match self.state {
            RecordingState::Missed | RecordingState::Invalid => true,
            RecordingState::Completed => self.error.is_some(),
            RecordingState::Scheduled | RecordingState::Recording => false,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == RecordingState::Recording
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.stop? - self.start?)
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }
}

/// A DVR entry joined with the channel it records from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingView {
    #[serde(flatten)]
    pub recording: Arc<Recording>,
    /// `None` when the channel is unknown to the cache.
    pub channel_name: Option<String>,
    pub channel_number: Option<String>,
}
