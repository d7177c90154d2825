// ── EPG program ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One guide entry returned by `getEvents`. Programs are fetched on
/// demand and never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub event_id: u32,
    pub channel_id: u32,
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub content_type: Option<u32>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub image: Option<String>,
    /// DVR entry already scheduled for this program.
    pub dvr_id: Option<u32>,
}

impl Program {
    /// Whether any part of the program falls inside `[from, to)`.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) => start < to && stop > from,
            (Some(start), None) => start < to && start >= from,
            _ => false,
        }
    }
}
