// ── Server status & stream descriptors ──

use std::sync::Arc;

use serde::Serialize;
use url::Url;

use super::channel::TunerInput;
use crate::sync::SyncState;

/// Snapshot of the server's identity, storage, and cache sizes.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    pub server_name: String,
    pub server_version: String,
    pub protocol_version: u32,
    pub capabilities: Vec<String>,
    pub free_bytes: u64,
    pub total_bytes: u64,
    pub sync_state: SyncState,
    pub channel_count: usize,
    pub recording_count: usize,
    pub timer_count: usize,
    pub series_count: usize,
    pub tuners: Vec<Arc<TunerInput>>,
}

/// A playable URL obtained through `getTicket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamInfo {
    pub url: Url,
    /// Server-relative path the ticket was issued for.
    pub path: String,
    pub ticket: String,
}
