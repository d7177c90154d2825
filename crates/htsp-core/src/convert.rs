// ── Wire-to-domain conversions ──
//
// Bridges raw `HtspMessage` field maps into `htsp_core::model` types.
// Add events carry a full record; update events carry only the fields
// that changed, so every conversion is an in-place merge that leaves
// absent fields untouched.

use std::fmt::Display;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use htsp_api::{HtspMessage, Value};
use tracing::debug;

use crate::model::{Channel, ChannelService, Program, Recording, RecordingState, SeriesRule, Weekdays};

/// An entity kind kept in an [`EntityCache`](crate::store::EntityCache)
/// and maintained from push events.
pub trait HtspEntity: Clone + Default + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Ord + Display + Send + Sync + 'static;

    /// Short name used in logs.
    const KIND: &'static str;

    /// Extract the identifier from an add, update, or delete event.
    fn key_of(message: &HtspMessage) -> Option<Self::Key>;

    fn key(&self) -> Self::Key;

    /// A blank entity carrying only its identifier.
    fn with_key(key: Self::Key) -> Self;

    /// Merge the fields present in `message` into `self`.
    fn apply(&mut self, message: &HtspMessage);
}

// ── Helpers ────────────────────────────────────────────────────────

/// Convert an epoch-seconds field to `DateTime<Utc>`.
pub(crate) fn epoch(message: &HtspMessage, name: &str) -> Option<DateTime<Utc>> {
    message
        .s64(name)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
}

fn merge_str(target: &mut Option<String>, message: &HtspMessage, name: &str) {
    if let Some(v) = message.str(name) {
        *target = Some(v.to_owned());
    }
}

fn merge_u32(target: &mut Option<u32>, message: &HtspMessage, name: &str) {
    if let Some(v) = message.u32(name) {
        *target = Some(v);
    }
}

fn merge_i64(target: &mut Option<i64>, message: &HtspMessage, name: &str) {
    if let Some(v) = message.s64(name) {
        *target = Some(v);
    }
}

fn merge_time(target: &mut Option<DateTime<Utc>>, message: &HtspMessage, name: &str) {
    if let Some(v) = epoch(message, name) {
        *target = Some(v);
    }
}

/// Minutes-of-day fields use a negative value for "any".
fn merge_minutes(target: &mut Option<u32>, message: &HtspMessage, name: &str) {
    if message.contains(name) {
        *target = message.u32(name);
    }
}

fn parse_service(value: &Value) -> Option<ChannelService> {
    let map = value.as_map()?;
    Some(ChannelService {
        name: map.str("name").unwrap_or_default().to_owned(),
        service_type: map.str("type").unwrap_or_default().to_owned(),
        ca_name: map.str("caname").map(str::to_owned),
    })
}

// ── Channel ────────────────────────────────────────────────────────

impl HtspEntity for Channel {
    type Key = u32;
    const KIND: &'static str = "channel";

    fn key_of(message: &HtspMessage) -> Option<u32> {
        message.u32("channelId")
    }

    fn key(&self) -> u32 {
        self.id
    }

    fn with_key(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn apply(&mut self, message: &HtspMessage) {
        if let Some(number) = message.u32("channelNumber") {
            self.number = number;
        }
        merge_u32(&mut self.sub_number, message, "channelNumberMinor");
        if let Some(name) = message.str("channelName") {
            name.clone_into(&mut self.name);
        }
        merge_str(&mut self.icon, message, "channelIcon");
        merge_u32(&mut self.now_event_id, message, "eventId");
        merge_u32(&mut self.next_event_id, message, "nextEventId");
        if let Some(tags) = message.list("tags") {
            self.tag_ids = tags
                .iter()
                .filter_map(Value::as_s64)
                .filter_map(|t| u32::try_from(t).ok())
                .collect();
        }
        if let Some(services) = message.list("services") {
            self.services = services.iter().filter_map(parse_service).collect();
        }
    }
}

// ── Recording ──────────────────────────────────────────────────────

impl HtspEntity for Recording {
    type Key = u32;
    const KIND: &'static str = "dvr entry";

    fn key_of(message: &HtspMessage) -> Option<u32> {
        message.u32("id")
    }

    fn key(&self) -> u32 {
        self.id
    }

    fn with_key(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn apply(&mut self, message: &HtspMessage) {
        merge_u32(&mut self.channel_id, message, "channel");
        merge_time(&mut self.start, message, "start");
        merge_time(&mut self.stop, message, "stop");
        merge_i64(&mut self.start_extra, message, "startExtra");
        merge_i64(&mut self.stop_extra, message, "stopExtra");
        merge_str(&mut self.title, message, "title");
        merge_str(&mut self.subtitle, message, "subtitle");
        merge_str(&mut self.summary, message, "summary");
        merge_str(&mut self.description, message, "description");
        if let Some(state) = message.str("state") {
            self.state = state.parse().unwrap_or_else(|_| {
                debug!(id = self.id, state, "unrecognised dvr state");
                RecordingState::Invalid
            });
        }
        merge_str(&mut self.error, message, "error");
        merge_u32(&mut self.priority, message, "priority");
        merge_u32(&mut self.retention, message, "retention");
        merge_u32(&mut self.content_type, message, "contentType");
        merge_u32(&mut self.event_id, message, "eventId");
        merge_str(&mut self.autorec_id, message, "autorecId");
        merge_str(&mut self.episode, message, "episode");
        if let Some(size) = message.s64("dataSize").and_then(|s| u64::try_from(s).ok()) {
            self.data_size = Some(size);
        }
        merge_str(&mut self.image, message, "image");
    }
}

// ── Series rule ────────────────────────────────────────────────────

impl HtspEntity for SeriesRule {
    type Key = String;
    const KIND: &'static str = "autorec entry";

    fn key_of(message: &HtspMessage) -> Option<String> {
        message.str("id").map(str::to_owned)
    }

    fn key(&self) -> String {
        self.id.clone()
    }

    fn with_key(id: String) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn apply(&mut self, message: &HtspMessage) {
        if let Some(enabled) = message.bool("enabled") {
            self.enabled = enabled;
        }
        merge_str(&mut self.name, message, "name");
        merge_str(&mut self.title, message, "title");
        merge_u32(&mut self.channel_id, message, "channel");
        if let Some(days) = message.u32("daysOfWeek") {
            self.days_of_week = Weekdays(days);
        }
        merge_minutes(&mut self.start, message, "start");
        merge_minutes(&mut self.start_window, message, "startWindow");
        merge_minutes(&mut self.approx_time, message, "approxTime");
        merge_i64(&mut self.start_extra, message, "startExtra");
        merge_i64(&mut self.stop_extra, message, "stopExtra");
        merge_u32(&mut self.min_duration, message, "minDuration");
        merge_u32(&mut self.max_duration, message, "maxDuration");
        merge_u32(&mut self.priority, message, "priority");
        merge_u32(&mut self.retention, message, "retention");
        merge_str(&mut self.directory, message, "directory");
        merge_str(&mut self.comment, message, "comment");
        merge_u32(&mut self.dup_detect, message, "dupDetect");
    }
}

// ── Program ────────────────────────────────────────────────────────

impl Program {
    /// Build from one element of a `getEvents` reply.
    pub(crate) fn from_message(message: &HtspMessage) -> Option<Self> {
        Some(Self {
            event_id: message.u32("eventId")?,
            channel_id: message.u32("channelId").unwrap_or_default(),
            start: epoch(message, "start"),
            stop: epoch(message, "stop"),
            title: message.str("title").map(str::to_owned),
            subtitle: message.str("subtitle").map(str::to_owned),
            summary: message.str("summary").map(str::to_owned),
            description: message.str("description").map(str::to_owned),
            content_type: message.u32("contentType"),
            season_number: message.u32("seasonNumber"),
            episode_number: message.u32("episodeNumber"),
            image: message.str("image").map(str::to_owned),
            dvr_id: message.u32("dvrId"),
        })
    }
}
