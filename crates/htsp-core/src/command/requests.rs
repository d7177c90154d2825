// ── Typed request structs for Command payloads ──
//
// Each struct knows how to render itself as the HTSP request it maps to.
// Absent optional fields are left off the wire so the server applies
// its own defaults.

use chrono::{DateTime, Utc};
use htsp_api::HtspMessage;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::Weekdays;

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::ValidationFailed {
        message: message.into(),
    }
}

// ── One-off timers ─────────────────────────────────────────────────

/// Schedule a single recording, either of a guide event or of a manual
/// channel/time window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerRequest {
    /// Record this guide event; channel and times come from the guide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// Minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_extra: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_extra: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<u32>,
    /// DVR profile name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_name: Option<String>,
}

impl TimerRequest {
    pub fn for_event(event_id: u32) -> Self {
        Self {
            event_id: Some(event_id),
            ..Self::default()
        }
    }

    pub fn manual(channel_id: u32, start: DateTime<Utc>, stop: DateTime<Utc>, title: impl Into<String>) -> Self {
        Self {
            channel_id: Some(channel_id),
            start: Some(start),
            stop: Some(stop),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub(crate) fn to_message(&self, default_priority: Option<u32>) -> Result<HtspMessage, CoreError> {
        let mut msg = HtspMessage::method("addDvrEntry");
        if let Some(event_id) = self.event_id {
            msg = msg.with("eventId", event_id);
        } else {
            let (Some(channel), Some(start), Some(stop)) = (self.channel_id, self.start, self.stop) else {
                return Err(invalid("a timer needs an event id or a channel with start and stop"));
            };
            if stop <= start {
                return Err(invalid("timer stop must be after start"));
            }
            msg = msg
                .with("channelId", channel)
                .with("start", start.timestamp())
                .with("stop", stop.timestamp());
        }
        Ok(msg
            .with_opt("title", self.title.as_deref())
            .with_opt("description", self.description.as_deref())
            .with_opt("priority", self.priority.or(default_priority))
            .with_opt("startExtra", self.start_extra)
            .with_opt("stopExtra", self.stop_extra)
            .with_opt("retention", self.retention)
            .with_opt("configName", self.config_name.as_deref()))
    }
}

/// Change fields of a pending timer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTimerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_extra: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_extra: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<u32>,
}

impl UpdateTimerRequest {
    pub(crate) fn to_message(&self, id: u32) -> Result<HtspMessage, CoreError> {
        if let (Some(start), Some(stop)) = (self.start, self.stop) {
            if stop <= start {
                return Err(invalid("timer stop must be after start"));
            }
        }
        Ok(HtspMessage::method("updateDvrEntry")
            .with("id", id)
            .with_opt("title", self.title.as_deref())
            .with_opt("description", self.description.as_deref())
            .with_opt("start", self.start.map(|t| t.timestamp()))
            .with_opt("stop", self.stop.map(|t| t.timestamp()))
            .with_opt("startExtra", self.start_extra)
            .with_opt("stopExtra", self.stop_extra)
            .with_opt("priority", self.priority)
            .with_opt("retention", self.retention))
    }
}

// ── Series timers ──────────────────────────────────────────────────

/// A recurring recording rule. Also used, in full, to replace an
/// existing rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesTimerRequest {
    /// Title match pattern.
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `None` matches every channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Weekdays>,
    /// Earliest start, minutes after midnight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    /// Latest start, minutes after midnight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_window: Option<u32>,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_extra: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_extra: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dup_detect: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl SeriesTimerRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub(crate) fn to_add_message(&self, default_priority: Option<u32>) -> Result<HtspMessage, CoreError> {
        self.render(HtspMessage::method("addAutorecEntry"), default_priority)
    }

    pub(crate) fn to_update_message(&self, id: &str) -> Result<HtspMessage, CoreError> {
        self.render(HtspMessage::method("updateAutorecEntry").with("id", id), None)
    }

    fn render(&self, msg: HtspMessage, default_priority: Option<u32>) -> Result<HtspMessage, CoreError> {
        if self.title.trim().is_empty() {
            return Err(invalid("a series timer needs a title"));
        }
        for minutes in [self.start, self.start_window].into_iter().flatten() {
            if minutes >= 24 * 60 {
                return Err(invalid(format!("{minutes} is not a time of day in minutes")));
            }
        }
        if let (Some(min), Some(max)) = (self.min_duration, self.max_duration) {
            if max < min {
                return Err(invalid("max duration is shorter than min duration"));
            }
        }
        Ok(msg
            .with("title", self.title.as_str())
            .with_opt("name", self.name.as_deref())
            .with_opt("channelId", self.channel_id)
            .with_opt("daysOfWeek", self.days_of_week.map(|d| d.0))
            .with_opt("start", self.start)
            .with_opt("startWindow", self.start_window)
            .with_opt("minDuration", self.min_duration)
            .with_opt("maxDuration", self.max_duration)
            .with_opt("priority", self.priority.or(default_priority))
            .with_opt("retention", self.retention)
            .with_opt("startExtra", self.start_extra)
            .with_opt("stopExtra", self.stop_extra)
            .with_opt("dupDetect", self.dup_detect)
            .with_opt("comment", self.comment.as_deref())
            .with_opt("enabled", self.enabled.map(u32::from)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn event_timer_uses_event_id() {
        let msg = TimerRequest::for_event(42).to_message(Some(2)).unwrap();
        assert_eq!(msg.method_name(), Some("addDvrEntry"));
        assert_eq!(msg.u32("eventId"), Some(42));
        assert_eq!(msg.u32("priority"), Some(2));
        assert!(!msg.contains("channelId"));
    }

    #[test]
    fn manual_timer_carries_window() {
        let msg = TimerRequest::manual(3, at(1_000), at(2_000), "Match")
            .to_message(None)
            .unwrap();
        assert_eq!(msg.u32("channelId"), Some(3));
        assert_eq!(msg.s64("start"), Some(1_000));
        assert_eq!(msg.s64("stop"), Some(2_000));
        assert_eq!(msg.str("title"), Some("Match"));
        assert!(!msg.contains("priority"));
    }

    #[test]
    fn manual_timer_rejects_inverted_window() {
        let result = TimerRequest::manual(3, at(2_000), at(1_000), "x").to_message(None);
        assert!(matches!(result, Err(CoreError::ValidationFailed { .. })));
        assert!(TimerRequest::default().to_message(None).is_err());
    }

    #[test]
    fn update_only_sends_present_fields() {
        let update = UpdateTimerRequest {
            stop_extra: Some(10),
            ..UpdateTimerRequest::default()
        };
        let msg = update.to_message(7).unwrap();
        assert_eq!(msg.u32("id"), Some(7));
        assert_eq!(msg.s64("stopExtra"), Some(10));
        assert!(!msg.contains("title"));
    }

    #[test]
    fn series_timer_renders_rule() {
        let request = SeriesTimerRequest {
            channel_id: Some(1),
            days_of_week: Some(Weekdays(0x1f)),
            start: Some(20 * 60),
            enabled: Some(true),
            ..SeriesTimerRequest::new("News")
        };
        let add = request.to_add_message(None).unwrap();
        assert_eq!(add.method_name(), Some("addAutorecEntry"));
        assert_eq!(add.u32("daysOfWeek"), Some(0x1f));
        assert_eq!(add.u32("start"), Some(1200));
        assert_eq!(add.bool("enabled"), Some(true));

        let update = request.to_update_message("abc").unwrap();
        assert_eq!(update.method_name(), Some("updateAutorecEntry"));
        assert_eq!(update.str("id"), Some("abc"));
    }

    #[test]
    fn series_timer_validation() {
        assert!(SeriesTimerRequest::new(" ").to_add_message(None).is_err());
        let late = SeriesTimerRequest {
            start: Some(1440),
            ..SeriesTimerRequest::new("x")
        };
        assert!(late.to_add_message(None).is_err());
    }
}
