// ── Series rule (autorec) domain types ──

use std::sync::Arc;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Day-of-week bitmask as used on the wire: Monday = bit 0 .. Sunday = bit 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weekdays(pub u32);

impl Weekdays {
    pub const ALL: Self = Self(0x7f);

    pub fn from_days(days: &[Weekday]) -> Self {
        Self(
            days.iter()
                .fold(0, |mask, d| mask | (1 << d.num_days_from_monday())),
        )
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn days(self) -> Vec<Weekday> {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .filter(|d| self.contains(*d))
        .collect()
    }
}

impl Default for Weekdays {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::fmt::Display for Weekdays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::ALL {
            return f.write_str("daily");
        }
        let names: Vec<String> = self.days().iter().map(ToString::to_string).collect();
        f.write_str(&names.join(","))
    }
}

/// A recurring recording rule as announced by `autorecEntryAdd`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesRule {
    /// Server-assigned identifier (a string on the wire).
    pub id: String,
    pub enabled: bool,
    pub name: Option<String>,
    /// Title match pattern.
    pub title: Option<String>,
    pub channel_id: Option<u32>,
    pub days_of_week: Weekdays,
    /// Minutes after midnight; `None` means any time.
    pub start: Option<u32>,
    pub start_window: Option<u32>,
    pub approx_time: Option<u32>,
    pub start_extra: Option<i64>,
    pub stop_extra: Option<i64>,
    /// Seconds.
    pub min_duration: Option<u32>,
    pub max_duration: Option<u32>,
    pub priority: Option<u32>,
    pub retention: Option<u32>,
    pub directory: Option<String>,
    pub comment: Option<String>,
    pub dup_detect: Option<u32>,
}

impl SeriesRule {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.title.as_deref())
            .unwrap_or("(unnamed)")
    }
}

/// A series rule joined with its channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRuleView {
    #[serde(flatten)]
    pub rule: Arc<SeriesRule>,
    /// `None` for rules matching any channel or an unknown one.
    pub channel_name: Option<String>,
}
