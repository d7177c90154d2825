// ── Channel domain types ──

use serde::{Deserialize, Serialize};

/// Broad channel category, inferred from the service types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[non_exhaustive]
pub enum ChannelKind {
    Tv,
    Radio,
    #[default]
    Unknown,
}

/// One source service feeding a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelService {
    /// Full service path, `network/mux/service`.
    pub name: String,
    /// `SDTV`, `HDTV`, `UHDTV`, `Radio`, ...
    pub service_type: String,
    pub ca_name: Option<String>,
}

impl ChannelService {
    /// The input the service is received on: the first path segment.
    pub fn tuner_name(&self) -> &str {
        self.name.split('/').next().map_or("", str::trim)
    }

    pub fn kind(&self) -> ChannelKind {
        match self.service_type.as_str() {
            "Radio" => ChannelKind::Radio,
            "" => ChannelKind::Unknown,
            _ => ChannelKind::Tv,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.ca_name.is_some()
    }
}

/// A tunable channel as announced by `channelAdd`/`channelUpdate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u32,
    pub number: u32,
    pub sub_number: Option<u32>,
    pub name: String,
    pub icon: Option<String>,
    pub now_event_id: Option<u32>,
    pub next_event_id: Option<u32>,
    pub tag_ids: Vec<u32>,
    pub services: Vec<ChannelService>,
}

impl Channel {
    pub fn kind(&self) -> ChannelKind {
        self.services
            .iter()
            .map(ChannelService::kind)
            .find(|k| *k != ChannelKind::Unknown)
            .unwrap_or_default()
    }

    /// `12` or `12.1` when a minor number is set.
    pub fn display_number(&self) -> String {
        match self.sub_number {
            Some(minor) if minor > 0 => format!("{}.{minor}", self.number),
            _ => self.number.to_string(),
        }
    }

    /// Distinct tuner inputs this channel can be received on.
    pub fn tuner_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services
            .iter()
            .map(ChannelService::tuner_name)
            .filter(|n| !n.is_empty())
            .map(str::to_owned)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn is_encrypted(&self) -> bool {
        !self.services.is_empty() && self.services.iter().all(ChannelService::is_encrypted)
    }
}

/// A receiving input, derived from the services of every known channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunerInput {
    pub name: String,
    /// Channels receivable on this input, ascending.
    pub channel_ids: Vec<u32>,
    pub service_types: Vec<String>,
}

impl TunerInput {
    pub fn channel_count(&self) -> usize {
        self.channel_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, kind: &str) -> ChannelService {
        ChannelService {
            name: name.into(),
            service_type: kind.into(),
            ca_name: None,
        }
    }

    #[test]
    fn tuner_name_is_first_path_segment() {
        assert_eq!(service("DVB-T Network/506MHz/BBC ONE", "SDTV").tuner_name(), "DVB-T Network");
        assert_eq!(service("IPTV", "HDTV").tuner_name(), "IPTV");
    }

    #[test]
    fn kind_prefers_first_known_service() {
        let channel = Channel {
            services: vec![service("a/b/c", ""), service("r/b/c", "Radio")],
            ..Channel::default()
        };
        assert_eq!(channel.kind(), ChannelKind::Radio);
        assert_eq!(Channel::default().kind(), ChannelKind::Unknown);
    }

    #[test]
    fn display_number_includes_minor() {
        let mut channel = Channel {
            number: 5,
            ..Channel::default()
        };
        assert_eq!(channel.display_number(), "5");
        channel.sub_number = Some(2);
        assert_eq!(channel.display_number(), "5.2");
    }

    #[test]
    fn tuner_names_are_distinct_and_sorted() {
        let channel = Channel {
            services: vec![
                service("Sat/11000H/X", "HDTV"),
                service("Cable/330MHz/X", "HDTV"),
                service("Sat/12000V/X", "SDTV"),
            ],
            ..Channel::default()
        };
        assert_eq!(channel.tuner_names(), vec!["Cable".to_owned(), "Sat".to_owned()]);
    }
}
