use serde::Deserialize;
use std::net::IpAddr;

use crate::dmx::ColorComponent;

/// One contiguous block of entity IDs mapped onto a DMX channel range.
///
/// Accepted as JSON objects `{ from, to, controller_ip, universe,
/// channel_start?, channels? }`; tabular exports with the same columns are
/// converted to this shape before they reach the service.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingRangeDef {
    pub from: u32,
    pub to: u32,
    pub controller_ip: IpAddr,
    pub universe: u16,
    #[serde(default = "default_channel_start")]
    pub channel_start: u16,
    #[serde(default = "default_channels")]
    pub channels: Vec<ColorComponent>,
}

fn default_channel_start() -> u16 {
    1
}

fn default_channels() -> Vec<ColorComponent> {
    vec![ColorComponent::R, ColorComponent::G, ColorComponent::B]
}

/// After the router fills a frame, copy `src_channel` over `dst_channel`
/// within `universe`. Channels are 1-based.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchRuleDef {
    pub universe: u16,
    pub src_channel: u16,
    pub dst_channel: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchConfig {
    #[serde(default)]
    pub rules: Vec<PatchRuleDef>,
    #[serde(default)]
    pub enabled: bool,
}

/// Runtime tuning knobs. All fields have defaults so a configuration file
/// may specify only what it overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// Emitter cadence.
    pub emit_interval_ms: u64,
    /// Global outbound packet budget.
    pub max_pps: u32,
    /// Per-universe hold-down between two sends. 0 disables.
    pub per_universe_min_interval_ms: u64,
    /// Receiver → router queue depth; overflow drops the oldest message.
    pub ingest_queue_capacity: usize,
    /// Depth of each subscriber queue; overflow drops the oldest event.
    pub observer_queue_capacity: usize,
    /// When set, drop eHuB messages whose universe field is present and
    /// different. Mapping stays authoritative for addressing either way.
    pub filter_universe: Option<u16>,
    /// Destination UDP port for ArtNet packets.
    pub artnet_port: u16,
    /// Re-send a clean universe after this long so controllers holding the
    /// last frame do not time out. 0 disables.
    pub keepalive_interval_ms: u64,
    /// Keep all bookkeeping but skip the actual socket write.
    pub disable_send: bool,
}

impl Default for RouterOptions {
    fn default() -> RouterOptions {
        RouterOptions {
            emit_interval_ms: 25,
            max_pps: 1000,
            per_universe_min_interval_ms: 0,
            ingest_queue_capacity: 1024,
            observer_queue_capacity: 1024,
            filter_universe: None,
            artnet_port: 6454,
            keepalive_interval_ms: 4000,
            disable_send: false,
        }
    }
}

#[cfg(test)]
mod test_defs {
    use super::*;
    use crate::dmx::ColorComponent;

    #[test]
    fn test_mapping_range_defaults() {
        let def = serde_json::from_str::<MappingRangeDef>(
            r#"{ "from": 1, "to": 170, "controller_ip": "10.0.0.1", "universe": 3 }"#,
        )
        .unwrap();

        assert_eq!(def.channel_start, 1);
        assert_eq!(
            def.channels,
            vec![ColorComponent::R, ColorComponent::G, ColorComponent::B]
        );
    }

    #[test]
    fn test_mapping_range_explicit() {
        let def = serde_json::from_str::<MappingRangeDef>(
            r#"{ "from": 10, "to": 10, "controller_ip": "10.0.0.1", "universe": 0,
                 "channel_start": 5, "channels": ["R", "G", "B", "W"] }"#,
        )
        .unwrap();

        assert_eq!(def.channel_start, 5);
        assert_eq!(def.channels.len(), 4);
    }

    #[test]
    fn test_options_defaults() {
        let options = serde_json::from_str::<RouterOptions>("{}").unwrap();

        assert_eq!(options.emit_interval_ms, 25);
        assert_eq!(options.max_pps, 1000);
        assert_eq!(options.per_universe_min_interval_ms, 0);
        assert_eq!(options.observer_queue_capacity, 1024);
        assert_eq!(options.artnet_port, 6454);
        assert_eq!(options.filter_universe, None);
        assert!(!options.disable_send);
    }
}
