use std::collections::BTreeSet;
use std::net::IpAddr;

use super::error::MappingError;
use crate::defs::MappingRangeDef;
use crate::dmx::{ChannelLayout, UbKey, MAX_UNIVERSE, UNIVERSE_SIZE};

#[derive(Debug, Clone)]
struct MappingRange {
    from: u32,
    to: u32,
    controller: IpAddr,
    universe: u16,
    channel_start: u16,
    layout: ChannelLayout,
}

/// Immutable entity → channel lookup table. Built once by `validate`,
/// published behind an `Arc`, and read by the router on every update.
#[derive(Debug)]
pub struct MappingSnapshot {
    /// Sorted by `from`; ranges never overlap.
    ranges: Vec<MappingRange>,
    keys: BTreeSet<UbKey>,
}

impl MappingSnapshot {
    /// Checks a raw range list and derives the lookup index. A rejected list
    /// leaves whatever snapshot is currently published untouched.
    pub fn validate(defs: &[MappingRangeDef]) -> Result<MappingSnapshot, MappingError> {
        let mut ranges = Vec::with_capacity(defs.len());
        let mut keys = BTreeSet::new();

        for def in defs {
            if def.from < 1 || def.from > def.to {
                return Err(MappingError::InvalidRange(def.from, def.to));
            }

            let layout = ChannelLayout::from_components(&def.channels).ok_or_else(|| {
                let letters = def
                    .channels
                    .iter()
                    .map(|c| format!("{:?}", c))
                    .collect::<Vec<String>>()
                    .join(",");
                MappingError::BadLayout(letters)
            })?;

            if def.universe > MAX_UNIVERSE {
                return Err(MappingError::UniverseOutOfRange(def.universe));
            }

            let entity_count = (def.to - def.from + 1) as u64;
            let last_channel = def.channel_start as u64 + layout.len() as u64 * entity_count - 1;
            if def.channel_start < 1 || last_channel > UNIVERSE_SIZE as u64 {
                return Err(MappingError::ChannelOutOfRange(
                    def.from,
                    def.to,
                    def.channel_start as u32,
                    last_channel.min(u32::MAX as u64) as u32,
                ));
            }

            keys.insert(UbKey {
                controller: def.controller_ip,
                universe: def.universe,
            });
            ranges.push(MappingRange {
                from: def.from,
                to: def.to,
                controller: def.controller_ip,
                universe: def.universe,
                channel_start: def.channel_start,
                layout,
            });
        }

        ranges.sort_by_key(|r| r.from);
        for pair in ranges.windows(2) {
            if pair[0].to >= pair[1].from {
                return Err(MappingError::Overlap(
                    pair[0].from,
                    pair[0].to,
                    pair[1].from,
                    pair[1].to,
                ));
            }
        }

        Ok(MappingSnapshot { ranges, keys })
    }

    /// Resolves an entity ID to its universe buffer, first DMX channel and
    /// layout. O(log R) over the sorted ranges.
    pub fn resolve(&self, id: u32) -> Option<(UbKey, u16, ChannelLayout)> {
        let idx = self.ranges.partition_point(|r| r.from <= id);
        if idx == 0 {
            return None;
        }

        let range = &self.ranges[idx - 1];
        if id > range.to {
            return None;
        }

        let offset = range.channel_start + (id - range.from) as u16 * range.layout.len();
        Some((
            UbKey {
                controller: range.controller,
                universe: range.universe,
            },
            offset,
            range.layout,
        ))
    }

    /// All universe buffers this snapshot can address.
    pub fn keys(&self) -> &BTreeSet<UbKey> {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }
}
