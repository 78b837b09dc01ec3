use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use crate::dmx::{UbKey, UNIVERSE_SIZE};

/// Authoritative DMX state for one (controller, universe) pair.
#[derive(Debug)]
pub struct UniverseBuffer {
    pub dmx: [u8; UNIVERSE_SIZE],
    pub dirty: bool,
    seq: u8,
    pub last_sent: Option<Instant>,
}

impl UniverseBuffer {
    fn new() -> UniverseBuffer {
        UniverseBuffer {
            dmx: [0; UNIVERSE_SIZE],
            dirty: false,
            seq: 0,
            last_sent: None,
        }
    }

    /// Advances the ArtNet sequence byte. Wraps 255 -> 1; 0 would tell the
    /// node to stop sequence checking, so it is never handed out.
    pub fn next_seq(&mut self) -> u8 {
        self.seq = if self.seq >= 255 { 1 } else { self.seq + 1 };
        self.seq
    }

    #[cfg(test)]
    pub fn set_seq(&mut self, seq: u8) {
        self.seq = seq;
    }
}

/// The set of live universe buffers, shared between router and emitter.
///
/// The outer map lock is held only for lookup, insert and prune; frame bytes
/// are only ever touched under the per-buffer mutex.
#[derive(Debug, Default)]
pub struct UniverseBuffers {
    map: RwLock<BTreeMap<UbKey, Arc<Mutex<UniverseBuffer>>>>,
}

impl UniverseBuffers {
    pub fn new() -> UniverseBuffers {
        UniverseBuffers::default()
    }

    pub fn get(&self, key: &UbKey) -> Option<Arc<Mutex<UniverseBuffer>>> {
        self.map.read().unwrap().get(key).cloned()
    }

    /// Buffers are created lazily, on the first write after a snapshot made
    /// their key addressable.
    pub fn get_or_create(&self, key: UbKey) -> Arc<Mutex<UniverseBuffer>> {
        if let Some(buffer) = self.map.read().unwrap().get(&key) {
            return buffer.clone();
        }

        self.map
            .write()
            .unwrap()
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(UniverseBuffer::new())))
            .clone()
    }

    /// Drops buffers no longer addressable by the active mapping. Called at
    /// the end of a snapshot swap.
    pub fn retain_keys(&self, keys: &BTreeSet<UbKey>) {
        self.map.write().unwrap().retain(|key, _| keys.contains(key));
    }

    /// Clones the current (key, buffer) pairs into `out`, sorted by key.
    /// `out` is caller-owned scratch so steady-state emitter passes reuse
    /// its capacity.
    pub fn collect_into(&self, out: &mut Vec<(UbKey, Arc<Mutex<UniverseBuffer>>)>) {
        out.clear();
        let map = self.map.read().unwrap();
        out.extend(map.iter().map(|(k, v)| (*k, v.clone())));
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().unwrap().is_empty()
    }
}
