use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::counters::Counters;
use crate::mapping::MappingSnapshot;
use crate::patch::PatchSnapshot;
use crate::universes::UniverseBuffers;

/// Root of all state shared by the receiver, router and emitter workers.
///
/// Snapshots are immutable once stored; swapping is a pointer write. The
/// router reads the mapping pointer once per update message, so a swap
/// during a batch only affects subsequent messages.
pub struct SharedState {
    mapping: RwLock<Arc<MappingSnapshot>>,
    patch: RwLock<Arc<PatchSnapshot>>,
    patch_enabled: AtomicBool,
    pub universes: UniverseBuffers,
    pub counters: Counters,
}

impl SharedState {
    pub fn new(mapping: MappingSnapshot, patch: PatchSnapshot) -> SharedState {
        let patch_enabled = patch.enabled;

        SharedState {
            mapping: RwLock::new(Arc::new(mapping)),
            patch: RwLock::new(Arc::new(patch)),
            patch_enabled: AtomicBool::new(patch_enabled),
            universes: UniverseBuffers::new(),
            counters: Counters::default(),
        }
    }

    pub fn mapping(&self) -> Arc<MappingSnapshot> {
        self.mapping.read().unwrap().clone()
    }

    pub fn publish_mapping(&self, snapshot: MappingSnapshot) {
        let snapshot = Arc::new(snapshot);
        let keys = snapshot.keys().clone();
        *self.mapping.write().unwrap() = snapshot;
        self.universes.retain_keys(&keys);
    }

    pub fn patch(&self) -> Arc<PatchSnapshot> {
        self.patch.read().unwrap().clone()
    }

    pub fn publish_patch(&self, snapshot: PatchSnapshot) {
        self.patch_enabled.store(snapshot.enabled, Ordering::Relaxed);
        *self.patch.write().unwrap() = Arc::new(snapshot);
    }

    pub fn patch_enabled(&self) -> bool {
        self.patch_enabled.load(Ordering::Relaxed)
    }

    pub fn set_patch_enabled(&self, enabled: bool) {
        self.patch_enabled.store(enabled, Ordering::Relaxed);
    }
}
