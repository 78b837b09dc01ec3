use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hot-path tallies. Incremented with relaxed ordering from any worker;
/// `snapshot` gives observers a consistent-enough point-in-time view.
#[derive(Debug, Default)]
pub struct Counters {
    pub malformed_inputs: AtomicU64,
    pub unknown_message_types: AtomicU64,
    pub filtered_messages: AtomicU64,
    pub unmapped_entities: AtomicU64,
    pub backpressure_drops: AtomicU64,
    pub updates_applied: AtomicU64,
    pub packets_sent: AtomicU64,
    pub send_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub malformed_inputs: u64,
    pub unknown_message_types: u64,
    pub filtered_messages: u64,
    pub unmapped_entities: u64,
    pub backpressure_drops: u64,
    pub updates_applied: u64,
    pub packets_sent: u64,
    pub send_failures: u64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            malformed_inputs: self.malformed_inputs.load(Ordering::Relaxed),
            unknown_message_types: self.unknown_message_types.load(Ordering::Relaxed),
            filtered_messages: self.filtered_messages.load(Ordering::Relaxed),
            unmapped_entities: self.unmapped_entities.load(Ordering::Relaxed),
            backpressure_drops: self.backpressure_drops.load(Ordering::Relaxed),
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }
}
