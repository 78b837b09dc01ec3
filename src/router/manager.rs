use log::{info, trace};
use std::sync::{Arc, Mutex};

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::counters::Counters;
use crate::dmx::{ChannelLayout, ColorSample, UbKey};
use crate::ehub::UpdateMessage;
use crate::state::SharedState;
use crate::universes::UniverseBuffer;

#[derive(Debug, Clone, Copy)]
struct ResolvedWrite {
    buffer_index: usize,
    channel_start: u16,
    layout: ChannelLayout,
    color: ColorSample,
}

/// Applies decoded updates to the universe buffers through the active
/// mapping snapshot.
pub struct RouterManager {
    shared: Arc<SharedState>,

    // Reused between updates so the steady-state path does not allocate.
    scratch_keys: Vec<UbKey>,
    scratch_buffers: Vec<Arc<Mutex<UniverseBuffer>>>,
    scratch_writes: Vec<ResolvedWrite>,
}

impl RouterManager {
    pub fn new(shared: Arc<SharedState>) -> RouterManager {
        RouterManager {
            shared,
            scratch_keys: Vec::new(),
            scratch_buffers: Vec::new(),
            scratch_writes: Vec::new(),
        }
    }

    /// Routes one update message. Entities are applied in sender order, the
    /// last write to a byte wins, and all writes landing on one universe
    /// happen under a single hold of that buffer's lock so the emitter never
    /// sees a half-applied update.
    pub fn apply_update(&mut self, update: &UpdateMessage) {
        // One pointer read per message; a swap mid-batch affects only later
        // messages.
        let mapping = self.shared.mapping();

        self.scratch_keys.clear();
        self.scratch_buffers.clear();
        self.scratch_writes.clear();

        for entity in &update.entities {
            let (key, channel_start, layout) = match mapping.resolve(entity.id) {
                Some(resolved) => resolved,
                None => {
                    trace!("Entity {} is not mapped", entity.id);
                    Counters::bump(&self.shared.counters.unmapped_entities);
                    continue;
                }
            };

            let buffer_index = match self.scratch_keys.iter().position(|k| *k == key) {
                Some(index) => index,
                None => {
                    self.scratch_keys.push(key);
                    self.scratch_buffers.push(self.shared.universes.get_or_create(key));
                    self.scratch_keys.len() - 1
                }
            };

            self.scratch_writes.push(ResolvedWrite {
                buffer_index,
                channel_start,
                layout,
                color: entity.color,
            });
        }

        for (buffer_index, buffer) in self.scratch_buffers.iter().enumerate() {
            let mut guard = buffer.lock().unwrap();

            for write in self.scratch_writes.iter().filter(|w| w.buffer_index == buffer_index) {
                write.layout.write(write.channel_start, &write.color, &mut guard.dmx);
            }
            guard.dirty = true;
        }

        if !self.scratch_writes.is_empty() {
            Counters::bump(&self.shared.counters.updates_applied);
        }
    }

    pub async fn run(
        &mut self,
        cancel: CancellationToken,
        ingest: async_channel::Receiver<UpdateMessage>,
    ) {
        info!("Router worker started");

        loop {
            select! {
                _ = cancel.cancelled() => break,

                update = ingest.recv() => match update {
                    Err(_) => break,
                    Ok(update) => self.apply_update(&update),
                },
            }
        }

        info!("Router worker stopped");
    }
}
