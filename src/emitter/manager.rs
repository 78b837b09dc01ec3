use error_stack::{Result, ResultExt};
use log::{debug, info, warn};
use std::{
    collections::HashMap,
    net::{IpAddr, UdpSocket},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::{select, time::interval};
use tokio_util::sync::CancellationToken;

use super::packet;
use super::rate::TokenBucket;
use super::EmitterError;
use crate::{
    counters::Counters,
    defs::RouterOptions,
    dmx::{UbKey, UNIVERSE_SIZE},
    messages::RouterEvent,
    observer::EventBus,
    state::SharedState,
    universes::UniverseBuffer,
};

/// One outbound socket per controller, bound to an ephemeral port and
/// connected to the controller's ArtNet endpoint.
#[derive(Debug)]
pub(super) struct ArtnetController {
    socket: UdpSocket,
}

impl ArtnetController {
    pub fn new(controller: &IpAddr, port: u16) -> Result<ArtnetController, EmitterError> {
        let into_context =
            || EmitterError::Context(format!("Creating ArtNet controller at {}", controller));

        let socket = UdpSocket::bind("0.0.0.0:0").change_context_lazy(into_context)?;
        socket
            .connect((*controller, port))
            .change_context_lazy(into_context)?;

        Ok(ArtnetController { socket })
    }

    pub fn send(&self, packet_bytes: &[u8]) -> Result<(), EmitterError> {
        self.socket
            .send(packet_bytes)
            .change_context_lazy(|| EmitterError::Context(String::from("Sending ArtNet packet")))?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug)]
pub(super) struct SentPacket {
    pub key: UbKey,
    pub bytes: Vec<u8>,
}

/// Drains dirty universes to ArtNet packets on a fixed cadence, under the
/// global packet budget.
pub struct EmitterManager {
    shared: Arc<SharedState>,
    bus: Arc<EventBus>,

    emit_interval: Duration,
    min_interval: Duration,
    keepalive: Duration,
    artnet_port: u16,
    disable_send: bool,

    bucket: TokenBucket,
    controllers: HashMap<IpAddr, ArtnetController>,
    last_served: Option<UbKey>,

    scratch_buffers: Vec<(UbKey, Arc<Mutex<UniverseBuffer>>)>,
    send_frame: [u8; UNIVERSE_SIZE],
    packet_bytes: [u8; packet::PACKET_SIZE],

    #[cfg(test)]
    pub(super) sent_log: Vec<SentPacket>,
}

impl EmitterManager {
    pub fn new(shared: Arc<SharedState>, bus: Arc<EventBus>, options: &RouterOptions) -> EmitterManager {
        let emit_interval = Duration::from_millis(options.emit_interval_ms.max(1));

        EmitterManager {
            shared,
            bus,
            emit_interval,
            min_interval: Duration::from_millis(options.per_universe_min_interval_ms),
            keepalive: Duration::from_millis(options.keepalive_interval_ms),
            artnet_port: options.artnet_port,
            disable_send: options.disable_send,
            bucket: TokenBucket::new(options.max_pps, emit_interval),
            controllers: HashMap::new(),
            last_served: None,
            scratch_buffers: Vec::new(),
            send_frame: [0; UNIVERSE_SIZE],
            packet_bytes: [0; packet::PACKET_SIZE],
            #[cfg(test)]
            sent_log: Vec::new(),
        }
    }

    /// One emit pass: at most one packet per universe, newest state only,
    /// deferred universes stay dirty and coalesce into the next pass.
    pub fn emit_pass(&mut self, now: Instant) {
        let sendable = self.bucket.begin_tick(now);
        let patch = self.shared.patch();
        let patch_enabled = self.shared.patch_enabled();

        self.shared.universes.collect_into(&mut self.scratch_buffers);
        if self.scratch_buffers.is_empty() {
            self.bucket.spend(0);
            return;
        }

        // Round-robin: resume after the universe served last, so a tight
        // budget rotates instead of starving the tail of the key order.
        let start = match self.last_served {
            None => 0,
            Some(last) => self
                .scratch_buffers
                .iter()
                .position(|(key, _)| *key > last)
                .unwrap_or(0),
        };

        let mut sent = 0u64;
        for i in 0..self.scratch_buffers.len() {
            if sent >= sendable {
                break;
            }

            let index = (start + i) % self.scratch_buffers.len();
            let key = self.scratch_buffers[index].0;
            let buffer = self.scratch_buffers[index].1.clone();

            let sequence = {
                let mut guard = buffer.lock().unwrap();

                let due_keepalive = !self.keepalive.is_zero()
                    && guard
                        .last_sent
                        .map_or(false, |at| now.saturating_duration_since(at) >= self.keepalive);
                if !guard.dirty && !due_keepalive {
                    continue;
                }

                let held_down = !self.min_interval.is_zero()
                    && guard
                        .last_sent
                        .map_or(false, |at| now.saturating_duration_since(at) < self.min_interval);
                if held_down {
                    continue;
                }

                self.send_frame.copy_from_slice(&guard.dmx);
                guard.dirty = false;
                guard.last_sent = Some(now);
                guard.next_seq()
            };

            if patch_enabled {
                patch.apply(key.universe, &mut self.send_frame);
            }
            packet::encode(key.universe, sequence, &self.send_frame, &mut self.packet_bytes);

            self.send_packet(key, sequence);
            sent += 1;
            self.last_served = Some(key);
        }

        self.bucket.spend(sent);

        // Sockets for controllers the mapping no longer references are of no
        // further use.
        let live = &self.scratch_buffers;
        self.controllers
            .retain(|ip, _| live.iter().any(|(key, _)| key.controller == *ip));
    }

    fn send_packet(&mut self, key: UbKey, sequence: u8) {
        debug!("Sending packet to {} (seq {})", key, sequence);

        #[cfg(test)]
        self.sent_log.push(SentPacket {
            key,
            bytes: self.packet_bytes.to_vec(),
        });

        if !self.disable_send {
            let controller = match self.controllers.entry(key.controller) {
                std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::hash_map::Entry::Vacant(entry) => {
                    match ArtnetController::new(&key.controller, self.artnet_port) {
                        Ok(controller) => entry.insert(controller),
                        Err(e) => {
                            warn!("Cannot reach controller {}: {:?}", key.controller, e);
                            Counters::bump(&self.shared.counters.send_failures);
                            self.bus.publish(RouterEvent::SendFailed {
                                controller: key.controller,
                                universe: key.universe,
                            });
                            return;
                        }
                    }
                }
            };

            if let Err(e) = controller.send(&self.packet_bytes) {
                warn!("Send to {} failed: {:?}", key, e);
                Counters::bump(&self.shared.counters.send_failures);
                self.bus.publish(RouterEvent::SendFailed {
                    controller: key.controller,
                    universe: key.universe,
                });
                return;
            }
        }

        Counters::bump(&self.shared.counters.packets_sent);
        self.bus.publish(RouterEvent::PacketSent {
            controller: key.controller,
            universe: key.universe,
            sequence,
        });
    }

    pub async fn run(&mut self, cancel: CancellationToken) {
        info!("Emitter worker started ({} ms cadence)", self.emit_interval.as_millis());

        let mut tick_timer = interval(self.emit_interval);

        loop {
            select! {
                _ = cancel.cancelled() => break,

                _ = tick_timer.tick() => self.emit_pass(Instant::now()),
            }
        }

        info!("Emitter worker stopped");
    }
}
