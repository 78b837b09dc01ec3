use log::{debug, error, info, trace};
use std::sync::Arc;
use tokio::{net::UdpSocket, select};
use tokio_util::sync::CancellationToken;

use crate::counters::Counters;
use crate::ehub::{self, EhubMessage, UpdateMessage, MAX_DATAGRAM};
use crate::messages::RouterEvent;
use crate::observer::EventBus;
use crate::state::SharedState;

/// Receives eHuB datagrams, decodes them and hands updates to the router.
///
/// The receiver and decoder are fused into one task; the ingest queue in
/// between is bounded and drops its oldest message when the router falls
/// behind a burst.
pub async fn run(
    cancel: CancellationToken,
    socket: UdpSocket,
    to_router: async_channel::Sender<UpdateMessage>,
    shared: Arc<SharedState>,
    bus: Arc<EventBus>,
    filter_universe: Option<u16>,
) {
    info!("Receiver worker started on {:?}", socket.local_addr().ok());

    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        select! {
            _ = cancel.cancelled() => break,

            received = socket.recv_from(&mut buf) => match received {
                Ok((len, _peer)) => {
                    handle_datagram(&buf[..len], &to_router, &shared, &bus, filter_universe);
                }

                Err(e) => {
                    // A listener that cannot receive is as dead as a failed
                    // bind; stop the whole pipeline.
                    error!("eHuB socket receive failed: {}", e);
                    bus.publish(RouterEvent::Fatal {
                        reason: format!("eHuB socket receive failed: {}", e),
                    });
                    cancel.cancel();
                    break;
                }
            }
        }
    }

    info!("Receiver worker stopped");
}

fn handle_datagram(
    datagram: &[u8],
    to_router: &async_channel::Sender<UpdateMessage>,
    shared: &Arc<SharedState>,
    bus: &Arc<EventBus>,
    filter_universe: Option<u16>,
) {
    let message = match ehub::decode(datagram) {
        Ok(message) => message,
        Err(e) => {
            debug!("Dropping malformed datagram: {}", e);
            let kind = e.kind();
            match kind {
                ehub::MalformedKind::UnknownType => {
                    Counters::bump(&shared.counters.unknown_message_types)
                }
                _ => Counters::bump(&shared.counters.malformed_inputs),
            }
            bus.publish(RouterEvent::InputMalformed { kind });
            return;
        }
    };

    // The message universe is a filter only; the mapping stays authoritative
    // for where entities actually land.
    if let Some(wanted) = filter_universe {
        let universe = match &message {
            EhubMessage::Update(u) => u.universe,
            EhubMessage::Config(c) => c.universe,
        };
        if let Some(universe) = universe {
            if universe != wanted {
                trace!("Dropping message for filtered universe {}", universe);
                Counters::bump(&shared.counters.filtered_messages);
                return;
            }
        }
    }

    match message {
        EhubMessage::Update(update) => {
            bus.publish(RouterEvent::UpdateDecoded {
                universe: update.universe,
                entities: update.entities.len(),
            });

            match to_router.force_send(update) {
                Ok(None) => {}
                Ok(Some(_displaced)) => {
                    debug!("Ingest queue full, dropped oldest update");
                    Counters::bump(&shared.counters.backpressure_drops);
                    bus.publish(RouterEvent::MessageDropped);
                }
                Err(_) => {} // Router is gone; shutdown is in progress.
            }
        }

        EhubMessage::Config(config) => {
            bus.publish(RouterEvent::ConfigDecoded {
                config: Arc::new(config),
            });
        }
    }
}
