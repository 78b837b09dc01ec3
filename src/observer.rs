use log::trace;
use std::sync::Mutex;

use crate::messages::{EventEnvelope, RouterEvent};

/// Fan-out of router events to any number of subscribers.
///
/// Each subscriber gets its own bounded queue; a full queue drops its oldest
/// event so publication never blocks a worker. Subscribers that went away
/// are pruned on the next publish.
pub struct EventBus {
    capacity: usize,
    subscribers: Mutex<Vec<async_channel::Sender<EventEnvelope>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> EventBus {
        EventBus {
            capacity,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> async_channel::Receiver<EventEnvelope> {
        let (tx, rx) = async_channel::bounded(self.capacity);
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub fn publish(&self, event: RouterEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();

        if subscribers.is_empty() {
            return;
        }

        let envelope = EventEnvelope {
            time: chrono::Utc::now(),
            event,
        };

        subscribers.retain(|tx| match tx.force_send(envelope.clone()) {
            Ok(None) => true,
            Ok(Some(_displaced)) => {
                trace!("Observer queue full, dropped oldest event");
                true
            }
            Err(_) => false,
        });
    }
}
