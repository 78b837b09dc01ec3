use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;

use crate::ehub::{ConfigMessage, MalformedKind};

/// Structured event for external monitors. Everything that happens to the
/// router is observable through these; delivery is best-effort and never
/// blocks the workers that publish them.
#[derive(Debug, Clone, Serialize)]
pub enum RouterEvent {
    UpdateDecoded { universe: Option<u16>, entities: usize },
    ConfigDecoded { config: Arc<ConfigMessage> },
    InputMalformed { kind: MalformedKind },
    MessageDropped,
    PacketSent { controller: IpAddr, universe: u16, sequence: u8 },
    SendFailed { controller: IpAddr, universe: u16 },
    MappingSwapped { ranges: usize },
    PatchSwapped { rules: usize, enabled: bool },
    Fatal { reason: String },
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub time: DateTime<Utc>,
    pub event: RouterEvent,
}
