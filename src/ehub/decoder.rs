use serde::{Deserialize, Serialize};

use super::error::DecodeError;
use crate::dmx::ColorSample;

/// Largest datagram the decoder will look at. Anything bigger is rejected
/// before any per-entity allocation happens.
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// Entity color states for one burst of the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateMessage {
    pub universe: Option<u16>,
    pub entities: Vec<EntityUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityUpdate {
    pub id: u32,
    pub color: ColorSample,
}

/// Entity metadata. Not needed for routing; forwarded to observers only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigMessage {
    pub universe: Option<u16>,
    pub entities: Vec<EntityConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityConfig {
    pub id: u32,
    pub label: Option<String>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EhubMessage {
    Update(UpdateMessage),
    Config(ConfigMessage),
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    universe: Option<u16>,
    #[serde(default)]
    entities: Vec<RawEntity>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    id: u32,
    color: Option<ColorSample>,
    label: Option<String>,
    group: Option<String>,
}

/// Parses one inbound datagram. Stateless; any number of sockets may call
/// this concurrently. Malformed input comes back as an error, never a panic.
pub fn decode(datagram: &[u8]) -> Result<EhubMessage, DecodeError> {
    if datagram.len() > MAX_DATAGRAM {
        return Err(DecodeError::Oversized(datagram.len(), MAX_DATAGRAM));
    }

    let raw = serde_json::from_slice::<RawMessage>(datagram).map_err(DecodeError::Json)?;

    match raw.kind.as_str() {
        "update" => Ok(EhubMessage::Update(UpdateMessage {
            universe: raw.universe,
            entities: raw
                .entities
                .into_iter()
                .map(|e| EntityUpdate {
                    id: e.id,
                    color: e.color.unwrap_or_default(),
                })
                .collect(),
        })),
        "config" => Ok(EhubMessage::Config(ConfigMessage {
            universe: raw.universe,
            entities: raw
                .entities
                .into_iter()
                .map(|e| EntityConfig {
                    id: e.id,
                    label: e.label,
                    group: e.group,
                })
                .collect(),
        })),
        _ => Err(DecodeError::UnknownType(raw.kind)),
    }
}
