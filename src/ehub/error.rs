
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Datagram too large: {0} bytes (limit {1})")]
    Oversized(usize, usize),

    #[error("Invalid eHuB JSON")]
    Json(#[source] serde_json::Error),

    #[error("Unknown eHuB message type: '{0}'")]
    UnknownType(String),
}

/// Pre-tagged error class for counters and observer events, so the receive
/// path never formats an error string.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize)]
pub enum MalformedKind {
    Oversized,
    Json,
    UnknownType,
}

impl DecodeError {
    pub fn kind(&self) -> MalformedKind {
        match self {
            DecodeError::Oversized(_, _) => MalformedKind::Oversized,
            DecodeError::Json(_) => MalformedKind::Json,
            DecodeError::UnknownType(_) => MalformedKind::UnknownType,
        }
    }
}
