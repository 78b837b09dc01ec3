
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Invalid entity range {0}..{1} (from must be >= 1 and <= to)")]
    InvalidRange(u32, u32),

    #[error("Entity ranges {0}..{1} and {2}..{3} overlap")]
    Overlap(u32, u32, u32, u32),

    #[error("Range {0}..{1} spans channels {2}..{3}, outside 1..512")]
    ChannelOutOfRange(u32, u32, u32, u32),

    #[error("Unsupported channel layout: [{0}] (supported: RGB, RGBW, R, W)")]
    BadLayout(String),

    #[error("Universe {0} does not fit the 15-bit ArtNet port-address")]
    UniverseOutOfRange(u16),
}
