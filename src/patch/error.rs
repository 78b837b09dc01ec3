
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("Patch rules for universe {0} form a cycle through channel {1}")]
    Cycle(u16, u16),

    #[error("Patch rule {0} -> {1} in universe {2}: channels must be in 1..512")]
    ChannelOutOfRange(u16, u16, u16),
}
