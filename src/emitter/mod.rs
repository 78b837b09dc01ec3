
mod error;
mod manager;
mod packet;
mod rate;


pub use error::EmitterError;
pub use manager::EmitterManager;
pub use packet::{DMX_DATA_OFFSET, PACKET_SIZE};
