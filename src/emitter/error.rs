
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("{0}")]
    Context(String),

    #[error("Connection error")]
    ConnectionError(#[from] std::io::Error),
}
