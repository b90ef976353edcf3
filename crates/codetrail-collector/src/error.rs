//! Error types for collector invocation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("collector command failed: {0}")]
    CommandFailed(String),

    #[error("collector io error: {0}")]
    Io(#[from] std::io::Error),
}
