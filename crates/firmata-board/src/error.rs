//! Error types for the protocol engine

use thiserror::Error;

/// Errors that can occur while driving a board
#[derive(Debug, Error)]
pub enum BoardError {
    /// Digital pin index out of range
    #[error("pin index {0} out of range")]
    InvalidPin(u8),

    /// Digital port index out of range
    #[error("port index {0} out of range")]
    InvalidPort(u8),

    /// Analog channel index out of range
    #[error("analog channel {0} out of range")]
    InvalidChannel(u8),

    /// Transport I/O failure; the engine never retries these
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
