//! Error types for protocol decoding

use thiserror::Error;

/// Errors from decoding a completed frame
///
/// These are never fatal: the engine logs the offending payload and
/// resynchronizes on the next clean frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A known SysEx sub-command arrived with too few payload bytes
    #[error("{kind} payload too short: {len} bytes")]
    TruncatedSysex {
        /// Human-readable sub-command name
        kind: &'static str,
        /// Actual payload length, including the sub-command byte
        len: usize,
    },
}
