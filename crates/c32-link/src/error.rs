//! Error types for decoding and dispatching link messages.

use c32_runtime::RuntimeError;
use thiserror::Error;

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Message or payload ended before a field.
    #[error("Truncated {what}: needed {needed} bytes, got {len}")]
    Truncated {
        what: &'static str,
        needed: usize,
        len: usize,
    },

    #[error("Unknown message type {msg_type}")]
    UnknownMessage { msg_type: u32 },

    /// Target handle is zero, of the wrong kind, or stale.
    #[error("Invalid target 0x{target:08X} for {msg_type}")]
    InvalidTarget { msg_type: &'static str, target: u32 },

    /// A message that only ever flows controller to client.
    #[error("Message {msg_type} is not a request")]
    NotARequest { msg_type: &'static str },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
