//! Error types for function block operations.

use thiserror::Error;

/// Result type for block operations.
pub type BlockResult<T> = Result<T, BlockError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// Invalid argument provided to a block operation.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// IO index past the block's arity.
    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Literal writes are refused while an input reads from another block.
    #[error("Input {index} is connected")]
    InputConnected { index: usize },

    /// Byte access outside the IO value array.
    #[error("Byte range out of bounds (offset={offset}, size={size}, len={len})")]
    ByteRange {
        offset: usize,
        size: usize,
        len: usize,
    },

    #[error("Library id {id} is reserved or already registered")]
    LibraryId { id: u8 },
}
