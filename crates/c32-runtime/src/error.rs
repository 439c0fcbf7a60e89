//! Error types for graph and scheduler operations.

use c32_blocks::BlockError;
use c32_core::{CircuitId, CoreError, FunctionId, TaskId};
use thiserror::Error;

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Block(#[from] BlockError),

    #[error("Unknown function {id}")]
    UnknownFunction { id: FunctionId },

    #[error("Unknown circuit {id}")]
    UnknownCircuit { id: CircuitId },

    #[error("Unknown task {id}")]
    UnknownTask { id: TaskId },

    /// A function belongs to at most one circuit.
    #[error("Function {function} already belongs to circuit {owner}")]
    AlreadyOwned {
        function: FunctionId,
        owner: CircuitId,
    },

    #[error("Function {function} is not a member of circuit {circuit}")]
    NotMember {
        function: FunctionId,
        circuit: CircuitId,
    },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
