use thiserror::Error;

use crate::ids::Handle;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Capacity exhausted: {what} (limit={limit})")]
    CapacityExhausted { what: &'static str, limit: usize },

    #[error("Stale or unknown handle: {handle}")]
    StaleHandle { handle: Handle },

    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },
}
