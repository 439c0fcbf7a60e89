//! c32-blocks: the function block execution model.
//!
//! Contains:
//! - io (untagged 32-bit values, per-slot flags, read-side conversions)
//! - block (`FunctionBlock`, `BlockLogic`, wiring and monitoring state)
//! - monitor (sink receiving monitoring snapshots)
//! - library (function library contract and factory)

pub mod block;
pub mod error;
pub mod io;
pub mod library;
pub mod monitor;

pub use block::{
    BlockLogic, CIRCUIT_OPCODE, FUNC_FLAG_MONITORING, FunctionBlock, IoInit, Opcode, OutputRef,
    opcode, opcode_parts,
};
pub use error::{BlockError, BlockResult};
pub use io::{Conversion, IoFlags, IoType, IoValue, conversion_for, convert, resolve};
pub use library::{FunctionFactory, FunctionLibrary, NULL_LIBRARY_ID};
pub use monitor::{MonitoringSink, RecordingSink};
