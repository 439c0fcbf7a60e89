//! Runtime for wired function blocks.
//!
//! The runtime owns everything that executes: the wiring graph of
//! functions and circuits, the cyclic tasks that run circuits on a fixed
//! grid, and the controller that ticks those tasks.
//!
//! # Architecture
//!
//! - Functions and circuits live in generation-checked arenas inside
//!   [`Graph`]; ids handed out over the link are arena handles.
//! - Each function keeps a reverse-edge list of its readers, so removing
//!   it repairs every consumer directly.
//! - Task edits are queued per task and applied at the start of that
//!   task's own tick, never during a circuit run.

pub mod circuit;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod task;

pub use circuit::{Circuit, insert_at};
pub use command::{CommandAck, CommandQueue, CommandTicket, QueuedCommand, TaskCommand};
pub use config::SchedulerConfig;
pub use controller::Controller;
pub use error::{RuntimeError, RuntimeResult};
pub use graph::{Consumer, Edge, Graph};
pub use task::{CyclicTask, NEVER, TaskStats, TickContext};
