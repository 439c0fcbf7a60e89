//! Application layer for the controller runtime.
//!
//! Wires a [`Controller`](c32_runtime::Controller) to a
//! [`Link`](c32_link::Link) behind a single driving loop, loads engine
//! configuration from YAML, and provides the demo circuit used by the CLI.

pub mod config;
pub mod demo;
pub mod engine;
pub mod error;

pub use config::{EngineConfig, load_yaml};
pub use demo::{SineCircuit, sine_circuit};
pub use engine::Engine;
pub use error::{AppError, AppResult};
