//! c32-core: stable foundation for the controller runtime.
//!
//! Contains:
//! - ids (kind-tagged, generation-checked handles used on the wire)
//! - arena (slot storage that hands out those handles)
//! - timing (microsecond clock sources)
//! - system (platform probe for controller info)
//! - error (shared error types)

pub mod arena;
pub mod error;
pub mod ids;
pub mod system;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use arena::Arena;
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use system::{StaticProbe, SystemConfig, SystemProbe};
pub use timing::{Clock, ManualClock, MonotonicClock};
