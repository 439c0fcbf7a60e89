//! c32-link: binary request/response protocol for a running controller.
//!
//! Contains:
//! - protocol (message numbering and addressing)
//! - codec (little-endian headers, payload reader, frame builder)
//! - info (entity snapshots)
//! - collection (monitoring batches)
//! - link (inbound queue, dispatcher, monitoring sink)

pub mod codec;
pub mod collection;
pub mod config;
pub mod error;
pub mod info;
pub mod link;
pub mod protocol;

pub use codec::{Frame, REQUEST_HEADER_LEN, RESPONSE_HEADER_LEN, Reader, RequestHeader, ResponseHeader, payload};
pub use collection::{MonitoringCollector, ReportItem, decode_report};
pub use config::LinkConfig;
pub use error::{LinkError, LinkResult};
pub use link::{BufferTransport, Inbound, Link, LinkInbox, Transport};
pub use protocol::{MessageType, Target};
