//! Per-session channel layer: buffering, ownership tracking, line flushing.
//!
//! A [`Channel`] turns arbitrary-length byte writes, possibly from
//! different writers over the life of one session, into newline-delimited
//! lines tagged with the session label and the writer that produced them.

mod buffer;
mod channel;
mod source;

pub use buffer::LineBuffer;
pub use channel::{Channel, WriterId};
pub use source::WriteSource;
