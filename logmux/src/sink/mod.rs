//! Log sink seam: where completed lines leave the multiplexer.
//!
//! The sink is an external collaborator from the channel's point of view.
//! The shipped implementations cover in-memory capture ([`MemorySink`]),
//! plain writers ([`WriterSink`]) and the `log` facade ([`FacadeSink`]).

mod facade;
mod memory;
mod writer;

pub use facade::FacadeSink;
pub use memory::MemorySink;
pub use writer::{LineMode, WriterSink};

/// Destination for emitted lines.
///
/// One rendered line per call, already formatted as
/// `"{tag}[{writer}]: {content}"` with the trailing newline excluded.
/// Delivery is fire-and-forget: the multiplexer never consumes an
/// acknowledgment and treats the sink as always available.
pub trait LogSink: Send + Sync {
    /// Append one line to the sink.
    fn append(&self, line: &str);
}
