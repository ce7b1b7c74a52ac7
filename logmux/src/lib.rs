//! # Logmux
//!
//! Line-buffering log multiplexer: many concurrent byte-stream writers
//! in, one ordered stream of tagged log lines out.
//!
//! Each open session owns a [`Channel`] that accumulates raw byte writes,
//! splits them at newlines and forwards every complete line to a
//! [`LogSink`] as `"{tag}[{writer}]: {line}"`. A line split across
//! several writes is reassembled before it is emitted; an unterminated
//! tail is retained until a later write completes it, a different
//! writer's bytes force it out, or the session closes.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use logmux::{MemorySink, SessionManager, WriterId};
//!
//! fn main() -> Result<(), logmux::Error> {
//!     let sink = Arc::new(MemorySink::new());
//!     let manager = SessionManager::new(sink.clone());
//!
//!     let session = manager.open("httpd");
//!     manager.write(session, b"GET /index.html\npar", WriterId(4242))?;
//!     manager.write(session, b"tial\n", WriterId(4242))?;
//!     manager.close(session)?;
//!
//!     assert_eq!(sink.lines(), [
//!         "httpd[4242]: GET /index.html",
//!         "httpd[4242]: partial",
//!     ]);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod session;
pub mod sink;

// Re-export main types for convenience
pub use channel::{Channel, LineBuffer, WriteSource, WriterId};
pub use error::{ChannelError, Error, SessionError};
pub use session::{SessionId, SessionManager};
pub use sink::{FacadeSink, LineMode, LogSink, MemorySink, WriterSink};
