//! Error types for logmux.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::session::SessionId;

/// Main error type for logmux operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel buffering/flush errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session routing errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Channel layer errors (buffering, line scanning).
///
/// Both conditions abort the write before any state change, so the
/// channel's buffer and owner are exactly what they were before the call.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The working buffer for a write could not be allocated
    #[error("Out of memory growing the line buffer")]
    OutOfMemory(#[from] TryReserveError),

    /// The writer's source delivered fewer bytes than it promised
    #[error("Incoming data was truncated before it could be copied")]
    DataFault,
}

/// Session manager errors (routing, lifecycle).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Operation routed to a session id that is not open
    #[error("Unknown session {0}")]
    UnknownSession(SessionId),
}

/// Result type alias using logmux's Error.
pub type Result<T> = std::result::Result<T, Error>;
