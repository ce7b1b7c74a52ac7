//! Session lifecycle: channel creation, byte routing, teardown.

mod manager;

pub use manager::{SessionId, SessionManager};
