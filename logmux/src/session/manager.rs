//! Session manager owning the id-to-channel registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crate::channel::{Channel, WriterId};
use crate::error::{Result, SessionError};
use crate::sink::LogSink;

/// Identifier of an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Creates one [`Channel`] per opened session, routes incoming byte
/// chunks into it and tears it down when the session closes.
///
/// The manager is an ordinary owned value with no global state of its
/// own; registering it somewhere process-wide is the embedding
/// application's choice. Operations on distinct sessions are fully
/// independent: the registry lock is only held to look up or remove a
/// channel handle, never across a write.
pub struct SessionManager {
    /// Sink shared by every channel this manager creates.
    sink: Arc<dyn LogSink>,

    /// Open sessions.
    sessions: RwLock<HashMap<SessionId, Arc<Channel>>>,

    /// Next session id to hand out.
    next_id: AtomicU64,
}

impl SessionManager {
    /// Create a manager emitting to `sink`.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a session labelled `tag` and return its id.
    ///
    /// The label is captured once, at open time, and never changes for
    /// the life of the session.
    pub fn open(&self, tag: impl Into<String>) -> SessionId {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let channel = Arc::new(Channel::new(tag, self.sink.clone()));
        debug!("session {} opened with tag {:?}", id, channel.tag());
        self.sessions_mut().insert(id, channel);
        id
    }

    /// Handle to the channel behind `id`, for direct writes.
    pub fn channel(&self, id: SessionId) -> Result<Arc<Channel>> {
        Ok(self
            .sessions_read()
            .get(&id)
            .cloned()
            .ok_or(SessionError::UnknownSession(id))?)
    }

    /// Route a chunk of bytes from `writer` into session `id`.
    ///
    /// Returns the number of bytes accepted. See [`Channel::write`] for
    /// the buffering and failure semantics.
    pub fn write(&self, id: SessionId, data: &[u8], writer: WriterId) -> Result<usize> {
        let channel = self.channel(id)?;
        Ok(channel.write_bytes(data, writer)?)
    }

    /// Close session `id`, flushing any retained fragment.
    pub fn close(&self, id: SessionId) -> Result<()> {
        let channel = self
            .sessions_mut()
            .remove(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        channel.close();
        debug!("session {} closed", id);
        Ok(())
    }

    /// Close every remaining session, flushing each retained fragment.
    ///
    /// Teardown hook for embedding applications that shut the whole
    /// multiplexer down at once.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.sessions_mut().drain().collect();
        for (id, channel) in drained {
            channel.close();
            debug!("session {} closed", id);
        }
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions_read().len()
    }

    /// Whether no sessions are open.
    pub fn is_empty(&self) -> bool {
        self.sessions_read().is_empty()
    }

    fn sessions_read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Arc<Channel>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions_mut(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Arc<Channel>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
