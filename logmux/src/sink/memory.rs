//! In-memory sink for tests and capture.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::LogSink;

/// Sink that stores every appended line in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines appended so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Number of lines appended so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all captured lines.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for MemorySink {
    fn append(&self, line: &str) {
        self.lock().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let sink = MemorySink::new();
        sink.append("first");
        sink.append("second");
        assert_eq!(sink.lines(), ["first", "second"]);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_clear_drops_captured_lines() {
        let sink = MemorySink::new();
        sink.append("line");
        sink.clear();
        assert!(sink.is_empty());
    }
}
