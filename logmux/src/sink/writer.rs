//! Sink writing lines to any `io::Write` destination.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use log::warn;

use super::LogSink;

/// Controls the terminator a [`WriterSink`] appends to each line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineMode {
    /// Append a newline after each line (the default).
    #[default]
    WithNewline,

    /// Emit lines exactly as received, without a terminator.
    WithoutNewline,
}

/// Sink that serializes lines to an underlying writer.
///
/// A mutex around the writer keeps concurrent channels from interleaving
/// partial lines; each `append` writes one whole line.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
    mode: LineMode,
    flush_each_line: bool,
}

impl<W: Write + Send> WriterSink<W> {
    /// Create a sink writing newline-terminated lines, flushed per line.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            mode: LineMode::WithNewline,
            flush_each_line: true,
        }
    }

    /// Set the line terminator mode.
    pub fn line_mode(mut self, mode: LineMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set whether the writer is flushed after every line.
    pub fn flush_each_line(mut self, flush: bool) -> Self {
        self.flush_each_line = flush;
        self
    }

    /// Consume the sink and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        if self.mode == LineMode::WithNewline {
            writer.write_all(b"\n")?;
        }
        if self.flush_each_line {
            writer.flush()?;
        }
        Ok(())
    }
}

impl WriterSink<io::Stderr> {
    /// Sink appending to standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl WriterSink<io::Stdout> {
    /// Sink appending to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn append(&self, line: &str) {
        // Emission is fire-and-forget; an unwritable destination only
        // costs a diagnostic.
        if let Err(err) = self.write_line(line) {
            warn!("sink write failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_newline_terminated() {
        let sink = WriterSink::new(Vec::<u8>::new());
        sink.append("one");
        sink.append("two");
        assert_eq!(sink.into_inner(), b"one\ntwo\n");
    }

    #[test]
    fn test_without_newline_mode() {
        let sink = WriterSink::new(Vec::<u8>::new()).line_mode(LineMode::WithoutNewline);
        sink.append("raw");
        assert_eq!(sink.into_inner(), b"raw");
    }

    #[test]
    fn test_default_line_mode_appends_newline() {
        assert_eq!(LineMode::default(), LineMode::WithNewline);
    }
}
