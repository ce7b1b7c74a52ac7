//! Per-session buffering, ownership tracking, and line flushing.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace, warn};
use memchr::memchr_iter;

use super::buffer::LineBuffer;
use super::source::WriteSource;
use crate::error::ChannelError;
use crate::sink::LogSink;

/// Identity of the writer that produced a byte span.
///
/// Typically a process id. The channel only requires it to be a stable,
/// comparable token: writes carrying the same id continue the retained
/// fragment, writes carrying a different id force it out first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriterId(pub u32);

impl fmt::Display for WriterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Buffered state guarded by the channel mutex.
#[derive(Debug, Default)]
struct ChannelState {
    /// Retained unterminated tail; never contains a newline.
    buffer: LineBuffer,

    /// Writer that produced the retained tail; `Some` iff `buffer` is
    /// non-empty.
    owner: Option<WriterId>,
}

/// Per-session buffering state machine.
///
/// A channel accumulates raw byte writes, splits them at newlines and
/// forwards each complete line to the [`LogSink`] as
/// `"{tag}[{writer}]: {line}"`. A line split across writes is reassembled
/// before it is emitted; the unterminated tail is retained until a later
/// write from the same writer completes it, a write from a different
/// writer forces it out, or [`close`](Self::close) flushes it at session
/// teardown.
///
/// All operations serialize on an internal mutex, so a channel can be
/// shared freely between threads. Channels never coordinate with each
/// other; ordering at the sink is only guaranteed within one channel.
pub struct Channel {
    /// Label identifying the session, fixed at creation.
    tag: String,

    /// Destination for emitted lines.
    sink: Arc<dyn LogSink>,

    /// Serializes `write` and `close`; held for their entire duration.
    state: Mutex<ChannelState>,
}

impl Channel {
    /// Create a channel for a session labelled `tag`, emitting to `sink`.
    pub fn new(tag: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            tag: tag.into(),
            sink,
            state: Mutex::new(ChannelState::default()),
        }
    }

    /// The session label this channel was created with.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Snapshot of the retained fragment and its owner, if any.
    pub fn retained(&self) -> Option<(WriterId, Vec<u8>)> {
        let state = self.lock_state();
        state.owner.map(|owner| (owner, state.buffer.as_slice().to_vec()))
    }

    /// Write a chunk of bytes from `writer` into the channel.
    ///
    /// Complete lines found in the concatenation of the retained fragment
    /// and the incoming bytes are emitted immediately, in order; the
    /// remainder becomes the new retained fragment. On success the full
    /// source length is accepted and returned.
    ///
    /// # Errors
    ///
    /// [`ChannelError::OutOfMemory`] when the working buffer cannot be
    /// allocated, [`ChannelError::DataFault`] when the source cannot be
    /// copied in full. Both leave the channel exactly as it was before
    /// the call, except that a fragment owned by a *different* writer has
    /// already been flushed, since that happens before anything can fail.
    pub fn write<S: WriteSource>(
        &self,
        source: &mut S,
        writer: WriterId,
    ) -> Result<usize, ChannelError> {
        let mut state = self.lock_state();

        // A retained fragment from another writer goes out before any of
        // the new writer's bytes enter the buffer. Mixed-owner content is
        // never retained.
        if state.owner.is_some_and(|owner| owner != writer) {
            self.flush_retained(&mut state);
        }

        let len = source.remaining();

        // Fresh working buffer: surviving fragment first, then room for
        // the incoming bytes. The old state is not touched until the copy
        // below has succeeded.
        let mut next = LineBuffer::with_fragment(state.buffer.as_slice(), len)?;

        if !source.copy_full(next.extend_zeroed(len)) {
            return Err(ChannelError::DataFault);
        }

        // Newlines can only appear in the newly copied region; the
        // retained fragment never contains one. Spans still start at
        // offset zero, so the fragment prefixes the first emitted line.
        let scan_from = next.len() - len;
        let data = next.as_slice();
        let mut line_start = 0;
        let mut emitted = 0usize;
        for pos in memchr_iter(b'\n', &data[scan_from..]) {
            let pos = scan_from + pos;
            if line_start != pos {
                self.emit(writer, &data[line_start..pos]);
                emitted += 1;
            }
            line_start = pos + 1;
        }

        // Lines scanned here always belong to `writer`: a carried-over
        // prefix necessarily has a matching owner, the mismatch case was
        // flushed above.
        if line_start < next.len() {
            next.consume(line_start);
            state.buffer = next;
            state.owner = Some(writer);
        } else {
            state.buffer = LineBuffer::new();
            state.owner = None;
        }

        trace!(
            "{}: accepted {} bytes from {}, emitted {} lines, retained {}",
            self.tag,
            len,
            writer,
            emitted,
            state.buffer.len()
        );

        Ok(len)
    }

    /// Write from a plain byte slice. See [`write`](Self::write).
    pub fn write_bytes(&self, data: &[u8], writer: WriterId) -> Result<usize, ChannelError> {
        let mut source = data;
        self.write(&mut source, writer)
    }

    /// Flush the retained fragment, if any, and release the buffer.
    ///
    /// Called exactly once by the session manager at teardown. A fragment
    /// retained from writer P goes out as one final `"{tag}[P]: {fragment}"`.
    pub fn close(&self) {
        let mut state = self.lock_state();
        self.flush_retained(&mut state);
        debug!("{}: channel closed", self.tag);
    }

    /// Emit the retained fragment attributed to its owner, then clear.
    fn flush_retained(&self, state: &mut ChannelState) {
        if let Some(owner) = state.owner.take() {
            self.emit(owner, state.buffer.as_slice());
            state.buffer.clear();
        }
    }

    /// Render one line and hand it to the sink.
    fn emit(&self, writer: WriterId, content: &[u8]) {
        let line = format!(
            "{}[{}]: {}",
            self.tag,
            writer,
            String::from_utf8_lossy(content)
        );
        self.sink.append(&line);
    }

    /// Lock the state, recovering from poisoning.
    ///
    /// The buffer/owner pair is kept consistent between statements, so
    /// state behind a poisoned lock is still usable.
    fn lock_state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(owner) = state.owner.take() {
            let fragment = std::mem::take(&mut state.buffer);
            warn!(
                "{}: channel dropped without close, flushing retained fragment",
                self.tag
            );
            self.emit(owner, fragment.as_slice());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn channel() -> (Arc<MemorySink>, Channel) {
        let sink = Arc::new(MemorySink::new());
        let channel = Channel::new("demo", sink.clone());
        (sink, channel)
    }

    /// Source that promises more bytes than it can deliver.
    struct TruncatedSource {
        data: &'static [u8],
        claimed: usize,
    }

    impl WriteSource for TruncatedSource {
        fn remaining(&self) -> usize {
            self.claimed
        }

        fn copy_full(&mut self, dst: &mut [u8]) -> bool {
            if dst.len() > self.data.len() {
                return false;
            }
            dst.copy_from_slice(&self.data[..dst.len()]);
            true
        }
    }

    #[test]
    fn test_single_terminated_line() {
        let (sink, channel) = channel();
        assert_eq!(channel.write_bytes(b"hello\n", WriterId(7)).unwrap(), 6);
        assert_eq!(sink.lines(), ["demo[7]: hello"]);
        assert!(channel.retained().is_none());
    }

    #[test]
    fn test_multiple_lines_in_one_write() {
        let (sink, channel) = channel();
        channel.write_bytes(b"a\nbb\nccc\n", WriterId(2)).unwrap();
        assert_eq!(sink.lines(), ["demo[2]: a", "demo[2]: bb", "demo[2]: ccc"]);
    }

    #[test]
    fn test_line_reconstructed_across_writes() {
        let (sink, channel) = channel();
        let writer = WriterId(1);
        channel.write_bytes(b"par", writer).unwrap();
        channel.write_bytes(b"tial li", writer).unwrap();
        channel.write_bytes(b"ne\nnext\n", writer).unwrap();
        assert_eq!(sink.lines(), ["demo[1]: partial line", "demo[1]: next"]);
        assert!(channel.retained().is_none());
    }

    #[test]
    fn test_unterminated_tail_is_retained() {
        let (sink, channel) = channel();
        let writer = WriterId(3);
        channel.write_bytes(b"head\ntail", writer).unwrap();
        assert_eq!(sink.lines(), ["demo[3]: head"]);

        let (owner, fragment) = channel.retained().unwrap();
        assert_eq!(owner, writer);
        assert_eq!(fragment, b"tail");
    }

    #[test]
    fn test_owner_mismatch_flushes_fragment_first() {
        let (sink, channel) = channel();
        channel.write_bytes(b"abc", WriterId(10)).unwrap();
        channel.write_bytes(b"def\n", WriterId(20)).unwrap();
        assert_eq!(sink.lines(), ["demo[10]: abc", "demo[20]: def"]);
        assert!(channel.retained().is_none());
    }

    #[test]
    fn test_empty_lines_are_suppressed() {
        let (sink, channel) = channel();
        channel.write_bytes(b"\n\n", WriterId(4)).unwrap();
        assert!(sink.lines().is_empty());
        assert!(channel.retained().is_none());
    }

    #[test]
    fn test_zero_length_write_is_a_noop() {
        let (sink, channel) = channel();
        assert_eq!(channel.write_bytes(b"", WriterId(5)).unwrap(), 0);
        assert!(sink.lines().is_empty());
        assert!(channel.retained().is_none());
    }

    #[test]
    fn test_zero_length_write_still_flushes_on_mismatch() {
        let (sink, channel) = channel();
        channel.write_bytes(b"abc", WriterId(1)).unwrap();
        assert_eq!(channel.write_bytes(b"", WriterId(2)).unwrap(), 0);
        assert_eq!(sink.lines(), ["demo[1]: abc"]);
        assert!(channel.retained().is_none());
    }

    #[test]
    fn test_data_fault_leaves_state_untouched() {
        let (sink, channel) = channel();
        let writer = WriterId(6);
        channel.write_bytes(b"keep", writer).unwrap();

        let mut faulty = TruncatedSource {
            data: b"xy",
            claimed: 8,
        };
        let err = channel.write(&mut faulty, writer).unwrap_err();
        assert!(matches!(err, ChannelError::DataFault));

        assert!(sink.lines().is_empty());
        let (owner, fragment) = channel.retained().unwrap();
        assert_eq!(owner, writer);
        assert_eq!(fragment, b"keep");

        // The channel keeps working after the failed call.
        channel.write_bytes(b" going\n", writer).unwrap();
        assert_eq!(sink.lines(), ["demo[6]: keep going"]);
    }

    #[test]
    fn test_close_flushes_exactly_once() {
        let (sink, channel) = channel();
        channel.write_bytes(b"xyz", WriterId(9)).unwrap();
        channel.close();
        assert_eq!(sink.lines(), ["demo[9]: xyz"]);

        // Dropping after close finds nothing left to flush.
        drop(channel);
        assert_eq!(sink.lines(), ["demo[9]: xyz"]);
    }

    #[test]
    fn test_close_with_empty_buffer_emits_nothing() {
        let (sink, channel) = channel();
        channel.write_bytes(b"done\n", WriterId(9)).unwrap();
        channel.close();
        assert_eq!(sink.lines(), ["demo[9]: done"]);
    }

    #[test]
    fn test_drop_without_close_flushes_fragment() {
        let (sink, channel) = channel();
        channel.write_bytes(b"last words", WriterId(11)).unwrap();
        drop(channel);
        assert_eq!(sink.lines(), ["demo[11]: last words"]);
    }

    #[test]
    fn test_carriage_return_is_an_ordinary_byte() {
        let (sink, channel) = channel();
        channel.write_bytes(b"dos line\r\n", WriterId(12)).unwrap();
        assert_eq!(sink.lines(), ["demo[12]: dos line\r"]);
    }

    #[test]
    fn test_fragment_completed_by_newline_only_write() {
        let (sink, channel) = channel();
        let writer = WriterId(8);
        channel.write_bytes(b"tail", writer).unwrap();
        channel.write_bytes(b"\n", writer).unwrap();
        assert_eq!(sink.lines(), ["demo[8]: tail"]);
        assert!(channel.retained().is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_writer_id_serde_round_trip() {
        let id: WriterId = serde_json::from_str("4242").unwrap();
        assert_eq!(id, WriterId(4242));
        assert_eq!(serde_json::to_string(&id).unwrap(), "4242");
    }
}
