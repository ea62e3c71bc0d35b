//! Turns raw child output into prefixed lines for a shared sink.

use std::sync::Arc;

use crate::core::{LineSink, OutputLine, StreamKind};

/// Longest partial line held back before it is emitted as a line of its own.
pub const MAX_PENDING_LINE: usize = 64 * 1024;

/// Splits a byte stream on `\n`, holding back a trailing partial line.
///
/// A partial line that reaches the size limit is emitted in limit-sized
/// pieces, so a child that never writes a newline cannot grow the buffer
/// without bound.
#[derive(Debug)]
pub struct LineSplitter {
    pending: Vec<u8>,
    max_pending: usize,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSplitter {
    /// Create an empty splitter holding at most [`MAX_PENDING_LINE`] bytes.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_pending(MAX_PENDING_LINE)
    }

    /// Create an empty splitter with a custom partial-line limit.
    #[must_use]
    pub const fn with_max_pending(max_pending: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_pending: if max_pending == 0 { 1 } else { max_pending },
        }
    }

    /// Feed a chunk and call `emit` for every line it completes.
    pub fn push(&mut self, mut chunk: &[u8], mut emit: impl FnMut(&[u8])) {
        while let Some(pos) = chunk.iter().position(|&b| b == b'\n') {
            let (line, rest) = (&chunk[..pos], &chunk[pos + 1..]);
            if self.pending.is_empty() {
                emit(line);
            } else {
                self.pending.extend_from_slice(line);
                emit(&self.pending);
                self.pending.clear();
            }
            chunk = rest;
        }
        self.pending.extend_from_slice(chunk);

        while self.pending.len() >= self.max_pending {
            let rest = self.pending.split_off(self.max_pending);
            emit(&self.pending);
            self.pending = rest;
        }
    }

    /// Emit whatever partial line is left. Called once the stream closes.
    pub fn finish(&mut self, mut emit: impl FnMut(&[u8])) {
        if !self.pending.is_empty() {
            emit(&self.pending);
            self.pending.clear();
        }
    }

    /// Bytes held back waiting for a newline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// One job stream bound to the pool's sink.
pub struct Multiplexer {
    prefix: Arc<str>,
    stream: StreamKind,
    sink: Arc<dyn LineSink>,
    splitter: LineSplitter,
}

impl std::fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multiplexer")
            .field("prefix", &self.prefix)
            .field("stream", &self.stream)
            .field("pending", &self.splitter.pending())
            .finish_non_exhaustive()
    }
}

impl Multiplexer {
    /// Bind a stream of the job labelled `prefix` to `sink`.
    pub fn new(prefix: Arc<str>, stream: StreamKind, sink: Arc<dyn LineSink>) -> Self {
        Self {
            prefix,
            stream,
            sink,
            splitter: LineSplitter::new(),
        }
    }

    /// Feed raw output.
    pub fn write(&mut self, bytes: &[u8]) {
        let prefix: &str = &self.prefix;
        let stream = self.stream;
        let sink = &self.sink;
        self.splitter.push(bytes, |line| {
            sink.write_line(OutputLine {
                prefix,
                stream,
                bytes: line,
            });
        });
    }

    /// Flush the trailing partial line at end of stream.
    pub fn finish(mut self) {
        let prefix: &str = &self.prefix;
        let stream = self.stream;
        let sink = &self.sink;
        self.splitter.finish(|line| {
            sink.write_line(OutputLine {
                prefix,
                stream,
                bytes: line,
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InMemorySink;

    fn split_all(chunks: &[&str]) -> Vec<String> {
        let mut splitter = LineSplitter::new();
        let mut out = Vec::new();
        for chunk in chunks {
            splitter.push(chunk.as_bytes(), |l| out.push(String::from_utf8_lossy(l).into_owned()));
        }
        splitter.finish(|l| out.push(String::from_utf8_lossy(l).into_owned()));
        out
    }

    #[test]
    fn splits_complete_lines() {
        assert_eq!(split_all(&["a\nb\n"]), vec!["a", "b"]);
    }

    #[test]
    fn joins_lines_across_chunks() {
        assert_eq!(split_all(&["hel", "lo\nwor", "ld\n"]), vec!["hello", "world"]);
    }

    #[test]
    fn flushes_partial_line_at_close() {
        assert_eq!(split_all(&["one\ntw", "o"]), vec!["one", "two"]);
    }

    #[test]
    fn keeps_empty_lines() {
        assert_eq!(split_all(&["a\n\nb\n"]), vec!["a", "", "b"]);
    }

    #[test]
    fn holds_back_partial_line() {
        let mut splitter = LineSplitter::new();
        let mut count = 0;
        splitter.push(b"no newline yet", |_| count += 1);
        assert_eq!(count, 0);
        assert_eq!(splitter.pending(), 14);
    }

    #[test]
    fn oversized_partial_line_is_emitted_in_pieces() {
        let mut splitter = LineSplitter::with_max_pending(4);
        let mut out = Vec::new();
        splitter.push(b"abcdefghij", |l| out.push(l.to_vec()));
        assert_eq!(out, vec![b"abcd".to_vec(), b"efgh".to_vec()]);
        assert_eq!(splitter.pending(), 2);

        splitter.push(b"k\nxy", |l| out.push(l.to_vec()));
        assert_eq!(out[2], b"ijk".to_vec());
        assert_eq!(splitter.pending(), 2);
    }

    #[test]
    fn default_limit_bounds_pending() {
        let mut splitter = LineSplitter::new();
        let mut lines = 0;
        splitter.push(&vec![b'x'; MAX_PENDING_LINE * 3 + 10], |_| lines += 1);
        assert_eq!(lines, 3);
        assert_eq!(splitter.pending(), 10);
    }

    #[test]
    fn multiplexer_tags_lines_with_prefix() {
        let sink = Arc::new(InMemorySink::new(16));
        let mut mux = Multiplexer::new(Arc::from("job-a"), StreamKind::Stderr, sink.clone());
        mux.write(b"first\nsec");
        mux.write(b"ond\nthird");
        mux.finish();

        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.prefix == "job-a" && l.stream == StreamKind::Stderr));
        assert_eq!(sink.texts_for("job-a"), vec!["first", "second", "third"]);
    }
}
