//! Line sinks that receive prefixed job output.
//!
//! Every line arrives with its job prefix as an explicit argument, so sinks
//! never keep a mutable "current prefix". A sink is shared by all jobs of a
//! pool and must keep each line intact when jobs write concurrently.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::{IsTerminal, Write};

use chrono::Local;
use colored::Colorize;
use parking_lot::Mutex;

/// Date and time format used by [`WriterSink::with_timestamps`].
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Which child stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl StreamKind {
    /// Short tag placed before the job prefix.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Stdout => "[O]",
            Self::Stderr => "[E]",
        }
    }
}

/// One complete line of job output, without its trailing newline.
#[derive(Debug, Clone, Copy)]
pub struct OutputLine<'a> {
    /// Prefix of the job that produced the line.
    pub prefix: &'a str,
    /// Stream the line came from.
    pub stream: StreamKind,
    /// Raw line bytes.
    pub bytes: &'a [u8],
}

impl OutputLine<'_> {
    /// Line as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.bytes)
    }
}

/// Destination for job output.
pub trait LineSink: Send + Sync {
    /// Write one line atomically.
    fn write_line(&self, line: OutputLine<'_>);
}

/// Sink writing `"<log prefix>[<date> <time> ](<tag><job prefix>) <line>"`
/// to any writer.
#[derive(Debug)]
pub struct WriterSink<W: Write + Send> {
    log_prefix: String,
    timestamps: bool,
    color: bool,
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wrap `writer`. A non-empty `log_prefix` is rendered as `"<prefix>: "`.
    /// Timestamps and color start off.
    pub fn new(writer: W, log_prefix: &str) -> Self {
        let trimmed = log_prefix.trim();
        let log_prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}: ")
        };
        Self {
            log_prefix,
            timestamps: false,
            color: false,
            writer: Mutex::new(writer),
        }
    }

    /// Stamp every line with the local date and time (`2024/01/31 13:05:09`).
    #[must_use]
    pub const fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Highlight the stream tag: yellow for stdout, red for stderr.
    #[must_use]
    pub const fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn label(&self, line: &OutputLine<'_>) -> String {
        let label = format!("{}{}", line.stream.tag(), line.prefix);
        if !self.color {
            return label;
        }
        match line.stream {
            StreamKind::Stdout => label.on_yellow().bold().to_string(),
            StreamKind::Stderr => label.on_red().bold().to_string(),
        }
    }
}

impl WriterSink<std::io::Stderr> {
    /// Sink on the process's stderr with timestamps, colored when stderr is a
    /// terminal.
    #[must_use]
    pub fn stderr(log_prefix: &str) -> Self {
        let color = std::io::stderr().is_terminal();
        Self::new(std::io::stderr(), log_prefix)
            .with_timestamps(true)
            .with_color(color)
    }
}

impl<W: Write + Send> LineSink for WriterSink<W> {
    fn write_line(&self, line: OutputLine<'_>) {
        let label = self.label(&line);
        let mut buf =
            Vec::with_capacity(self.log_prefix.len() + label.len() + line.bytes.len() + 32);
        buf.extend_from_slice(self.log_prefix.as_bytes());
        if self.timestamps {
            let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
            buf.extend_from_slice(stamp.as_bytes());
            buf.push(b' ');
        }
        buf.push(b'(');
        buf.extend_from_slice(label.as_bytes());
        buf.extend_from_slice(b") ");
        buf.extend_from_slice(line.bytes);
        buf.push(b'\n');

        let mut writer = self.writer.lock();
        if let Err(e) = writer.write_all(&buf).and_then(|()| writer.flush()) {
            tracing::debug!(error = %e, prefix = line.prefix, "failed to write job output");
        }
    }
}

/// Sink that forwards every line as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LineSink for TracingSink {
    fn write_line(&self, line: OutputLine<'_>) {
        tracing::info!(
            target: "shell_pool::output",
            prefix = line.prefix,
            stream = line.stream.tag(),
            "{}",
            line.text()
        );
    }
}

/// Owned copy of a line kept by [`InMemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLine {
    /// Job prefix.
    pub prefix: String,
    /// Source stream.
    pub stream: StreamKind,
    /// Line text.
    pub text: String,
}

/// In-memory sink for testing and dev. Keeps the newest `max_lines` lines.
#[derive(Debug)]
pub struct InMemorySink {
    lines: Mutex<VecDeque<CapturedLine>>,
    max_lines: usize,
}

impl InMemorySink {
    /// Create a sink with a bounded buffer.
    #[must_use]
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(max_lines.min(4096))),
            max_lines,
        }
    }

    /// Snapshot of stored lines, oldest first.
    pub fn lines(&self) -> Vec<CapturedLine> {
        self.lines.lock().iter().cloned().collect()
    }

    /// Text of stored lines from one job, oldest first.
    pub fn texts_for(&self, prefix: &str) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|l| l.prefix == prefix)
            .map(|l| l.text.clone())
            .collect()
    }
}

impl LineSink for InMemorySink {
    fn write_line(&self, line: OutputLine<'_>) {
        let captured = CapturedLine {
            prefix: line.prefix.to_string(),
            stream: line.stream,
            text: line.text().into_owned(),
        };
        let mut lines = self.lines.lock();
        if lines.len() >= self.max_lines {
            lines.pop_front();
        }
        lines.push_back(captured);
    }
}
