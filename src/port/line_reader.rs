//! Buffered line framing on top of a `SerialPortAdapter`.
//!
//! The receiver emits one protocol message per CRLF-terminated line. Bytes
//! that arrive without a terminator are kept until the next read, so a line
//! split across read timeouts is reassembled.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use memchr::memchr;
use std::borrow::Cow;

/// Longest line returned in one piece, not counting its `\r\n` terminator.
pub const MAX_LINE_LEN: usize = 4096;

const READ_CHUNK: usize = 256;

/// One line (or fragment of an overlong line) read from the port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    bytes: Vec<u8>,
    oversized: bool,
}

impl RawLine {
    /// A complete line, without its terminator.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            oversized: false,
        }
    }

    /// A fragment of a line that did not fit the read buffer.
    pub fn fragment(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            oversized: true,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether this is a piece of a line longer than [`MAX_LINE_LEN`].
    pub fn is_oversized(&self) -> bool {
        self.oversized
    }

    /// The line decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl From<&str> for RawLine {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

/// Result of one `read_line` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(RawLine),
    /// Nothing complete arrived within the read timeout.
    EndOfStream,
}

/// Reassembles lines from raw port reads.
#[derive(Debug)]
pub struct LineReader {
    pending: Vec<u8>,
    chunk: Vec<u8>,
    max_len: usize,
    /// Set after an oversized fragment until its line terminator is seen.
    continuing: bool,
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

impl LineReader {
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    /// A reader that splits lines longer than `max_len` bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            pending: Vec::with_capacity(max_len),
            chunk: vec![0; READ_CHUNK],
            max_len: max_len.max(1),
            continuing: false,
        }
    }

    /// Read until a full line is buffered or the port reports nothing more.
    ///
    /// Timeouts and zero-length reads come back as [`ReadOutcome::EndOfStream`];
    /// any other port error is returned as is.
    pub fn read_line(
        &mut self,
        port: &mut dyn SerialPortAdapter,
    ) -> Result<ReadOutcome, PortError> {
        loop {
            if let Some(line) = self.take_buffered() {
                return Ok(ReadOutcome::Line(line));
            }

            match port.read_bytes(&mut self.chunk) {
                Ok(0) => return Ok(ReadOutcome::EndOfStream),
                Ok(n) => self.pending.extend_from_slice(&self.chunk[..n]),
                Err(e) if e.is_quiet() => return Ok(ReadOutcome::EndOfStream),
                Err(e) => return Err(e),
            }
        }
    }

    /// Drop any partially received line.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.continuing = false;
    }

    /// Bytes buffered without a terminator yet.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    fn take_buffered(&mut self) -> Option<RawLine> {
        // Room for a full line plus CRLF, so the terminator is never split
        // from the line it ends.
        let window = self.pending.len().min(self.max_len + 2);

        if let Some(pos) = memchr(b'\n', &self.pending[..window]) {
            let end = if pos > 0 && self.pending[pos - 1] == b'\r' {
                pos - 1
            } else {
                pos
            };
            if end <= self.max_len {
                let mut bytes: Vec<u8> = self.pending.drain(..=pos).collect();
                bytes.truncate(end);
                let oversized = std::mem::take(&mut self.continuing);
                return Some(RawLine { bytes, oversized });
            }
        }

        if self.pending.len() >= self.max_len + 2 {
            let bytes: Vec<u8> = self.pending.drain(..self.max_len).collect();
            self.continuing = true;
            return Some(RawLine::fragment(bytes));
        }

        None
    }
}
