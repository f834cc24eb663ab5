//! Splits a byte stream into line-terminated frames.
//!
//! A single receive may carry zero, one or many frames, and a frame may
//! arrive across several receives. Bytes after the last terminator are kept
//! for the next call.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ConnectionError, ParseError};

/// Longest frame we buffer before giving up on it.
pub const MAX_FRAME_LEN: usize = 8192;

const READ_CHUNK: usize = 4096;

/// Result of one [`FrameReader::next_frame`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete frame with its terminator removed.
    Line(String),
    /// A frame that had to be dropped.
    Malformed(ParseError),
    /// The peer closed the connection.
    EndOfStream,
}

/// Byte accumulator that yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Set after an oversized frame was dropped; bytes are skipped until the
    /// next terminator.
    discarding: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes buffered but not yet terminated.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete line, if one is buffered. Accepts `\r\n` and a
    /// bare `\n`. Blank lines are skipped.
    pub fn next_line(&mut self) -> Option<Result<String, ParseError>> {
        loop {
            let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
                if self.buf.len() > MAX_FRAME_LEN {
                    self.buf.clear();
                    if !self.discarding {
                        self.discarding = true;
                        return Some(Err(ParseError::FrameTooLong(MAX_FRAME_LEN)));
                    }
                }
                return None;
            };

            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            if line.len() > MAX_FRAME_LEN {
                return Some(Err(ParseError::FrameTooLong(MAX_FRAME_LEN)));
            }
            return Some(String::from_utf8(line).map_err(|_| ParseError::InvalidUtf8));
        }
    }
}

/// Reads frames from any async byte source (a socket read half in practice).
pub struct FrameReader<R> {
    inner: R,
    lines: LineBuffer,
    chunk: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            lines: LineBuffer::new(),
            chunk: vec![0u8; READ_CHUNK],
        }
    }

    /// Next frame, reading from the source as needed.
    ///
    /// Cancel safe: received bytes are only buffered after the read
    /// completes, so dropping this future inside `select!` loses nothing.
    pub async fn next_frame(&mut self) -> Result<Frame, ConnectionError> {
        loop {
            if let Some(line) = self.lines.next_line() {
                return Ok(match line {
                    Ok(text) => Frame::Line(text),
                    Err(e) => Frame::Malformed(e),
                });
            }

            let n = self
                .inner
                .read(&mut self.chunk)
                .await
                .map_err(ConnectionError::Receive)?;
            if n == 0 {
                if self.lines.pending() > 0 {
                    tracing::debug!(
                        bytes = self.lines.pending(),
                        "Dropping unterminated frame at EOF"
                    );
                }
                return Ok(Frame::EndOfStream);
            }
            self.lines.push(&self.chunk[..n]);
        }
    }
}
