//! Error types for the connection core.

use std::io;

/// Socket-level failures. Any of these ends the current session and leaves
/// the manager `Disconnected`; nothing is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),
    #[error("handshake failed: {0}")]
    Handshake(#[source] io::Error),
    #[error("transmit failed: {0}")]
    Transmit(#[source] io::Error),
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
    #[error("ping timeout")]
    Timeout,
    #[error("not connected")]
    NotConnected,
    #[error("connection manager has stopped")]
    ManagerClosed,
}

/// A frame that could not be turned into text. The frame is dropped; the
/// connection is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
    #[error("frame exceeds {0} bytes without a line terminator")]
    FrameTooLong(usize),
}
