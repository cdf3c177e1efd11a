/// Connection and protocol errors.
///
/// None of these reach the matchmaking engine: each one ends only the
/// connection it happened on.
use std::time::Duration;
use thiserror::Error;

/// The peer broke the framing or handshake rules.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed after {0} of 36 frame bytes")]
    TruncatedFrame(usize),
    #[error("connection closed before handshake")]
    ClosedBeforeHandshake,
    #[error("expected OPEN as first frame, got {0}")]
    MissingHandshake(String),
    #[error("invalid client id in frame")]
    InvalidClientId,
}

/// Anything that tears a connection down.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("notification write timed out after {0:?}")]
    WriteTimeout(Duration),
}
