//! Error types for the RCON client.
//!
//! Only [`RconError`] ever reaches a command's submitter. The other kinds are
//! recovered from or logged where they happen.

use std::error::Error as StdError;

/// Failure of a single send or connect on the underlying console transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("not connected")]
    NotConnected,
}

#[derive(Debug, thiserror::Error)]
pub enum RconError {
    #[error("command failed to send after {attempts} attempts to {host}:{port}: {source}")]
    RetriesExhausted {
        attempts: u32,
        host: String,
        port: u16,
        #[source]
        source: TransportError,
    },
    #[error("rcon client is shut down")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("player details unavailable: {0}")]
    Source(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("listener failed: {0}")]
    Failed(Box<dyn StdError + Send + Sync>),
    #[error("listener panicked: {0}")]
    Panicked(String),
}
