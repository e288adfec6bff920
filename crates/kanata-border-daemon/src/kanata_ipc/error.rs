//! Error types for the kanata connection

use thiserror::Error;

/// Errors that can occur while talking to kanata
#[derive(Debug, Error)]
pub enum KanataError {
    /// Failed to connect to the kanata TCP server
    #[error("Failed to connect to kanata at {address}: {source}")]
    ConnectionFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read from the connection
    #[error("Failed to read from kanata: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Kanata closed the connection
    #[error("Connection to kanata closed")]
    ConnectionClosed,
}
