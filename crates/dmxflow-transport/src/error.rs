//! Transport error types

use thiserror::Error;

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Socket-level errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Could not bind the Art-Net port; fatal at startup
    #[error("bind failed: {0}")]
    Bind(std::io::Error),

    /// A single datagram could not be sent; never fatal
    #[error("send failed: {0}")]
    Send(std::io::Error),

    /// The socket has been shut down
    #[error("socket closed")]
    Closed,
}
