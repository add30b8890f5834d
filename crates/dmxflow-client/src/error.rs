//! Client error types

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced to the embedding application
#[derive(Error, Debug)]
pub enum ClientError {
    /// Explicit IPs and automatic interface discovery were mixed
    #[error("conflicting ip configuration: {0}")]
    ConflictingIpConfig(&'static str),

    /// A forced interface name matched no candidate, or the resolver
    /// produced no usable IPv4 interface at all
    #[error("unknown interface: {0:?}")]
    UnknownInterface(String),

    /// DMX payloads are 1..=512 channel values
    #[error("dmx payload must be 1..=512 bytes, got {0}")]
    InvalidDmxLength(usize),

    /// Protocol or registry error from the core
    #[error(transparent)]
    Protocol(#[from] dmxflow_core::Error),

    /// Socket-level error
    #[error(transparent)]
    Transport(#[from] dmxflow_transport::TransportError),
}
