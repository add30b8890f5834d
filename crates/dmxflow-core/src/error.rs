//! Error types for DMXflow core

use thiserror::Error;

use crate::address::PortAddress;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Protocol and state errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Datagram does not start with the `Art-Net\0` preamble
    #[error("bad magic: datagram is not Art-Net")]
    BadMagic,

    /// Datagram shorter than its fixed layout or declared length requires
    #[error("truncated frame: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    /// OpCode outside the handled set (strict decoding only)
    #[error("unsupported opcode: 0x{0:04x}")]
    UnsupportedOpcode(u16),

    /// A field value outside its legal range
    #[error("field out of range: {0}")]
    FieldOutOfRange(&'static str),

    /// Port address outside the 15-bit domain or unparseable text
    #[error("invalid port address: {0}")]
    InvalidPortAddress(String),

    /// DMX access to an address with no local port configured
    #[error("universe not configured: {0}")]
    UniverseNotConfigured(PortAddress),
}
