//! DMXflow Transport
//!
//! UDP plumbing for an Art-Net participant: a broadcast-capable socket
//! bound to port 6454 with a channel-based receive path. Everything above
//! the datagram level (codec, registries, pacing) lives elsewhere.

pub mod error;
pub mod udp;

pub use error::{Result, TransportError};
pub use udp::ArtNetSocket;
