//! DMXflow Core
//!
//! Protocol primitives for an Art-Net participant:
//! - Datagram encoding/decoding ([`ArtPacket`], [`packet`])
//! - 15-bit port addresses ([`PortAddress`])
//! - The discovered-node model and registry ([`Node`], [`NodeRegistry`])
//! - Per-universe DMX state with sequence handling ([`Universe`], [`UniverseRegistry`])
//!
//! This crate does no I/O. Every state transition that depends on time takes
//! an explicit `Instant`, so the registries can be driven and inspected from
//! plain synchronous tests.

pub mod address;
pub mod error;
pub mod node;
pub mod packet;
pub mod universe;

pub use address::PortAddress;
pub use error::{Error, Result};
pub use node::{Media, Node, NodeDelta, NodeId, NodeRegistry, Port, PortDirection, Stats};
pub use packet::{ArtDmx, ArtPacket, ArtPoll, ArtPollReply};
pub use universe::{LocalRole, Universe, UniverseInfo, UniverseRegistry};

/// UDP port all Art-Net traffic uses (0x1936).
pub const ARTNET_PORT: u16 = 6454;

/// Every Art-Net datagram starts with this 8-byte preamble.
pub const ARTNET_ID: &[u8; 8] = b"Art-Net\0";

/// Protocol revision we speak. Lower values are tolerated on receive.
pub const PROTOCOL_VERSION: u16 = 14;

/// Channels per DMX universe.
pub const DMX_UNIVERSE_SIZE: usize = 512;

/// Wire size of a full ArtPollReply record.
pub const POLL_REPLY_LENGTH: usize = 239;
