//! Client event notifications
//!
//! Snapshots are sent over a `tokio::sync::broadcast` channel, so the core
//! never runs user code while iterating its own registries. A lagging
//! receiver loses the oldest events; the registries remain the source of
//! truth and can always be re-listed.

use std::net::Ipv4Addr;

use dmxflow_core::{Node, NodeId, PortAddress};

/// Something changed in the node or universe model
#[derive(Debug, Clone)]
pub enum ArtNetEvent {
    /// A peer answered a poll for the first time
    NodeDiscovered(Node),
    /// A peer stopped replying and timed out
    NodeLost(NodeId),
    /// A universe appeared (peer advertisement, local config, or passive DMX)
    UniverseDiscovered(PortAddress),
    /// Accepted inbound channel data
    DmxReceived { address: PortAddress, from: Ipv4Addr },
}
