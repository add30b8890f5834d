//! Discovered-node model and registry
//!
//! Peers are keyed by `(ip, bind index)`: one IP may host several logical
//! nodes, each describing up to four input and four output ports in its
//! ArtPollReply. The registry rebuilds a node's port list wholesale from
//! every reply and reports the membership delta so the universe registry
//! can be reconciled without walking all nodes.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::address::PortAddress;
use crate::packet::ArtPollReply;

/// Identity of a discovered peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub ip: Ipv4Addr,
    pub bind_index: u8,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.ip, self.bind_index)
    }
}

/// Direction of a port, seen from the Art-Net network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortDirection {
    /// The node feeds DMX into the universe (it publishes ArtDMX)
    Input,
    /// The node consumes the universe (it subscribes to ArtDMX)
    Output,
}

/// Medium selected by the low bits of a PortTypes entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Media {
    Dmx,
    Midi,
    Avab,
    ColortranCmx,
    Adb62_5,
    ArtNet,
    Dali,
    Other(u8),
}

impl Media {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Media::Dmx,
            1 => Media::Midi,
            2 => Media::Avab,
            3 => Media::ColortranCmx,
            4 => Media::Adb62_5,
            5 => Media::ArtNet,
            6 => Media::Dali,
            other => Media::Other(other),
        }
    }

    pub fn is_dmx(self) -> bool {
        matches!(self, Media::Dmx)
    }
}

/// One advertised port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub address: PortAddress,
    pub direction: PortDirection,
    pub media: Media,
}

impl ArtPollReply {
    /// Expand the packed port arrays into [`Port`] values. A single entry
    /// can declare both directions; the universe nibble comes from `sw_in`
    /// for inputs and `sw_out` for outputs.
    pub fn ports(&self) -> Vec<Port> {
        let net = self.net_switch & 0x7F;
        let subnet = self.sub_switch & 0x0F;
        let mut ports = Vec::new();
        for i in 0..(self.num_ports as usize).min(4) {
            let entry = self.port_types[i];
            let media = Media::from_code(entry & 0x1F);
            if entry & 0x80 != 0 {
                ports.push(Port {
                    address: PortAddress::from_net_subuni(
                        net,
                        (subnet << 4) | (self.sw_in[i] & 0x0F),
                    ),
                    direction: PortDirection::Input,
                    media,
                });
            }
            if entry & 0x40 != 0 {
                ports.push(Port {
                    address: PortAddress::from_net_subuni(
                        net,
                        (subnet << 4) | (self.sw_out[i] & 0x0F),
                    ),
                    direction: PortDirection::Output,
                    media,
                });
            }
        }
        ports
    }
}

/// A discovered peer
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub short_name: String,
    pub long_name: String,
    pub style: u8,
    pub esta_man: u16,
    pub oem: u16,
    pub mac: [u8; 6],
    pub udp_port: u16,
    pub ports: Vec<Port>,
    pub last_seen: Instant,
}

impl Node {
    /// DMX universe memberships advertised by this node
    fn dmx_memberships(&self) -> BTreeSet<(PortAddress, PortDirection)> {
        self.ports
            .iter()
            .filter(|p| p.media.is_dmx())
            .map(|p| (p.address, p.direction))
            .collect()
    }
}

/// Outcome of a registry upsert, used for reconciliation and events
#[derive(Debug)]
pub struct NodeDelta {
    pub id: NodeId,
    pub is_new: bool,
    pub added: Vec<(PortAddress, PortDirection)>,
    pub removed: Vec<(PortAddress, PortDirection)>,
}

/// Set of known peers with TTL-based expiry
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: HashMap<NodeId, Node>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or refresh the node a reply describes. The port list for that
    /// bind is replaced wholesale; the returned delta lists the DMX
    /// memberships that appeared and disappeared.
    pub fn upsert_from_reply(
        &mut self,
        reply: &ArtPollReply,
        src_ip: Ipv4Addr,
        now: Instant,
    ) -> NodeDelta {
        let id = NodeId {
            ip: src_ip,
            // bind 0 and bind 1 mean the same thing on the wire
            bind_index: reply.bind_index.max(1),
        };
        let ports = reply.ports();
        let fresh = Node {
            id,
            short_name: reply.short_name.clone(),
            long_name: reply.long_name.clone(),
            style: reply.style,
            esta_man: reply.esta_man,
            oem: reply.oem,
            mac: reply.mac,
            udp_port: reply.udp_port,
            ports,
            last_seen: now,
        };

        let new_set = fresh.dmx_memberships();
        match self.nodes.insert(id, fresh) {
            Some(previous) => {
                let old_set = previous.dmx_memberships();
                NodeDelta {
                    id,
                    is_new: false,
                    added: new_set.difference(&old_set).copied().collect(),
                    removed: old_set.difference(&new_set).copied().collect(),
                }
            }
            None => NodeDelta {
                id,
                is_new: true,
                added: new_set.into_iter().collect(),
                removed: Vec::new(),
            },
        }
    }

    /// Drop peers not heard from within `ttl`, returning each removed id
    /// with the memberships it held.
    pub fn sweep(
        &mut self,
        now: Instant,
        ttl: Duration,
    ) -> Vec<(NodeId, Vec<(PortAddress, PortDirection)>)> {
        let expired: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| now.duration_since(n.last_seen) > ttl)
            .map(|n| n.id)
            .collect();

        expired
            .into_iter()
            .map(|id| {
                let node = self.nodes.remove(&id).expect("expired id present");
                (id, node.dmx_memberships().into_iter().collect())
            })
            .collect()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stable snapshot, ordered by id
    pub fn snapshot(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.nodes.values().cloned().collect();
        nodes.sort_by_key(|n| n.id);
        nodes
    }
}

/// Traffic and fault counters, cloned out through the client
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub packets_rx: u64,
    pub packets_tx: u64,
    pub decode_errors: u64,
    pub unknown_opcodes: u64,
    pub dmx_rejected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_with_ports(bind_index: u8, port_types: [u8; 4], num_ports: u8) -> ArtPollReply {
        ArtPollReply {
            short_name: "peer".into(),
            num_ports,
            port_types,
            sw_in: [1, 2, 3, 4],
            sw_out: [5, 6, 7, 8],
            bind_index,
            ..Default::default()
        }
    }

    #[test]
    fn test_port_expansion() {
        let reply = ArtPollReply {
            net_switch: 2,
            sub_switch: 1,
            num_ports: 2,
            port_types: [0x80, 0x40, 0, 0],
            sw_in: [3, 0, 0, 0],
            sw_out: [0, 7, 0, 0],
            ..Default::default()
        };
        let ports = reply.ports();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].direction, PortDirection::Input);
        assert_eq!(ports[0].address.to_string(), "2:1:3");
        assert_eq!(ports[1].direction, PortDirection::Output);
        assert_eq!(ports[1].address.to_string(), "2:1:7");
    }

    #[test]
    fn test_port_expansion_both_directions() {
        let reply = ArtPollReply {
            num_ports: 1,
            port_types: [0xC0, 0, 0, 0],
            sw_in: [4, 0, 0, 0],
            sw_out: [4, 0, 0, 0],
            ..Default::default()
        };
        let ports = reply.ports();
        assert_eq!(ports.len(), 2);
        assert!(ports.iter().any(|p| p.direction == PortDirection::Input));
        assert!(ports.iter().any(|p| p.direction == PortDirection::Output));
    }

    #[test]
    fn test_non_dmx_media_kept_on_node() {
        let reply = ArtPollReply {
            num_ports: 1,
            port_types: [0x80 | 1, 0, 0, 0], // MIDI input
            sw_in: [0, 0, 0, 0],
            ..Default::default()
        };
        let ports = reply.ports();
        assert_eq!(ports[0].media, Media::Midi);
        assert!(!ports[0].media.is_dmx());
    }

    #[test]
    fn test_upsert_delta_and_bind_normalization() {
        let mut registry = NodeRegistry::new();
        let now = Instant::now();
        let ip = Ipv4Addr::new(10, 0, 0, 9);

        let delta = registry.upsert_from_reply(&reply_with_ports(0, [0x80, 0, 0, 0], 1), ip, now);
        assert!(delta.is_new);
        assert_eq!(delta.id.bind_index, 1);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.added[0].1, PortDirection::Input);

        // same bind, port flips direction
        let delta = registry.upsert_from_reply(&reply_with_ports(1, [0x40, 0, 0, 0], 1), ip, now);
        assert!(!delta.is_new);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.removed.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sweep_expires_by_ttl() {
        let mut registry = NodeRegistry::new();
        let start = Instant::now();
        let ip = Ipv4Addr::new(10, 0, 0, 9);
        registry.upsert_from_reply(&reply_with_ports(1, [0x80, 0, 0, 0], 1), ip, start);

        let ttl = Duration::from_secs(30);
        assert!(registry.sweep(start + Duration::from_secs(29), ttl).is_empty());

        let removed = registry.sweep(start + Duration::from_secs(31), ttl);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, NodeId { ip, bind_index: 1 });
        assert_eq!(removed[0].1.len(), 1);
        assert!(registry.is_empty());
    }
}
