//! Per-universe DMX state
//!
//! Each universe tracks which peers publish into it and which subscribe to
//! it, plus the last channel data seen or written locally. Outbound frames
//! carry a wrapping 1..=255 sequence (0 is reserved for "no sequencing");
//! inbound frames are deduplicated with the signed-delta rule below.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::address::PortAddress;
use crate::node::{NodeId, PortDirection};
use crate::{Error, Result, DMX_UNIVERSE_SIZE};

/// How this process participates in a universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalRole {
    #[default]
    None,
    /// We have an input port: we transmit ArtDMX
    Publisher,
    /// We have an output port: we consume ArtDMX
    Subscriber,
    Both,
}

impl LocalRole {
    pub fn from_flags(input: bool, output: bool) -> Self {
        match (input, output) {
            (true, true) => LocalRole::Both,
            (true, false) => LocalRole::Publisher,
            (false, true) => LocalRole::Subscriber,
            (false, false) => LocalRole::None,
        }
    }

    pub fn is_publisher(self) -> bool {
        matches!(self, LocalRole::Publisher | LocalRole::Both)
    }

    pub fn is_subscriber(self) -> bool {
        matches!(self, LocalRole::Subscriber | LocalRole::Both)
    }
}

/// State held per 15-bit port address
#[derive(Debug, Clone)]
pub struct Universe {
    /// Peers advertising an input port at this address
    pub publishers: BTreeSet<NodeId>,
    /// Peers advertising an output port at this address
    pub subscribers: BTreeSet<NodeId>,
    pub local_role: LocalRole,
    data: Vec<u8>,
    tx_sequence: u8,
    rx_sequence: u8,
    /// When we last transmitted, for pacing
    pub last_tx: Option<Instant>,
    /// Payload changed since the last transmission
    pub dirty: bool,
}

impl Universe {
    fn new() -> Self {
        Self {
            publishers: BTreeSet::new(),
            subscribers: BTreeSet::new(),
            local_role: LocalRole::None,
            data: Vec::new(),
            tx_sequence: 0,
            rx_sequence: 0,
            last_tx: None,
            dirty: false,
        }
    }

    /// Channel data as stored (may be shorter than a full universe)
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Channel data zero-padded to the full universe size
    pub fn dmx(&self) -> Vec<u8> {
        let mut out = vec![0u8; DMX_UNIVERSE_SIZE];
        out[..self.data.len()].copy_from_slice(&self.data);
        out
    }

    /// Next outbound sequence: 1, 2, …, 255, 1, … (0 is never emitted)
    pub fn next_tx_sequence(&mut self) -> u8 {
        self.tx_sequence = if self.tx_sequence == 255 {
            1
        } else {
            self.tx_sequence + 1
        };
        self.tx_sequence
    }

    /// Apply the inbound sequence rule. `0` is accepted unconditionally and
    /// leaves the window untouched; otherwise a packet is accepted when its
    /// signed 8-bit distance from the last accepted sequence is positive,
    /// or on the first sequenced packet, or at the -128 wrap boundary.
    pub fn accept_sequence(&mut self, seq: u8) -> bool {
        if seq == 0 {
            return true;
        }
        if self.rx_sequence == 0 {
            self.rx_sequence = seq;
            return true;
        }
        let delta = seq.wrapping_sub(self.rx_sequence) as i8;
        if delta > 0 || delta == i8::MIN {
            self.rx_sequence = seq;
            return true;
        }
        false
    }

    fn is_orphan(&self) -> bool {
        self.publishers.is_empty()
            && self.subscribers.is_empty()
            && self.local_role == LocalRole::None
    }
}

/// Read-only universe snapshot for listings
#[derive(Debug, Clone)]
pub struct UniverseInfo {
    pub address: PortAddress,
    pub publishers: Vec<NodeId>,
    pub subscribers: Vec<NodeId>,
    pub local_role: LocalRole,
}

/// Map of all universes currently known
#[derive(Debug, Default)]
pub struct UniverseRegistry {
    universes: BTreeMap<PortAddress, Universe>,
}

impl UniverseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt (or release) an address for local use. Idempotent; releasing
    /// the last role drops an otherwise unused universe.
    pub fn configure_local(&mut self, address: PortAddress, input: bool, output: bool) {
        let universe = self.universes.entry(address).or_insert_with(Universe::new);
        universe.local_role = LocalRole::from_flags(input, output);
        if universe.is_orphan() {
            self.universes.remove(&address);
        }
    }

    /// Record a peer membership discovered from a poll reply
    pub fn add_membership(
        &mut self,
        address: PortAddress,
        id: NodeId,
        direction: PortDirection,
    ) -> bool {
        let universe = self.universes.entry(address).or_insert_with(Universe::new);
        match direction {
            PortDirection::Input => universe.publishers.insert(id),
            PortDirection::Output => universe.subscribers.insert(id),
        }
    }

    /// Remove a peer membership; drops the universe if nothing refers to it
    pub fn remove_membership(&mut self, address: PortAddress, id: NodeId, direction: PortDirection) {
        if let Some(universe) = self.universes.get_mut(&address) {
            match direction {
                PortDirection::Input => universe.publishers.remove(&id),
                PortDirection::Output => universe.subscribers.remove(&id),
            };
            if universe.is_orphan() {
                self.universes.remove(&address);
            }
        }
    }

    /// Store inbound channel data. Only universes we subscribe to accept
    /// data, unless `passive` monitoring is on, in which case unknown
    /// universes are created lazily with no local role. Returns whether the
    /// payload was stored.
    pub fn on_dmx(&mut self, address: PortAddress, sequence: u8, payload: &[u8], passive: bool) -> bool {
        if !self.universes.contains_key(&address) {
            if !passive {
                return false;
            }
            self.universes.insert(address, Universe::new());
        }
        let universe = self.universes.get_mut(&address).expect("just ensured");
        if !universe.local_role.is_subscriber() && !passive {
            return false;
        }
        if !universe.accept_sequence(sequence) {
            return false;
        }
        universe.data.clear();
        universe
            .data
            .extend_from_slice(&payload[..payload.len().min(DMX_UNIVERSE_SIZE)]);
        true
    }

    /// Stage channel data for local transmission
    pub fn set_dmx(&mut self, address: PortAddress, data: &[u8]) -> Result<()> {
        let universe = self
            .universes
            .get_mut(&address)
            .filter(|u| u.local_role != LocalRole::None)
            .ok_or(Error::UniverseNotConfigured(address))?;
        let changed = universe.data != data;
        universe.data.clear();
        universe.data.extend_from_slice(data);
        if changed || universe.last_tx.is_none() {
            universe.dirty = true;
        }
        Ok(())
    }

    /// Read back channel data, zero-padded to 512
    pub fn get_dmx(&self, address: PortAddress) -> Result<Vec<u8>> {
        self.universes
            .get(&address)
            .filter(|u| u.local_role != LocalRole::None)
            .map(Universe::dmx)
            .ok_or(Error::UniverseNotConfigured(address))
    }

    pub fn get(&self, address: PortAddress) -> Option<&Universe> {
        self.universes.get(&address)
    }

    pub fn get_mut(&mut self, address: PortAddress) -> Option<&mut Universe> {
        self.universes.get_mut(&address)
    }

    pub fn contains(&self, address: PortAddress) -> bool {
        self.universes.contains_key(&address)
    }

    pub fn len(&self) -> usize {
        self.universes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.universes.is_empty()
    }

    /// Addresses of universes we publish to, for the pacing pass
    pub fn published_addresses(&self) -> Vec<PortAddress> {
        self.universes
            .iter()
            .filter(|(_, u)| u.local_role.is_publisher())
            .map(|(addr, _)| *addr)
            .collect()
    }

    /// Stable snapshot, ordered by address
    pub fn snapshot(&self) -> Vec<UniverseInfo> {
        self.universes
            .iter()
            .map(|(addr, u)| UniverseInfo {
                address: *addr,
                publishers: u.publishers.iter().copied().collect(),
                subscribers: u.subscribers.iter().copied().collect(),
                local_role: u.local_role,
            })
            .collect()
    }
}
