//! Client state machine
//!
//! Every protocol behavior is a synchronous transition over an explicit
//! clock: inbound datagrams, user configuration calls and the periodic tick
//! all return the list of datagrams to put on the wire. The event loop in
//! `client.rs` is only plumbing between this state and the socket, which
//! keeps discovery, reconciliation and pacing testable without sockets or
//! sleeps.

use std::collections::{BTreeMap, BTreeSet};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, info};

use dmxflow_core::{
    ArtDmx, ArtPacket, ArtPoll, ArtPollReply, Node, NodeRegistry, PortAddress, Result as CoreResult,
    Stats, UniverseInfo, UniverseRegistry, ARTNET_PORT,
};

use crate::events::ArtNetEvent;

/// Event-loop granularity; also the floor of the DMX pacing gate
pub(crate) const TICK_INTERVAL: Duration = Duration::from_millis(25);

/// How often expired nodes are collected
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Firmware revision advertised in our replies
const FIRMWARE_VERSION: u16 = 1;

/// Status2 bit: we understand 15-bit port addresses
const STATUS2_15BIT: u8 = 0x08;

/// Where a datagram should go; the loop resolves `Broadcast` to the
/// configured broadcast address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Destination {
    Broadcast,
    Unicast(Ipv4Addr),
}

/// One datagram ready for transmission
#[derive(Debug, Clone)]
pub(crate) struct Outbound {
    pub dst: Destination,
    pub packet: ArtPacket,
}

/// Resolved configuration the state runs with
#[derive(Debug, Clone)]
pub(crate) struct ClientConfig {
    pub short_name: String,
    pub long_name: String,
    pub esta_man: u16,
    pub oem: u16,
    pub style: u8,
    pub poll_interval: Duration,
    pub node_ttl: Duration,
    pub dmx_min_interval: Duration,
    pub dmx_keepalive: Duration,
    pub passive: bool,
    pub unicast_ip: Ipv4Addr,
    pub broadcast_ip: Ipv4Addr,
    pub mac: [u8; 6],
}

pub(crate) struct ClientState {
    config: ClientConfig,
    nodes: NodeRegistry,
    universes: UniverseRegistry,
    /// Local ports keyed by address; bind indexes follow ascending address
    /// order, one address per bind
    local_ports: BTreeMap<PortAddress, (bool, bool)>,
    last_poll: Option<Instant>,
    last_sweep: Option<Instant>,
    report_counter: u16,
    pub stats: Stats,
    events: broadcast::Sender<ArtNetEvent>,
}

impl ClientState {
    pub fn new(config: ClientConfig, events: broadcast::Sender<ArtNetEvent>) -> Self {
        Self {
            config,
            nodes: NodeRegistry::new(),
            universes: UniverseRegistry::new(),
            local_ports: BTreeMap::new(),
            last_poll: None,
            last_sweep: None,
            report_counter: 0,
            stats: Stats::default(),
            events,
        }
    }

    fn emit(&self, event: ArtNetEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Process one datagram; reconciliation completes before this returns,
    /// so the next datagram always sees a consistent model.
    pub fn handle_datagram(&mut self, data: &[u8], src: SocketAddr, now: Instant) -> Vec<Outbound> {
        let SocketAddr::V4(src) = src else {
            return Vec::new();
        };
        let src_ip = *src.ip();

        let packet = match ArtPacket::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                self.stats.decode_errors += 1;
                debug!("dropping datagram from {}: {}", src_ip, e);
                return Vec::new();
            }
        };
        self.stats.packets_rx += 1;

        match packet {
            ArtPacket::Poll(poll) => {
                debug!(
                    "poll from {} talk_to_me={:#04x} priority={:#04x}",
                    src_ip, poll.talk_to_me, poll.priority
                );
                if self.config.passive {
                    Vec::new()
                } else {
                    self.reply_burst()
                }
            }
            ArtPacket::PollReply(reply) => {
                self.on_poll_reply(reply, src_ip, now);
                Vec::new()
            }
            ArtPacket::Dmx(dmx) => {
                self.on_dmx(dmx, src_ip);
                Vec::new()
            }
            ArtPacket::Unknown { opcode, .. } => {
                self.stats.unknown_opcodes += 1;
                debug!("ignoring opcode {:#06x} from {}", opcode, src_ip);
                Vec::new()
            }
        }
    }

    fn on_poll_reply(&mut self, reply: ArtPollReply, src_ip: Ipv4Addr, now: Instant) {
        let delta = self.nodes.upsert_from_reply(&reply, src_ip, now);

        for (address, direction) in &delta.added {
            let created = !self.universes.contains(*address);
            self.universes.add_membership(*address, delta.id, *direction);
            if created {
                self.emit(ArtNetEvent::UniverseDiscovered(*address));
            }
        }
        for (address, direction) in &delta.removed {
            self.universes.remove_membership(*address, delta.id, *direction);
        }

        if delta.is_new {
            info!(
                "discovered node {} ({:?}) with {} port(s)",
                delta.id,
                reply.short_name,
                delta.added.len()
            );
            if let Some(node) = self.nodes.get(&delta.id) {
                self.emit(ArtNetEvent::NodeDiscovered(node.clone()));
            }
        }
    }

    fn on_dmx(&mut self, dmx: ArtDmx, src_ip: Ipv4Addr) {
        // our own broadcasts come back through the socket
        if src_ip == self.config.unicast_ip {
            return;
        }
        let accepted =
            self.universes
                .on_dmx(dmx.address, dmx.sequence, &dmx.data, self.config.passive);
        if accepted {
            self.emit(ArtNetEvent::DmxReceived {
                address: dmx.address,
                from: src_ip,
            });
        } else {
            self.stats.dmx_rejected += 1;
        }
    }

    // ========================================================================
    // Local configuration and universe I/O
    // ========================================================================

    /// Adopt or release a local port. Announces the change with a reply
    /// burst unless running passively.
    pub fn set_port_config(
        &mut self,
        address: PortAddress,
        input: bool,
        output: bool,
    ) -> Vec<Outbound> {
        if input || output {
            self.local_ports.insert(address, (input, output));
        } else {
            self.local_ports.remove(&address);
        }
        let created = !self.universes.contains(address);
        self.universes.configure_local(address, input, output);
        if created && self.universes.contains(address) {
            self.emit(ArtNetEvent::UniverseDiscovered(address));
        }
        info!(
            "local port {} input={} output={}",
            address, input, output
        );

        if self.config.passive {
            Vec::new()
        } else {
            self.reply_burst()
        }
    }

    /// Stage channel data; transmits immediately when the pacing gate is
    /// open, otherwise the next tick flushes it.
    pub fn set_dmx(
        &mut self,
        address: PortAddress,
        data: &[u8],
        now: Instant,
    ) -> CoreResult<Vec<Outbound>> {
        self.universes.set_dmx(address, data)?;
        if self.config.passive {
            return Ok(Vec::new());
        }

        let universe = self.universes.get(address).expect("just written");
        if universe.local_role.is_publisher() {
            let gate_open = universe
                .last_tx
                .map_or(true, |t| now.duration_since(t) >= self.config.dmx_min_interval);
            if gate_open {
                return Ok(self.emit_dmx(address, now));
            }
        }
        Ok(Vec::new())
    }

    pub fn get_dmx(&self, address: PortAddress) -> CoreResult<Vec<u8>> {
        self.universes.get_dmx(address)
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// One pass of the periodic work: poll + self-announce, per-universe
    /// DMX pacing, node expiry. Driven every [`TICK_INTERVAL`].
    pub fn tick(&mut self, now: Instant) -> Vec<Outbound> {
        let mut out = Vec::new();

        if !self.config.passive {
            let poll_due = self
                .last_poll
                .map_or(true, |t| now.duration_since(t) >= self.config.poll_interval);
            if poll_due {
                self.last_poll = Some(now);
                out.push(Outbound {
                    dst: Destination::Broadcast,
                    packet: ArtPacket::Poll(ArtPoll::default()),
                });
                out.extend(self.reply_burst());
            }

            for address in self.universes.published_addresses() {
                let universe = self.universes.get(address).expect("listed");
                let due = if universe.dirty {
                    universe
                        .last_tx
                        .map_or(true, |t| now.duration_since(t) >= self.config.dmx_min_interval)
                } else {
                    universe
                        .last_tx
                        .is_some_and(|t| now.duration_since(t) >= self.config.dmx_keepalive)
                };
                if due {
                    out.extend(self.emit_dmx(address, now));
                }
            }
        }

        let sweep_due = self
            .last_sweep
            .map_or(true, |t| now.duration_since(t) >= SWEEP_INTERVAL);
        if sweep_due {
            self.last_sweep = Some(now);
            self.sweep(now);
        }

        out
    }

    fn sweep(&mut self, now: Instant) {
        for (id, memberships) in self.nodes.sweep(now, self.config.node_ttl) {
            info!("node {} timed out", id);
            for (address, direction) in memberships {
                self.universes.remove_membership(address, id, direction);
            }
            self.emit(ArtNetEvent::NodeLost(id));
        }
    }

    /// Transmit one universe: broadcast with no known subscribers,
    /// otherwise unicast per distinct subscriber address. One emission,
    /// one sequence number.
    fn emit_dmx(&mut self, address: PortAddress, now: Instant) -> Vec<Outbound> {
        let universe = self.universes.get_mut(address).expect("publishing");
        let sequence = universe.next_tx_sequence();
        universe.last_tx = Some(now);
        universe.dirty = false;

        let data = if universe.data().is_empty() {
            universe.dmx()
        } else {
            universe.data().to_vec()
        };
        let packet = ArtDmx {
            sequence,
            physical: 0,
            address,
            data,
        };

        let destinations: BTreeSet<Ipv4Addr> =
            universe.subscribers.iter().map(|id| id.ip).collect();
        debug!(
            "dmx {} seq {} to {} subscriber(s)",
            address,
            sequence,
            destinations.len()
        );

        if destinations.is_empty() {
            vec![Outbound {
                dst: Destination::Broadcast,
                packet: ArtPacket::Dmx(packet),
            }]
        } else {
            destinations
                .into_iter()
                .map(|ip| Outbound {
                    dst: Destination::Unicast(ip),
                    packet: ArtPacket::Dmx(packet.clone()),
                })
                .collect()
        }
    }

    /// One ArtPollReply per local bind, in ascending bind order so peers
    /// reconstruct us deterministically. With no ports configured a single
    /// empty page still announces our identity.
    fn reply_burst(&mut self) -> Vec<Outbound> {
        self.report_counter = (self.report_counter + 1) % 10000;
        let node_report = format!("#0001 [{:04}] dmxflow ok", self.report_counter);

        let pages: Vec<(u8, Option<(PortAddress, bool, bool)>)> = if self.local_ports.is_empty() {
            vec![(1, None)]
        } else {
            self.local_ports
                .iter()
                .enumerate()
                .map(|(i, (addr, (input, output)))| {
                    ((i as u8).wrapping_add(1), Some((*addr, *input, *output)))
                })
                .collect()
        };

        pages
            .into_iter()
            .map(|(bind_index, port)| {
                let mut reply = ArtPollReply {
                    ip: self.config.unicast_ip,
                    udp_port: ARTNET_PORT,
                    firmware: FIRMWARE_VERSION,
                    oem: self.config.oem,
                    esta_man: self.config.esta_man,
                    short_name: self.config.short_name.clone(),
                    long_name: self.config.long_name.clone(),
                    node_report: node_report.clone(),
                    style: self.config.style,
                    mac: self.config.mac,
                    bind_ip: self.config.unicast_ip,
                    bind_index,
                    status2: STATUS2_15BIT,
                    ..Default::default()
                };
                if let Some((address, input, output)) = port {
                    reply.net_switch = address.net();
                    reply.sub_switch = address.subnet();
                    reply.num_ports = 1;
                    let mut entry = 0u8;
                    if input {
                        entry |= 0x80;
                        reply.sw_in[0] = address.universe();
                    }
                    if output {
                        entry |= 0x40;
                        reply.sw_out[0] = address.universe();
                    }
                    reply.port_types[0] = entry;
                }
                Outbound {
                    dst: Destination::Broadcast,
                    packet: ArtPacket::PollReply(reply),
                }
            })
            .collect()
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    pub fn list_nodes(&self) -> Vec<Node> {
        self.nodes.snapshot()
    }

    pub fn list_universes(&self) -> Vec<UniverseInfo> {
        self.universes.snapshot()
    }
}
