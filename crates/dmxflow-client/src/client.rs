//! Art-Net client handle and event loop
//!
//! [`ArtNetClient`] is a cheap clone over shared state. All network-driven
//! mutations happen on the single loop inside [`ArtNetClient::connect`];
//! handle methods mutate the same state under a short-lived lock and are
//! safe to call from any task or thread.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use dmxflow_core::{Node, PortAddress, Stats, UniverseInfo, DMX_UNIVERSE_SIZE};
use dmxflow_transport::ArtNetSocket;

use crate::builder::ArtNetBuilder;
use crate::error::{ClientError, Result};
use crate::events::ArtNetEvent;
use crate::state::{ClientConfig, ClientState, Destination, Outbound, TICK_INTERVAL};

/// Depth of the event broadcast channel
const EVENT_QUEUE_DEPTH: usize = 256;

struct Shared {
    state: Mutex<ClientState>,
    socket: RwLock<Option<Arc<ArtNetSocket>>>,
    events: broadcast::Sender<ArtNetEvent>,
    unicast_ip: Ipv4Addr,
    broadcast_ip: Ipv4Addr,
    shutdown: Notify,
    closed: AtomicBool,
}

/// An Art-Net participant
#[derive(Clone)]
pub struct ArtNetClient {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ArtNetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtNetClient").finish_non_exhaustive()
    }
}

impl ArtNetClient {
    /// Create a builder
    pub fn builder() -> ArtNetBuilder {
        ArtNetBuilder::new()
    }

    pub(crate) fn new(config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_QUEUE_DEPTH);
        let unicast_ip = config.unicast_ip;
        let broadcast_ip = config.broadcast_ip;
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ClientState::new(config, events.clone())),
                socket: RwLock::new(None),
                events,
                unicast_ip,
                broadcast_ip,
                shutdown: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Bind the Art-Net port and run discovery, reception and pacing until
    /// [`close`](Self::close) is called or the socket dies. Bind failure is
    /// the only fatal error.
    pub async fn connect(&self) -> Result<()> {
        let socket = Arc::new(ArtNetSocket::bind()?);
        info!(
            "art-net client up: unicast {} broadcast {}",
            self.shared.unicast_ip, self.shared.broadcast_ip
        );
        *self.shared.socket.write() = Some(socket.clone());

        let mut rx = socket.start_receiver();
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if self.shared.closed.load(Ordering::Acquire) {
                break;
            }
            tokio::select! {
                _ = self.shared.shutdown.notified() => break,
                received = rx.recv() => match received {
                    Some((data, src)) => {
                        let out = self
                            .shared
                            .state
                            .lock()
                            .handle_datagram(&data, src, Instant::now());
                        self.send_all(out).await;
                    }
                    None => {
                        warn!("receive channel closed, shutting down");
                        break;
                    }
                },
                _ = tick.tick() => {
                    let out = self.shared.state.lock().tick(Instant::now());
                    self.send_all(out).await;
                }
            }
        }

        *self.shared.socket.write() = None;
        info!("art-net client stopped");
        Ok(())
    }

    /// Stop the loop; `connect` returns shortly after
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.shutdown.notify_waiters();
    }

    /// Adopt a local port at `address` ("N:S:U"). An input port publishes
    /// DMX to the network, an output port consumes it; passing both false
    /// releases the address. Announces the change to peers.
    pub async fn set_port_config(
        &self,
        address: &str,
        input: bool,
        output: bool,
    ) -> Result<UniverseHandle> {
        let address: PortAddress = address.parse().map_err(ClientError::Protocol)?;
        let out = self
            .shared
            .state
            .lock()
            .set_port_config(address, input, output);
        self.send_all(out).await;
        Ok(UniverseHandle {
            client: self.clone(),
            address,
        })
    }

    /// Stage channel data for a locally configured universe and transmit
    /// within the pacing rules
    pub async fn set_dmx(&self, address: PortAddress, data: &[u8]) -> Result<()> {
        if data.is_empty() || data.len() > DMX_UNIVERSE_SIZE {
            return Err(ClientError::InvalidDmxLength(data.len()));
        }
        let out = self
            .shared
            .state
            .lock()
            .set_dmx(address, data, Instant::now())?;
        self.send_all(out).await;
        Ok(())
    }

    /// Read back a universe, zero-padded to 512 channels
    pub fn get_dmx(&self, address: PortAddress) -> Result<Vec<u8>> {
        Ok(self.shared.state.lock().get_dmx(address)?)
    }

    /// Snapshot of all discovered peers
    pub fn list_nodes(&self) -> Vec<Node> {
        self.shared.state.lock().list_nodes()
    }

    /// Snapshot of all known universes with their publisher/subscriber sets
    pub fn list_universes(&self) -> Vec<UniverseInfo> {
        self.shared.state.lock().list_universes()
    }

    /// Traffic counters
    pub fn stats(&self) -> Stats {
        self.shared.state.lock().stats
    }

    /// Subscribe to model-change notifications
    pub fn events(&self) -> broadcast::Receiver<ArtNetEvent> {
        self.shared.events.subscribe()
    }

    /// Our source address
    pub fn local_ip(&self) -> Ipv4Addr {
        self.shared.unicast_ip
    }

    /// Where broadcasts go
    pub fn broadcast_ip(&self) -> Ipv4Addr {
        self.shared.broadcast_ip
    }

    async fn send_all(&self, out: Vec<Outbound>) {
        if out.is_empty() {
            return;
        }
        let socket = self.shared.socket.read().clone();
        let Some(socket) = socket else {
            debug!("not connected, dropping {} frame(s)", out.len());
            return;
        };
        for Outbound { dst, packet } in out {
            let bytes = match packet.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("failed to encode outbound frame: {}", e);
                    continue;
                }
            };
            let ip = match dst {
                Destination::Broadcast => self.shared.broadcast_ip,
                Destination::Unicast(ip) => ip,
            };
            match socket.send_to(&bytes, ip).await {
                Ok(()) => self.shared.state.lock().stats.packets_tx += 1,
                Err(e) => warn!("send to {} failed: {}", ip, e),
            }
        }
    }
}

/// Handle to one locally configured universe
#[derive(Clone)]
pub struct UniverseHandle {
    client: ArtNetClient,
    address: PortAddress,
}

impl UniverseHandle {
    pub fn address(&self) -> PortAddress {
        self.address
    }

    /// See [`ArtNetClient::set_dmx`]
    pub async fn set_dmx(&self, data: &[u8]) -> Result<()> {
        self.client.set_dmx(self.address, data).await
    }

    /// See [`ArtNetClient::get_dmx`]
    pub fn get_dmx(&self) -> Result<Vec<u8>> {
        self.client.get_dmx(self.address)
    }
}
