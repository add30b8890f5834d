//! Client builder

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::client::ArtNetClient;
use crate::error::{ClientError, Result};
use crate::iface::{select_interface, InterfaceRanking, InterfaceResolver};
use crate::state::ClientConfig;

/// Builder for [`ArtNetClient`]
///
/// Addressing comes from exactly one of two places: explicit
/// unicast/broadcast IPs, or an [`InterfaceResolver`] whose candidates are
/// ranked (optionally pinned to one interface by name). Mixing the two is
/// rejected.
pub struct ArtNetBuilder {
    interface: Option<String>,
    unicast_ip: Option<Ipv4Addr>,
    broadcast_ip: Option<Ipv4Addr>,
    short_name: String,
    long_name: String,
    esta_man: u16,
    oem: u16,
    style: u8,
    poll_interval: Duration,
    node_ttl: Duration,
    dmx_min_interval: Duration,
    dmx_keepalive: Duration,
    passive: bool,
    resolver: Option<Box<dyn InterfaceResolver>>,
    ranking: InterfaceRanking,
}

impl Default for ArtNetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtNetBuilder {
    pub fn new() -> Self {
        Self {
            interface: None,
            unicast_ip: None,
            broadcast_ip: None,
            short_name: "dmxflow".to_string(),
            long_name: "dmxflow (Art-Net)".to_string(),
            esta_man: 0x02AE,
            oem: 0x2CD3,
            // StController
            style: 1,
            poll_interval: Duration::from_millis(2500),
            node_ttl: Duration::from_millis(30_000),
            dmx_min_interval: Duration::from_millis(25),
            dmx_keepalive: Duration::from_millis(1000),
            passive: false,
            resolver: None,
            ranking: InterfaceRanking::default(),
        }
    }

    /// Pin interface selection to this name (still goes through the resolver)
    pub fn interface(mut self, name: &str) -> Self {
        self.interface = Some(name.to_string());
        self
    }

    /// Skip interface discovery entirely with explicit addresses
    pub fn ips(mut self, unicast: Ipv4Addr, broadcast: Ipv4Addr) -> Self {
        self.unicast_ip = Some(unicast);
        self.broadcast_ip = Some(broadcast);
        self
    }

    /// Short node name advertised in replies (18 bytes on the wire)
    pub fn short_name(mut self, name: &str) -> Self {
        self.short_name = name.to_string();
        self
    }

    /// Long node name advertised in replies (64 bytes on the wire)
    pub fn long_name(mut self, name: &str) -> Self {
        self.long_name = name.to_string();
        self
    }

    /// ESTA manufacturer code
    pub fn esta_man(mut self, code: u16) -> Self {
        self.esta_man = code;
        self
    }

    /// OEM code
    pub fn oem(mut self, code: u16) -> Self {
        self.oem = code;
        self
    }

    /// Style code (1 = controller)
    pub fn style(mut self, style: u8) -> Self {
        self.style = style;
        self
    }

    /// How often we broadcast ArtPoll and re-announce ourselves
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// How long a silent peer stays in the node registry
    pub fn node_ttl(mut self, ttl: Duration) -> Self {
        self.node_ttl = ttl;
        self
    }

    /// Minimum spacing between DMX transmissions per universe
    pub fn dmx_min_interval(mut self, interval: Duration) -> Self {
        self.dmx_min_interval = interval;
        self
    }

    /// Unchanged payloads are retransmitted at this interval
    pub fn dmx_keepalive(mut self, interval: Duration) -> Self {
        self.dmx_keepalive = interval;
        self
    }

    /// Monitor only: no polls, replies or DMX leave the client, and
    /// unsolicited DMX is recorded even for unknown universes
    pub fn passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    /// Source of interface candidates (the integrator's enumerator)
    pub fn resolver(mut self, resolver: impl InterfaceResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Override the interface preference table
    pub fn ranking(mut self, ranking: InterfaceRanking) -> Self {
        self.ranking = ranking;
        self
    }

    /// Validate the configuration and create the client
    pub fn build(self) -> Result<ArtNetClient> {
        let (unicast_ip, broadcast_ip, mac) = match (self.unicast_ip, self.broadcast_ip) {
            (Some(unicast), Some(broadcast)) => {
                if self.interface.is_some() {
                    return Err(ClientError::ConflictingIpConfig(
                        "an interface name and explicit ips were both supplied",
                    ));
                }
                (unicast, broadcast, [0u8; 6])
            }
            (None, None) => {
                let resolver = self.resolver.as_ref().ok_or_else(|| {
                    ClientError::UnknownInterface(self.interface.clone().unwrap_or_default())
                })?;
                let picked = select_interface(
                    resolver.candidates(),
                    &self.ranking,
                    self.interface.as_deref(),
                )?;
                (picked.ip, picked.broadcast, picked.mac)
            }
            _ => {
                return Err(ClientError::ConflictingIpConfig(
                    "unicast and broadcast ips must be supplied together",
                ))
            }
        };

        Ok(ArtNetClient::new(ClientConfig {
            short_name: self.short_name,
            long_name: self.long_name,
            esta_man: self.esta_man,
            oem: self.oem,
            style: self.style,
            poll_interval: self.poll_interval,
            node_ttl: self.node_ttl,
            dmx_min_interval: self.dmx_min_interval,
            dmx_keepalive: self.dmx_keepalive,
            passive: self.passive,
            unicast_ip,
            broadcast_ip,
            mac,
        }))
    }
}
