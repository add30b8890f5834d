//! DMXflow Client
//!
//! An Art-Net participant: joins the broadcast domain on UDP 6454,
//! discovers peers through the ArtPoll/ArtPollReply exchange, advertises
//! its own ports, and publishes or subscribes DMX universes with
//! change-driven, rate-limited transmission.
//!
//! ```no_run
//! use dmxflow_client::ArtNetClient;
//!
//! # async fn run() -> dmxflow_client::Result<()> {
//! let client = ArtNetClient::builder()
//!     .short_name("console")
//!     .ips("2.0.0.10".parse().unwrap(), "2.255.255.255".parse().unwrap())
//!     .build()?;
//!
//! let universe = client.set_port_config("0:0:1", true, false).await?;
//! universe.set_dmx(&[255; 16]).await?;
//!
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod error;
pub mod events;
pub mod iface;
mod state;

pub use builder::ArtNetBuilder;
pub use client::{ArtNetClient, UniverseHandle};
pub use error::{ClientError, Result};
pub use events::ArtNetEvent;
pub use iface::{InterfaceCandidate, InterfaceRanking, InterfaceResolver, StaticResolver};

pub use dmxflow_core::{
    LocalRole, Media, Node, NodeId, Port, PortAddress, PortDirection, Stats, UniverseInfo,
    ARTNET_PORT, DMX_UNIVERSE_SIZE,
};
