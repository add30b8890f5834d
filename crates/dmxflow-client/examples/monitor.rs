//! Passive Art-Net monitor: prints nodes, universes and DMX traffic.
//!
//! Run with explicit addressing, e.g.
//! `cargo run --example monitor -- 192.168.1.10 192.168.1.255`

use dmxflow_client::{ArtNetClient, ArtNetEvent};
use std::net::Ipv4Addr;

#[tokio::main]
async fn main() -> dmxflow_client::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let unicast: Ipv4Addr = args
        .next()
        .expect("usage: monitor <unicast-ip> <broadcast-ip>")
        .parse()
        .expect("bad unicast ip");
    let broadcast: Ipv4Addr = args
        .next()
        .expect("usage: monitor <unicast-ip> <broadcast-ip>")
        .parse()
        .expect("bad broadcast ip");

    let client = ArtNetClient::builder()
        .short_name("monitor")
        .ips(unicast, broadcast)
        .passive(true)
        .build()?;

    let mut events = client.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ArtNetEvent::NodeDiscovered(node) => {
                    println!("+ node {} ({})", node.id, node.short_name)
                }
                ArtNetEvent::NodeLost(id) => println!("- node {id}"),
                ArtNetEvent::UniverseDiscovered(address) => println!("+ universe {address}"),
                ArtNetEvent::DmxReceived { address, from } => {
                    println!("  dmx {address} from {from}")
                }
            }
        }
    });

    client.connect().await
}
