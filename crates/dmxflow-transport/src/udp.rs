//! Art-Net UDP socket
//!
//! One socket serves both directions: it is bound to the well-known port
//! with `SO_REUSEADDR` (gateways and monitors often share a machine) and
//! `SO_BROADCAST` (polls, and DMX with no known subscriber, go to the
//! broadcast address).

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use dmxflow_core::ARTNET_PORT;

use crate::error::{Result, TransportError};

/// Largest datagram we expect; anything bigger than a full ArtPollReply or
/// a 512-channel ArtDMX is foreign traffic we still must drain.
const RECV_BUFFER_SIZE: usize = 2048;

/// Depth of the receive channel between the socket task and the event loop
const RECV_QUEUE_DEPTH: usize = 128;

/// UDP socket bound to the Art-Net port
pub struct ArtNetSocket {
    socket: Arc<UdpSocket>,
}

impl ArtNetSocket {
    /// Bind `0.0.0.0:6454`. Failure here is fatal for the caller.
    pub fn bind() -> Result<Self> {
        Self::bind_addr(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, ARTNET_PORT))
    }

    /// Bind an explicit address (tests bind loopback with an ephemeral port)
    pub fn bind_addr(addr: SocketAddrV4) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(TransportError::Bind)?;
        socket.set_reuse_address(true).map_err(TransportError::Bind)?;
        socket.set_broadcast(true).map_err(TransportError::Bind)?;
        socket.set_nonblocking(true).map_err(TransportError::Bind)?;
        socket
            .bind(&SocketAddr::V4(addr).into())
            .map_err(TransportError::Bind)?;

        let socket = UdpSocket::from_std(socket.into()).map_err(TransportError::Bind)?;
        info!("bound Art-Net socket on {}", socket.local_addr().map_err(TransportError::Bind)?);

        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    /// Local address, mostly for diagnostics
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Bind)
    }

    /// Send one datagram to `ip` on the Art-Net port
    pub async fn send_to(&self, data: &[u8], ip: Ipv4Addr) -> Result<()> {
        self.send_to_addr(data, SocketAddrV4::new(ip, ARTNET_PORT))
            .await
    }

    /// Send one datagram to an explicit address
    pub async fn send_to_addr(&self, data: &[u8], addr: SocketAddrV4) -> Result<()> {
        self.socket
            .send_to(data, SocketAddr::V4(addr))
            .await
            .map_err(TransportError::Send)?;
        Ok(())
    }

    /// Spawn the receive task. Datagrams arrive on the returned channel;
    /// the channel closes when the socket task exits. Per-packet receive
    /// errors are logged and the loop keeps going.
    pub fn start_receiver(&self) -> mpsc::Receiver<(Bytes, SocketAddr)> {
        let (tx, rx) = mpsc::channel(RECV_QUEUE_DEPTH);
        let socket = self.socket.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, from)) => {
                        debug!("received {} bytes from {}", len, from);
                        let data = Bytes::copy_from_slice(&buf[..len]);
                        if tx.send((data, from)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("receive error: {}", e);
                    }
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral() {
        let socket =
            ArtNetSocket::bind_addr(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
        assert!(socket.local_addr().unwrap().port() > 0);
    }

    #[tokio::test]
    async fn test_send_recv_loopback() {
        let server = ArtNetSocket::bind_addr(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
        let client = ArtNetSocket::bind_addr(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();

        let server_addr = match server.local_addr().unwrap() {
            SocketAddr::V4(addr) => addr,
            other => panic!("expected v4, got {other}"),
        };
        let mut rx = server.start_receiver();

        client.send_to_addr(b"Art-Net\0", server_addr).await.unwrap();

        let (data, from) = rx.recv().await.unwrap();
        assert_eq!(&data[..], b"Art-Net\0");
        assert_eq!(from.port(), client.local_addr().unwrap().port());
    }
}
