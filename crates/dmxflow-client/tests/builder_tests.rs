//! Configuration validation through the public API

use dmxflow_client::{
    ArtNetClient, ClientError, InterfaceCandidate, InterfaceRanking, StaticResolver,
};
use std::net::Ipv4Addr;

fn lab_interfaces() -> StaticResolver {
    StaticResolver::new(vec![
        InterfaceCandidate {
            name: "docker0".into(),
            ip: Ipv4Addr::new(172, 17, 0, 1),
            netmask: Ipv4Addr::new(255, 255, 0, 0),
            broadcast: Ipv4Addr::new(172, 17, 255, 255),
            mac: [0xAA; 6],
        },
        InterfaceCandidate {
            name: "enp3s0".into(),
            ip: Ipv4Addr::new(2, 0, 0, 7),
            netmask: Ipv4Addr::new(255, 0, 0, 0),
            broadcast: Ipv4Addr::new(2, 255, 255, 255),
            mac: [0xBB; 6],
        },
    ])
}

#[test]
fn explicit_ips_skip_discovery() {
    let client = ArtNetClient::builder()
        .ips(Ipv4Addr::new(10, 1, 1, 2), Ipv4Addr::new(10, 1, 1, 255))
        .build()
        .unwrap();
    assert_eq!(client.local_ip(), Ipv4Addr::new(10, 1, 1, 2));
    assert_eq!(client.broadcast_ip(), Ipv4Addr::new(10, 1, 1, 255));
}

#[test]
fn resolver_ranking_picks_lighting_network() {
    let client = ArtNetClient::builder()
        .resolver(lab_interfaces())
        .build()
        .unwrap();
    assert_eq!(client.local_ip(), Ipv4Addr::new(2, 0, 0, 7));
    assert_eq!(client.broadcast_ip(), Ipv4Addr::new(2, 255, 255, 255));
}

#[test]
fn forced_interface_overrides_ranking() {
    let client = ArtNetClient::builder()
        .resolver(lab_interfaces())
        .interface("docker0")
        .build()
        .unwrap();
    assert_eq!(client.local_ip(), Ipv4Addr::new(172, 17, 0, 1));
}

#[test]
fn unknown_forced_interface_is_an_error() {
    let err = ArtNetClient::builder()
        .resolver(lab_interfaces())
        .interface("tap9")
        .build()
        .unwrap_err();
    assert!(matches!(err, ClientError::UnknownInterface(name) if name == "tap9"));
}

#[test]
fn mixing_interface_and_ips_is_rejected() {
    let err = ArtNetClient::builder()
        .interface("enp3s0")
        .ips(Ipv4Addr::new(10, 1, 1, 2), Ipv4Addr::new(10, 1, 1, 255))
        .build()
        .unwrap_err();
    assert!(matches!(err, ClientError::ConflictingIpConfig(_)));
}

#[test]
fn missing_resolver_is_an_error() {
    assert!(matches!(
        ArtNetClient::builder().build(),
        Err(ClientError::UnknownInterface(_))
    ));
}

#[test]
fn custom_ranking_is_honored() {
    let client = ArtNetClient::builder()
        .resolver(lab_interfaces())
        .ranking(InterfaceRanking {
            name_prefixes: vec!["docker".into()],
        })
        .build()
        .unwrap();
    // the 2.0.0.0/8 rule still beats any prefix
    assert_eq!(client.local_ip(), Ipv4Addr::new(2, 0, 0, 7));
}

#[tokio::test]
async fn dmx_access_requires_local_port() {
    let client = ArtNetClient::builder()
        .ips(Ipv4Addr::new(10, 1, 1, 2), Ipv4Addr::new(10, 1, 1, 255))
        .build()
        .unwrap();

    let address = "0:0:1".parse().unwrap();
    assert!(matches!(
        client.set_dmx(address, &[0; 4]).await,
        Err(ClientError::Protocol(_))
    ));
    assert!(client.get_dmx(address).is_err());

    let universe = client.set_port_config("0:0:1", true, false).await.unwrap();
    universe.set_dmx(&[1, 2, 3, 4]).await.unwrap();
    assert_eq!(&universe.get_dmx().unwrap()[..4], &[1, 2, 3, 4]);
}

#[tokio::test]
async fn dmx_payload_length_is_validated() {
    let client = ArtNetClient::builder()
        .ips(Ipv4Addr::new(10, 1, 1, 2), Ipv4Addr::new(10, 1, 1, 255))
        .build()
        .unwrap();
    let universe = client.set_port_config("0:0:1", true, false).await.unwrap();

    assert!(matches!(
        universe.set_dmx(&[]).await,
        Err(ClientError::InvalidDmxLength(0))
    ));
    assert!(matches!(
        universe.set_dmx(&[0; 513]).await,
        Err(ClientError::InvalidDmxLength(513))
    ));
}
