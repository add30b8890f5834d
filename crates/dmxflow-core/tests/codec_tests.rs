//! Wire-level codec tests against known-good byte layouts

use dmxflow_core::packet::{OP_DMX, OP_POLL_REPLY};
use dmxflow_core::{
    ArtDmx, ArtPacket, ArtPoll, ArtPollReply, PortAddress, ARTNET_PORT, POLL_REPLY_LENGTH,
};
use std::net::Ipv4Addr;

#[test]
fn poll_golden_bytes() {
    let bytes = ArtPoll {
        talk_to_me: 0x02,
        priority: 0x10,
    }
    .encode();
    assert_eq!(
        &bytes[..],
        b"Art-Net\0\x00\x20\x00\x0e\x02\x10",
        "poll must be byte-identical to what consoles expect"
    );
}

#[test]
fn poll_tolerates_targeted_mode_tail() {
    // Newer controllers append target address fields to their polls.
    let mut bytes = ArtPoll::default().encode().to_vec();
    bytes.extend_from_slice(&[0x00, 0x0F, 0x00, 0x00]);
    match ArtPacket::decode(&bytes).unwrap() {
        ArtPacket::Poll(poll) => assert_eq!(poll.talk_to_me, 0x02),
        other => panic!("expected poll, got {other:?}"),
    }
}

#[test]
fn poll_tolerates_older_protocol_version() {
    let mut bytes = ArtPoll::default().encode().to_vec();
    bytes[10] = 0;
    bytes[11] = 13;
    assert!(matches!(
        ArtPacket::decode(&bytes),
        Ok(ArtPacket::Poll(_))
    ));
}

#[test]
fn poll_reply_field_placement() {
    let reply = ArtPollReply {
        ip: Ipv4Addr::new(192, 168, 1, 238),
        udp_port: ARTNET_PORT,
        net_switch: 0,
        sub_switch: 0,
        esta_man: 0x02AE,
        short_name: "gateway".into(),
        num_ports: 1,
        port_types: [0x80, 0, 0, 0],
        sw_in: [1, 0, 0, 0],
        bind_ip: Ipv4Addr::new(192, 168, 1, 238),
        bind_index: 1,
        status2: 0x08,
        ..Default::default()
    };
    let bytes = reply.encode();

    assert_eq!(bytes.len(), POLL_REPLY_LENGTH);
    assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), OP_POLL_REPLY);
    // source ip in address order
    assert_eq!(&bytes[10..14], &[192, 168, 1, 238]);
    // 0x1936 little-endian
    assert_eq!(&bytes[14..16], &[0x36, 0x19]);
    // ESTA code little-endian
    assert_eq!(&bytes[24..26], &[0xAE, 0x02]);
    // short name, NUL padded to 18
    assert_eq!(&bytes[26..33], b"gateway");
    assert_eq!(bytes[33], 0);
    // port count big-endian
    assert_eq!(&bytes[172..174], &[0, 1]);
    assert_eq!(bytes[174], 0x80);
    assert_eq!(bytes[186], 1); // SwIn[0]
    assert_eq!(bytes[211], 1); // BindIndex
    assert_eq!(bytes[212], 0x08); // Status2
}

#[test]
fn poll_reply_roundtrip_battery() {
    for (net, subnet, universe) in [(0u8, 0u8, 0u8), (0, 0, 15), (3, 1, 5), (127, 15, 15)] {
        let reply = ArtPollReply {
            ip: Ipv4Addr::new(2, 0, 0, 1),
            net_switch: net,
            sub_switch: subnet,
            num_ports: 2,
            port_types: [0x80, 0x40, 0, 0],
            sw_in: [universe, 0, 0, 0],
            sw_out: [0, universe, 0, 0],
            bind_index: 2,
            ..Default::default()
        };
        let decoded = match ArtPacket::decode(&reply.encode()).unwrap() {
            ArtPacket::PollReply(decoded) => decoded,
            other => panic!("expected poll reply, got {other:?}"),
        };
        assert_eq!(decoded, reply);

        let expected = PortAddress::from_parts(net, subnet, universe).unwrap();
        let ports = decoded.ports();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0].address, expected);
        assert_eq!(ports[1].address, expected);
    }
}

#[test]
fn dmx_golden_header() {
    let dmx = ArtDmx {
        sequence: 1,
        physical: 0,
        address: "0:0:1".parse().unwrap(),
        data: vec![0x40; 2],
    };
    let bytes = dmx.encode().unwrap();
    assert_eq!(&bytes[..8], b"Art-Net\0");
    assert_eq!(u16::from_le_bytes([bytes[8], bytes[9]]), OP_DMX);
    assert_eq!(&bytes[10..12], &[0, 14]); // protocol version big-endian
    assert_eq!(bytes[12], 1); // sequence
    assert_eq!(bytes[13], 0); // physical
    assert_eq!(bytes[14], 0x01); // SubUni
    assert_eq!(bytes[15], 0x00); // Net
    assert_eq!(&bytes[16..18], &[0, 2]); // length big-endian
}

#[test]
fn dmx_roundtrip_battery() {
    for len in [2usize, 24, 128, 510, 512] {
        for seq in [0u8, 1, 128, 255] {
            let dmx = ArtDmx {
                sequence: seq,
                physical: 1,
                address: "7:2:9".parse().unwrap(),
                data: (0..len).map(|i| i as u8).collect(),
            };
            let bytes = dmx.encode().unwrap();
            match ArtPacket::decode(&bytes).unwrap() {
                ArtPacket::Dmx(decoded) => assert_eq!(decoded, dmx),
                other => panic!("expected dmx, got {other:?}"),
            }
        }
    }
}

#[test]
fn foreign_opcodes_are_classified_not_fatal() {
    // ArtAddress, ArtIpProg, ArtTimeCode, ArtTrigger, ArtSync, firmware
    for opcode in [0x6000u16, 0xF800, 0x9700, 0x9900, 0x5200, 0xF200] {
        let mut bytes = b"Art-Net\0".to_vec();
        bytes.extend_from_slice(&opcode.to_le_bytes());
        bytes.extend_from_slice(&[0, 14, 0, 0, 0, 0]);
        match ArtPacket::decode(&bytes).unwrap() {
            ArtPacket::Unknown { opcode: seen, .. } => assert_eq!(seen, opcode),
            other => panic!("expected unknown, got {other:?}"),
        }
    }
}
