//! Art-Net datagram encoding/decoding
//!
//! Every datagram starts with the 8-byte `Art-Net\0` preamble followed by a
//! little-endian OpCode. The rest of the layout is per-OpCode, mixing
//! little-endian fields with a few big-endian ones (protocol version, the
//! ArtDMX data length, the ArtPollReply port count):
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ Bytes 0-7:  "Art-Net\0"                                │
//! │ Bytes 8-9:  OpCode (uint16 little-endian)              │
//! │ Bytes 10-:  OpCode-specific record                     │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Three OpCodes are modeled; everything else decodes to
//! [`ArtPacket::Unknown`] so upper layers can count and ignore it.

use bytes::{BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;

use crate::address::PortAddress;
use crate::{Error, Result, ARTNET_ID, ARTNET_PORT, DMX_UNIVERSE_SIZE, POLL_REPLY_LENGTH,
    PROTOCOL_VERSION};

/// OpCode: discovery poll
pub const OP_POLL: u16 = 0x2000;
/// OpCode: discovery reply
pub const OP_POLL_REPLY: u16 = 0x2100;
/// OpCode: one universe of DMX channel data
pub const OP_DMX: u16 = 0x5000;

/// Offset of the OpCode-specific record within a datagram
const BODY_OFFSET: usize = 10;

// ArtPollReply record offsets, relative to the record (after the OpCode).
const RP_IP: usize = 0;
const RP_PORT: usize = 4;
const RP_FIRMWARE: usize = 6;
const RP_NET_SWITCH: usize = 8;
const RP_SUB_SWITCH: usize = 9;
const RP_OEM: usize = 10;
const RP_UBEA: usize = 12;
const RP_STATUS1: usize = 13;
const RP_ESTA: usize = 14;
const RP_SHORT_NAME: usize = 16;
const RP_LONG_NAME: usize = 34;
const RP_NODE_REPORT: usize = 98;
const RP_NUM_PORTS: usize = 162;
const RP_PORT_TYPES: usize = 164;
const RP_GOOD_INPUT: usize = 168;
const RP_GOOD_OUTPUT: usize = 172;
const RP_SW_IN: usize = 176;
const RP_SW_OUT: usize = 180;
const RP_STYLE: usize = 190;
const RP_MAC: usize = 191;
const RP_BIND_IP: usize = 197;
const RP_BIND_INDEX: usize = 201;
const RP_STATUS2: usize = 202;
// Mandatory part of the record ends after the MAC; the bind/status tail is
// parsed only when the sender included it.
const RP_MANDATORY: usize = RP_BIND_IP;

/// Short name field width
pub const SHORT_NAME_LENGTH: usize = 18;
/// Long name / node report field width
pub const LONG_NAME_LENGTH: usize = 64;

/// A decoded Art-Net datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtPacket {
    Poll(ArtPoll),
    PollReply(ArtPollReply),
    Dmx(ArtDmx),
    /// Any other OpCode, carried verbatim for counting/diagnostics
    Unknown { opcode: u16, payload: Bytes },
}

impl ArtPacket {
    /// Decode a datagram. Unknown OpCodes succeed as [`ArtPacket::Unknown`].
    pub fn decode(buf: &[u8]) -> Result<ArtPacket> {
        if buf.len() < ARTNET_ID.len() {
            return Err(Error::Truncated {
                needed: BODY_OFFSET,
                have: buf.len(),
            });
        }
        if &buf[..ARTNET_ID.len()] != ARTNET_ID {
            return Err(Error::BadMagic);
        }
        if buf.len() < BODY_OFFSET {
            return Err(Error::Truncated {
                needed: BODY_OFFSET,
                have: buf.len(),
            });
        }

        let opcode = u16::from_le_bytes([buf[8], buf[9]]);
        let body = &buf[BODY_OFFSET..];
        match opcode {
            OP_POLL => Ok(ArtPacket::Poll(ArtPoll::decode(body)?)),
            OP_POLL_REPLY => Ok(ArtPacket::PollReply(ArtPollReply::decode(body)?)),
            OP_DMX => Ok(ArtPacket::Dmx(ArtDmx::decode(body)?)),
            opcode => Ok(ArtPacket::Unknown {
                opcode,
                payload: Bytes::copy_from_slice(body),
            }),
        }
    }

    /// Decode, failing OpCodes outside the handled set
    pub fn decode_strict(buf: &[u8]) -> Result<ArtPacket> {
        match Self::decode(buf)? {
            ArtPacket::Unknown { opcode, .. } => Err(Error::UnsupportedOpcode(opcode)),
            packet => Ok(packet),
        }
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<Bytes> {
        match self {
            ArtPacket::Poll(poll) => Ok(poll.encode()),
            ArtPacket::PollReply(reply) => Ok(reply.encode()),
            ArtPacket::Dmx(dmx) => dmx.encode(),
            ArtPacket::Unknown { opcode, payload } => {
                let mut buf = BytesMut::with_capacity(BODY_OFFSET + payload.len());
                put_header(&mut buf, *opcode);
                buf.extend_from_slice(payload);
                Ok(buf.freeze())
            }
        }
    }

    /// OpCode of this packet
    pub fn opcode(&self) -> u16 {
        match self {
            ArtPacket::Poll(_) => OP_POLL,
            ArtPacket::PollReply(_) => OP_POLL_REPLY,
            ArtPacket::Dmx(_) => OP_DMX,
            ArtPacket::Unknown { opcode, .. } => *opcode,
        }
    }
}

fn put_header(buf: &mut BytesMut, opcode: u16) {
    buf.extend_from_slice(ARTNET_ID);
    buf.put_u16_le(opcode);
}

fn require(body: &[u8], needed: usize) -> Result<()> {
    if body.len() < needed {
        return Err(Error::Truncated {
            needed: needed + BODY_OFFSET,
            have: body.len() + BODY_OFFSET,
        });
    }
    Ok(())
}

fn read_u16_le(body: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([body[offset], body[offset + 1]])
}

fn read_u16_be(body: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([body[offset], body[offset + 1]])
}

fn read_ipv4(body: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(
        body[offset],
        body[offset + 1],
        body[offset + 2],
        body[offset + 3],
    )
}

/// NUL-padded fixed-width text field
fn read_text(body: &[u8], offset: usize, width: usize) -> String {
    let raw = &body[offset..offset + width];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn put_text(buf: &mut BytesMut, text: &str, width: usize) {
    let bytes = text.as_bytes();
    let take = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..take]);
    buf.put_bytes(0, width - take);
}

// ============================================================================
// ArtPoll
// ============================================================================

/// Discovery poll, broadcast periodically by controllers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtPoll {
    /// Flags byte; bit 1 requests replies on node condition change
    pub talk_to_me: u8,
    /// Diagnostic priority requested of peers
    pub priority: u8,
}

impl Default for ArtPoll {
    fn default() -> Self {
        Self {
            talk_to_me: 0x02,
            priority: 0x10,
        }
    }
}

impl ArtPoll {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(BODY_OFFSET + 4);
        put_header(&mut buf, OP_POLL);
        buf.put_u16(PROTOCOL_VERSION);
        buf.put_u8(self.talk_to_me);
        buf.put_u8(self.priority);
        buf.freeze()
    }

    /// Trailing targeted-mode fields are tolerated and ignored.
    pub fn decode(body: &[u8]) -> Result<Self> {
        require(body, 4)?;
        Ok(Self {
            talk_to_me: body[2],
            priority: body[3],
        })
    }
}

// ============================================================================
// ArtPollReply
// ============================================================================

/// Node self-description, broadcast in answer to ArtPoll and on config change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtPollReply {
    pub ip: Ipv4Addr,
    pub udp_port: u16,
    pub firmware: u16,
    /// High 7 bits of the port addresses on this bind
    pub net_switch: u8,
    /// Sub-net nibble of the port addresses on this bind
    pub sub_switch: u8,
    pub oem: u16,
    pub ubea: u8,
    pub status1: u8,
    pub esta_man: u16,
    pub short_name: String,
    pub long_name: String,
    pub node_report: String,
    /// Ports described on this bind, 0..=4
    pub num_ports: u8,
    pub port_types: [u8; 4],
    pub good_input: [u8; 4],
    pub good_output: [u8; 4],
    /// Universe nibble per input port
    pub sw_in: [u8; 4],
    /// Universe nibble per output port
    pub sw_out: [u8; 4],
    pub style: u8,
    pub mac: [u8; 6],
    pub bind_ip: Ipv4Addr,
    pub bind_index: u8,
    pub status2: u8,
}

impl Default for ArtPollReply {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            udp_port: ARTNET_PORT,
            firmware: 0,
            net_switch: 0,
            sub_switch: 0,
            oem: 0,
            ubea: 0,
            status1: 0,
            esta_man: 0,
            short_name: String::new(),
            long_name: String::new(),
            node_report: String::new(),
            num_ports: 0,
            port_types: [0; 4],
            good_input: [0; 4],
            good_output: [0; 4],
            sw_in: [0; 4],
            sw_out: [0; 4],
            style: 0,
            mac: [0; 6],
            bind_ip: Ipv4Addr::UNSPECIFIED,
            bind_index: 0,
            status2: 0,
        }
    }
}

impl ArtPollReply {
    /// Encode the full fixed-length record; unmodeled tail fields are zero.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(POLL_REPLY_LENGTH);
        put_header(&mut buf, OP_POLL_REPLY);
        buf.extend_from_slice(&self.ip.octets());
        buf.put_u16_le(self.udp_port);
        buf.put_u16(self.firmware);
        buf.put_u8(self.net_switch);
        buf.put_u8(self.sub_switch);
        buf.put_u16(self.oem);
        buf.put_u8(self.ubea);
        buf.put_u8(self.status1);
        buf.put_u16_le(self.esta_man);
        put_text(&mut buf, &self.short_name, SHORT_NAME_LENGTH);
        put_text(&mut buf, &self.long_name, LONG_NAME_LENGTH);
        put_text(&mut buf, &self.node_report, LONG_NAME_LENGTH);
        buf.put_u16(self.num_ports as u16);
        buf.extend_from_slice(&self.port_types);
        buf.extend_from_slice(&self.good_input);
        buf.extend_from_slice(&self.good_output);
        buf.extend_from_slice(&self.sw_in);
        buf.extend_from_slice(&self.sw_out);
        // AcnPriority, SwMacro, SwRemote, 3 spare
        buf.put_bytes(0, 6);
        buf.put_u8(self.style);
        buf.extend_from_slice(&self.mac);
        buf.extend_from_slice(&self.bind_ip.octets());
        buf.put_u8(self.bind_index);
        buf.put_u8(self.status2);
        // GoodOutputB, Status3, RDM UID, user, refresh rate, spare
        buf.put_bytes(0, POLL_REPLY_LENGTH - BODY_OFFSET - RP_STATUS2 - 1);
        debug_assert_eq!(buf.len(), POLL_REPLY_LENGTH);
        buf.freeze()
    }

    /// Decode a record. Everything through the MAC is mandatory; the
    /// bind/status tail defaults to zero when the sender omitted it.
    pub fn decode(body: &[u8]) -> Result<Self> {
        require(body, RP_MANDATORY)?;

        let num_ports_raw = read_u16_be(body, RP_NUM_PORTS);
        if num_ports_raw > 4 {
            return Err(Error::FieldOutOfRange("poll reply port count"));
        }

        let mut reply = Self {
            ip: read_ipv4(body, RP_IP),
            udp_port: read_u16_le(body, RP_PORT),
            firmware: read_u16_be(body, RP_FIRMWARE),
            net_switch: body[RP_NET_SWITCH],
            sub_switch: body[RP_SUB_SWITCH],
            oem: read_u16_be(body, RP_OEM),
            ubea: body[RP_UBEA],
            status1: body[RP_STATUS1],
            esta_man: read_u16_le(body, RP_ESTA),
            short_name: read_text(body, RP_SHORT_NAME, SHORT_NAME_LENGTH),
            long_name: read_text(body, RP_LONG_NAME, LONG_NAME_LENGTH),
            node_report: read_text(body, RP_NODE_REPORT, LONG_NAME_LENGTH),
            num_ports: num_ports_raw as u8,
            style: body[RP_STYLE],
            ..Self::default()
        };
        reply.port_types.copy_from_slice(&body[RP_PORT_TYPES..RP_PORT_TYPES + 4]);
        reply.good_input.copy_from_slice(&body[RP_GOOD_INPUT..RP_GOOD_INPUT + 4]);
        reply.good_output.copy_from_slice(&body[RP_GOOD_OUTPUT..RP_GOOD_OUTPUT + 4]);
        reply.sw_in.copy_from_slice(&body[RP_SW_IN..RP_SW_IN + 4]);
        reply.sw_out.copy_from_slice(&body[RP_SW_OUT..RP_SW_OUT + 4]);
        reply.mac.copy_from_slice(&body[RP_MAC..RP_MAC + 6]);

        if body.len() >= RP_BIND_INDEX + 1 {
            reply.bind_ip = read_ipv4(body, RP_BIND_IP);
            reply.bind_index = body[RP_BIND_INDEX];
        }
        if body.len() >= RP_STATUS2 + 1 {
            reply.status2 = body[RP_STATUS2];
        }
        Ok(reply)
    }
}

// ============================================================================
// ArtDmx
// ============================================================================

/// One universe of channel data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtDmx {
    /// Wrapping 1..=255 counter; 0 means the sender does not sequence
    pub sequence: u8,
    /// Physical input port the data originated from
    pub physical: u8,
    pub address: PortAddress,
    /// 1..=512 channel values
    pub data: Vec<u8>,
}

impl ArtDmx {
    /// Encode; odd payloads are padded to an even length on the wire.
    pub fn encode(&self) -> Result<Bytes> {
        if self.data.is_empty() || self.data.len() > DMX_UNIVERSE_SIZE {
            return Err(Error::FieldOutOfRange("dmx data length"));
        }
        let wire_len = self.data.len() + (self.data.len() & 1);
        let mut buf = BytesMut::with_capacity(BODY_OFFSET + 8 + wire_len);
        put_header(&mut buf, OP_DMX);
        buf.put_u16(PROTOCOL_VERSION);
        buf.put_u8(self.sequence);
        buf.put_u8(self.physical);
        buf.put_u8(self.address.subuni());
        buf.put_u8(self.address.net());
        buf.put_u16(wire_len as u16);
        buf.extend_from_slice(&self.data);
        buf.put_bytes(0, wire_len - self.data.len());
        Ok(buf.freeze())
    }

    pub fn decode(body: &[u8]) -> Result<Self> {
        require(body, 8)?;
        let length = read_u16_be(body, 6) as usize;
        if length == 0 || length > DMX_UNIVERSE_SIZE {
            return Err(Error::FieldOutOfRange("dmx data length"));
        }
        require(body, 8 + length)?;
        Ok(Self {
            sequence: body[2],
            physical: body[3],
            address: PortAddress::from_net_subuni(body[5], body[4]),
            data: body[8..8 + length].to_vec(),
        })
    }
}
