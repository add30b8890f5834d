//! Port addresses
//!
//! Art-Net identifies a DMX universe by a 15-bit port address:
//!
//! ```text
//! bits  14..8     7..4      3..0
//!       net(7)  sub-net(4)  universe(4)
//! ```
//!
//! The canonical text form is decimal `"N:S:U"`, e.g. `"0:0:1"`. The packed
//! value is the key of the universe registry and the value carried (split
//! across `Net` and `SubUni`) in every ArtDMX header.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A 15-bit `net:subnet:universe` address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortAddress(u16);

impl PortAddress {
    /// Wrap a packed 15-bit value
    pub fn new(value: u16) -> Result<Self> {
        if value > 0x7FFF {
            return Err(Error::InvalidPortAddress(format!(
                "0x{value:04x} exceeds 15 bits"
            )));
        }
        Ok(Self(value))
    }

    /// Build from individual fields, range-checking each
    pub fn from_parts(net: u8, subnet: u8, universe: u8) -> Result<Self> {
        if net > 0x7F {
            return Err(Error::InvalidPortAddress(format!("net {net} > 127")));
        }
        if subnet > 0x0F {
            return Err(Error::InvalidPortAddress(format!("subnet {subnet} > 15")));
        }
        if universe > 0x0F {
            return Err(Error::InvalidPortAddress(format!(
                "universe {universe} > 15"
            )));
        }
        Ok(Self(
            ((net as u16) << 8) | ((subnet as u16) << 4) | universe as u16,
        ))
    }

    /// Build from the ArtDMX header split: `Net` (high 7 bits) + `SubUni`
    /// (sub-net and universe nibbles)
    pub fn from_net_subuni(net: u8, subuni: u8) -> Self {
        Self((((net & 0x7F) as u16) << 8) | subuni as u16)
    }

    /// The packed 15-bit value
    pub fn value(self) -> u16 {
        self.0
    }

    /// High 7 bits
    pub fn net(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Sub-net nibble
    pub fn subnet(self) -> u8 {
        ((self.0 >> 4) & 0x0F) as u8
    }

    /// Universe nibble
    pub fn universe(self) -> u8 {
        (self.0 & 0x0F) as u8
    }

    /// Low byte as carried in the ArtDMX `SubUni` field
    pub fn subuni(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for PortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.net(), self.subnet(), self.universe())
    }
}

impl FromStr for PortAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let (net, subnet, universe) = match (parts.next(), parts.next(), parts.next(), parts.next())
        {
            (Some(n), Some(s), Some(u), None) => (n, s, u),
            _ => {
                return Err(Error::InvalidPortAddress(format!(
                    "expected N:S:U, got {s:?}"
                )))
            }
        };
        let parse = |field: &str| -> Result<u8> {
            field
                .parse::<u8>()
                .map_err(|_| Error::InvalidPortAddress(format!("bad field {field:?} in {s:?}")))
        };
        Self::from_parts(parse(net)?, parse(subnet)?, parse(universe)?)
    }
}

impl TryFrom<u16> for PortAddress {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(PortAddress::new(4).unwrap().to_string(), "0:0:4");
        assert_eq!(PortAddress::new(0x15).unwrap().to_string(), "0:1:5");
        assert_eq!(PortAddress::new(0x315).unwrap().to_string(), "3:1:5");
        assert_eq!(PortAddress::new(0x7FF).unwrap().to_string(), "7:15:15");
        assert_eq!(PortAddress::new(0xFFF).unwrap().to_string(), "15:15:15");
        assert_eq!(PortAddress::new(0x7FFF).unwrap().to_string(), "127:15:15");
    }

    #[test]
    fn test_parse_roundtrip() {
        for s in ["0:0:0", "0:0:1", "3:1:5", "127:15:15"] {
            let addr: PortAddress = s.parse().unwrap();
            assert_eq!(addr.to_string(), s);
        }
    }

    #[test]
    fn test_pack_unpack_identity() {
        for value in 0..=0x7FFFu16 {
            let addr = PortAddress::new(value).unwrap();
            let again = PortAddress::from_parts(addr.net(), addr.subnet(), addr.universe()).unwrap();
            assert_eq!(again.value(), value);
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(PortAddress::new(0x8000).is_err());
        assert!(PortAddress::from_parts(128, 0, 0).is_err());
        assert!(PortAddress::from_parts(0, 16, 0).is_err());
        assert!(PortAddress::from_parts(0, 0, 16).is_err());
        assert!("1:2".parse::<PortAddress>().is_err());
        assert!("1:2:3:4".parse::<PortAddress>().is_err());
        assert!("a:b:c".parse::<PortAddress>().is_err());
        assert!("128:0:0".parse::<PortAddress>().is_err());
    }

    #[test]
    fn test_net_subuni_split() {
        let addr: PortAddress = "3:1:5".parse().unwrap();
        assert_eq!(addr.net(), 3);
        assert_eq!(addr.subuni(), 0x15);
        assert_eq!(PortAddress::from_net_subuni(3, 0x15), addr);
    }
}
