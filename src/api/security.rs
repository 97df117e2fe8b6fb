//! Addressing and security blocks shared by many primitives.

use std::fmt;

use nom::bytes::complete::take;
use nom::number::complete::{be_u8, le_u16};
use nom::IResult;

use crate::constants::*;

/// A peer address, short or extended, in host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacAddr {
    Short(u16),
    /// Extended address in wire (little-endian) byte order
    Extended([u8; 8]),
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacAddr::Short(addr) => write!(f, "0x{addr:04X}"),
            MacAddr::Extended(addr) => {
                let mut be = *addr;
                be.reverse();
                write!(f, "{}", hex::encode(be))
            }
        }
    }
}

/// Addressing mode, PAN id and address of one end of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FullAddr {
    pub mode: u8,
    pub pan_id: u16,
    /// Short addresses occupy the first two bytes, little-endian
    pub address: [u8; 8],
}

impl FullAddr {
    pub const LEN: usize = 11;

    pub fn short(pan_id: u16, addr: u16) -> Self {
        let mut address = [0; 8];
        address[..2].copy_from_slice(&addr.to_le_bytes());
        FullAddr {
            mode: MAC_MODE_SHORT_ADDR,
            pan_id,
            address,
        }
    }

    pub fn extended(pan_id: u16, address: [u8; 8]) -> Self {
        FullAddr {
            mode: MAC_MODE_LONG_ADDR,
            pan_id,
            address,
        }
    }

    /// The address this block carries, if its mode names one.
    pub fn mac_addr(&self) -> Option<MacAddr> {
        match self.mode {
            MAC_MODE_SHORT_ADDR => Some(MacAddr::Short(u16::from_le_bytes([
                self.address[0],
                self.address[1],
            ]))),
            MAC_MODE_LONG_ADDR => Some(MacAddr::Extended(self.address)),
            _ => None,
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.mode);
        out.extend_from_slice(&self.pan_id.to_le_bytes());
        out.extend_from_slice(&self.address);
    }
}

pub fn parse_full_addr(input: &[u8]) -> IResult<&[u8], FullAddr> {
    let (input, mode) = be_u8(input)?;
    let (input, pan_id) = le_u16(input)?;
    let (input, addr) = take(8usize)(input)?;
    let mut address = [0; 8];
    address.copy_from_slice(addr);
    Ok((input, FullAddr { mode, pan_id, address }))
}

/// Auxiliary security header parameters.
///
/// With `security_level == 0` only the level byte is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecSpec {
    pub security_level: u8,
    pub key_id_mode: u8,
    pub key_source: [u8; 8],
    pub key_index: u8,
}

impl SecSpec {
    pub const LEN: usize = 11;

    /// Unsecured.
    pub fn none() -> Self {
        SecSpec::default()
    }

    pub fn encoded_len(&self) -> usize {
        if self.security_level == 0 {
            1
        } else {
            Self::LEN
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.security_level);
        if self.security_level != 0 {
            out.push(self.key_id_mode);
            out.extend_from_slice(&self.key_source);
            out.push(self.key_index);
        }
    }
}

/// Parses a trailing security block; an exhausted input reads as unsecured.
pub fn parse_sec_spec(input: &[u8]) -> IResult<&[u8], SecSpec> {
    if input.is_empty() {
        return Ok((input, SecSpec::none()));
    }
    let (input, security_level) = be_u8(input)?;
    if security_level == 0 {
        return Ok((input, SecSpec::none()));
    }
    let (input, key_id_mode) = be_u8(input)?;
    let (input, source) = take(8usize)(input)?;
    let (input, key_index) = be_u8(input)?;
    let mut key_source = [0; 8];
    key_source.copy_from_slice(source);
    Ok((
        input,
        SecSpec {
            security_level,
            key_id_mode,
            key_source,
            key_index,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsecured_is_one_byte() {
        let mut out = Vec::new();
        SecSpec::none().write_to(&mut out);
        assert_eq!(out, vec![0]);
        let (rest, sec) = parse_sec_spec(&[0, 0xAA]).unwrap();
        assert_eq!(sec, SecSpec::none());
        assert_eq!(rest, &[0xAA]);
    }

    #[test]
    fn test_secured_block() {
        let sec = SecSpec {
            security_level: 5,
            key_id_mode: 1,
            key_source: [1, 2, 3, 4, 5, 6, 7, 8],
            key_index: 9,
        };
        let mut out = Vec::new();
        sec.write_to(&mut out);
        assert_eq!(out.len(), SecSpec::LEN);
        assert_eq!(parse_sec_spec(&out).unwrap().1, sec);
    }

    #[test]
    fn test_full_addr_short() {
        let addr = FullAddr::short(0x1AAA, 0xBEEF);
        let mut out = Vec::new();
        addr.write_to(&mut out);
        assert_eq!(&out[..5], &[MAC_MODE_SHORT_ADDR, 0xAA, 0x1A, 0xEF, 0xBE]);
        let (_, parsed) = parse_full_addr(&out).unwrap();
        assert_eq!(parsed.mac_addr(), Some(MacAddr::Short(0xBEEF)));
    }

    #[test]
    fn test_display() {
        assert_eq!(MacAddr::Short(0x0001).to_string(), "0x0001");
        assert_eq!(
            MacAddr::Extended([8, 7, 6, 5, 4, 3, 2, 1]).to_string(),
            "0102030405060708"
        );
    }
}
