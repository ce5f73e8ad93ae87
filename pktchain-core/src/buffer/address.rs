//! Address readers, writers and formatting.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use smallvec::SmallVec;

use super::{read_array, read_bytes, write_bytes};
use crate::error::BufferError;

/// A 6-byte IEEE 802 MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }
}

/// Variable-length link-layer address (e.g. the Linux cooked capture
/// header carries up to 8 address bytes plus an explicit length).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LinkLayerAddress(SmallVec<[u8; 8]>);

impl LinkLayerAddress {
    pub fn new(bytes: &[u8]) -> Self {
        LinkLayerAddress(SmallVec::from_slice(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LinkLayerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::hex::to_hex_string(&self.0, ":"))
    }
}

pub fn read_ipv4(data: &[u8], offset: usize) -> Result<Ipv4Addr, BufferError> {
    read_array::<4>(data, offset).map(Ipv4Addr::from)
}

pub fn write_ipv4(buf: &mut [u8], offset: usize, addr: Ipv4Addr) -> Result<(), BufferError> {
    write_bytes(buf, offset, &addr.octets())
}

pub fn read_mac(data: &[u8], offset: usize) -> Result<MacAddr, BufferError> {
    read_array::<6>(data, offset).map(MacAddr)
}

pub fn write_mac(buf: &mut [u8], offset: usize, addr: MacAddr) -> Result<(), BufferError> {
    write_bytes(buf, offset, &addr.0)
}

pub fn read_ipv6(data: &[u8], offset: usize) -> Result<Ipv6Addr, BufferError> {
    read_array::<16>(data, offset).map(Ipv6Addr::from)
}

pub fn write_ipv6(buf: &mut [u8], offset: usize, addr: Ipv6Addr) -> Result<(), BufferError> {
    write_bytes(buf, offset, &addr.octets())
}

/// Read a link-layer address of `len` bytes.
pub fn read_link_addr(
    data: &[u8],
    offset: usize,
    len: usize,
) -> Result<LinkLayerAddress, BufferError> {
    read_bytes(data, offset, len).map(LinkLayerAddress::new)
}

pub fn write_link_addr(
    buf: &mut [u8],
    offset: usize,
    addr: &LinkLayerAddress,
) -> Result<(), BufferError> {
    write_bytes(buf, offset, addr.as_bytes())
}
