//! Rebuilding wire bytes from a decoded chain.
//!
//! Serialization runs bottom-up: each packet's payload is encoded first so
//! its header can recompute length and checksum fields over it. Whether
//! those fields are recomputed or emitted verbatim is controlled by
//! [`Fixups`], either per node or forced for the whole chain.

use std::net::{Ipv4Addr, Ipv6Addr};

use super::{Layer, Packet};
use crate::buffer::checksum::{ipv4_pseudo_checksum, ipv6_pseudo_checksum};

/// The two correction switches of a packet.
///
/// With a switch off, the stored field value is written as is, even when it
/// no longer matches the bytes around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fixups {
    /// Recompute length-bearing fields
    pub correct_length: bool,
    /// Recompute checksum fields
    pub correct_checksum: bool,
}

impl Fixups {
    pub const NONE: Fixups = Fixups {
        correct_length: false,
        correct_checksum: false,
    };

    pub const ALL: Fixups = Fixups {
        correct_length: true,
        correct_checksum: true,
    };

    pub const fn new(correct_length: bool, correct_checksum: bool) -> Self {
        Self {
            correct_length,
            correct_checksum,
        }
    }
}

/// Addresses of the nearest enclosing IP header, for pseudo-header checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpContext {
    V4 { src: Ipv4Addr, dst: Ipv4Addr },
    V6 { src: Ipv6Addr, dst: Ipv6Addr },
}

impl IpContext {
    /// Checksum of an upper-layer segment including the pseudo-header.
    pub fn checksum(&self, protocol: u8, segment: &[&[u8]]) -> u16 {
        match *self {
            IpContext::V4 { src, dst } => ipv4_pseudo_checksum(src, dst, protocol, segment),
            IpContext::V6 { src, dst } => ipv6_pseudo_checksum(src, dst, protocol, segment),
        }
    }
}

impl Layer {
    /// Wire bytes, honoring each packet's own [`Fixups`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        write_layer(self, None, None, &mut out);
        out
    }

    /// Wire bytes with `fixups` forced on every packet of the chain.
    pub fn to_bytes_with(&self, fixups: Fixups) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        write_layer(self, Some(fixups), None, &mut out);
        out
    }

    /// Wire bytes of a layer that sits below the IP header described by `ip`.
    pub fn to_bytes_within(&self, ip: Option<IpContext>, force: Option<Fixups>) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        write_layer(self, force, ip, &mut out);
        out
    }
}

impl Packet {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        write_packet(self, None, None, &mut out);
        out
    }

    pub fn to_bytes_with(&self, fixups: Fixups) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        write_packet(self, Some(fixups), None, &mut out);
        out
    }

    /// Serialized payload only, as the IP header above it would see it.
    pub fn payload_bytes(&self, force: Option<Fixups>) -> Vec<u8> {
        let ip = self.header.ip_context();
        self.payload()
            .map(|p| p.to_bytes_within(ip, force))
            .unwrap_or_default()
    }
}

fn write_layer(layer: &Layer, force: Option<Fixups>, ip: Option<IpContext>, out: &mut Vec<u8>) {
    match layer {
        Layer::Packet(p) => write_packet(p, force, ip, out),
        Layer::Opaque(o) => out.extend_from_slice(&o.data),
        Layer::Illegal(i) => out.extend_from_slice(&i.data),
    }
}

fn write_packet(packet: &Packet, force: Option<Fixups>, ip: Option<IpContext>, out: &mut Vec<u8>) {
    let inner_ip = packet.header.ip_context().or(ip);
    let mut payload = Vec::new();
    if let Some(inner) = packet.payload() {
        write_layer(inner, force, inner_ip, &mut payload);
    }
    let fixups = force.unwrap_or(packet.fixups);
    packet.header.write(out, &payload, fixups, ip.as_ref());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&packet.trailer);
}
