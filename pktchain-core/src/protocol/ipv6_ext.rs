//! IPv6 extension header decoders.
//!
//! Hop-by-Hop, Routing and Destination Options share one layout (next
//! header, length in 8-octet units beyond the first, then type-specific
//! data) and one decoder parameterized by [`Ipv6ExtensionKind`]. The
//! Fragment header has a fixed layout of its own.

use bytes::Bytes;

use super::{ensure_len, HeaderFormat};
use crate::buffer::{read_be16, read_be32, read_u8};
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ip_number, ProtocolTag, TagKind};

/// Fragment header length.
pub const IPV6_FRAGMENT_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ipv6ExtensionKind {
    HopByHop,
    Routing,
    DestinationOptions,
}

impl Ipv6ExtensionKind {
    /// IP protocol number announcing this header.
    pub fn ip_number(self) -> u8 {
        match self {
            Ipv6ExtensionKind::HopByHop => ip_number::HOPOPT,
            Ipv6ExtensionKind::Routing => ip_number::IPV6_ROUTE,
            Ipv6ExtensionKind::DestinationOptions => ip_number::IPV6_OPTS,
        }
    }

    fn decoder_name(self) -> &'static str {
        match self {
            Ipv6ExtensionKind::HopByHop => "ipv6_hop_by_hop",
            Ipv6ExtensionKind::Routing => "ipv6_routing",
            Ipv6ExtensionKind::DestinationOptions => "ipv6_destination_options",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            Ipv6ExtensionKind::HopByHop => "IPv6 Hop-by-Hop Options",
            Ipv6ExtensionKind::Routing => "IPv6 Routing",
            Ipv6ExtensionKind::DestinationOptions => "IPv6 Destination Options",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6ExtensionHeader {
    pub kind: Ipv6ExtensionKind,
    pub next_header: ProtocolTag,
    /// Length in 8-octet units, not counting the first 8 octets
    pub hdr_ext_len: u8,
    /// Everything after the next-header and length bytes
    pub data: Bytes,
}

impl Ipv6ExtensionHeader {
    /// Routing type, for Routing headers.
    pub fn routing_type(&self) -> Option<u8> {
        match self.kind {
            Ipv6ExtensionKind::Routing => self.data.first().copied(),
            _ => None,
        }
    }

    /// Segments left, for Routing headers.
    pub fn segments_left(&self) -> Option<u8> {
        match self.kind {
            Ipv6ExtensionKind::Routing => self.data.get(1).copied(),
            _ => None,
        }
    }
}

impl HeaderFormat for Ipv6ExtensionHeader {
    fn name(&self) -> &'static str {
        self.kind.decoder_name()
    }

    fn len(&self) -> usize {
        2 + self.data.len()
    }

    fn write(&self, out: &mut Vec<u8>, _payload: &[u8], fixups: Fixups, _ip: Option<&IpContext>) {
        let hdr_ext_len = if fixups.correct_length {
            ((self.len() / 8).saturating_sub(1)) as u8
        } else {
            self.hdr_ext_len
        };
        out.push(self.next_header.value() as u8);
        out.push(hdr_ext_len);
        out.extend_from_slice(&self.data);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6ExtensionDecoder {
    kind: Ipv6ExtensionKind,
}

impl Ipv6ExtensionDecoder {
    pub const fn new(kind: Ipv6ExtensionKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> Ipv6ExtensionKind {
        self.kind
    }
}

impl Decoder for Ipv6ExtensionDecoder {
    fn name(&self) -> &'static str {
        self.kind.decoder_name()
    }

    fn display_name(&self) -> &'static str {
        self.kind.display_name()
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        let protocol = self.kind.decoder_name();
        ensure_len(protocol, data, 2)?;
        let hdr_ext_len = read_u8(data, 1)?;
        let len = (hdr_ext_len as usize + 1) * 8;
        ensure_len(protocol, data, len)?;

        let next_header = ctx.tag(protocol, TagKind::IpNumber, data[0] as u32)?;
        let header = Ipv6ExtensionHeader {
            kind: self.kind,
            next_header,
            hdr_ext_len,
            data: data.slice(2..len),
        };
        Ok(DecodedHeader::new(header).next(next_header).into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6FragmentHeader {
    pub next_header: ProtocolTag,
    pub reserved: u8,
    /// Offset in 8-octet units
    pub fragment_offset: u16,
    /// The two reserved bits between offset and M flag
    pub res: u8,
    pub more_fragments: bool,
    pub identification: u32,
}

impl Ipv6FragmentHeader {
    /// A fragment header that does not actually split anything.
    pub fn is_atomic(&self) -> bool {
        self.fragment_offset == 0 && !self.more_fragments
    }
}

impl HeaderFormat for Ipv6FragmentHeader {
    fn name(&self) -> &'static str {
        "ipv6_fragment"
    }

    fn len(&self) -> usize {
        IPV6_FRAGMENT_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, _payload: &[u8], _fixups: Fixups, _ip: Option<&IpContext>) {
        let offset_flags = (self.fragment_offset << 3)
            | ((self.res as u16 & 0b11) << 1)
            | self.more_fragments as u16;
        out.push(self.next_header.value() as u8);
        out.push(self.reserved);
        out.extend_from_slice(&offset_flags.to_be_bytes());
        out.extend_from_slice(&self.identification.to_be_bytes());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Ipv6FragmentDecoder;

impl Decoder for Ipv6FragmentDecoder {
    fn name(&self) -> &'static str {
        "ipv6_fragment"
    }

    fn display_name(&self) -> &'static str {
        "IPv6 Fragment"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("ipv6_fragment", data, IPV6_FRAGMENT_HEADER_LEN)?;
        let next_header = ctx.tag("ipv6_fragment", TagKind::IpNumber, data[0] as u32)?;
        let offset_flags = read_be16(data, 2)?;
        let header = Ipv6FragmentHeader {
            next_header,
            reserved: data[1],
            fragment_offset: offset_flags >> 3,
            res: ((offset_flags >> 1) & 0b11) as u8,
            more_fragments: offset_flags & 1 != 0,
            identification: read_be32(data, 4)?,
        };

        let atomic = header.is_atomic();
        let decoded = DecodedHeader::new(header);
        if atomic {
            return Ok(decoded.next(next_header).into());
        }
        Ok(decoded.into())
    }
}
