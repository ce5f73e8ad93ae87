//! IPv4 decoder.

use std::net::Ipv4Addr;

use bytes::Bytes;
use etherparse::Ipv4HeaderSlice;
use smallvec::SmallVec;

use super::options::{parse_options, OptionEntry};
use super::{malformed, patch_u16, HeaderFormat};
use crate::buffer::checksum::internet_checksum;
use crate::buffer::read_be16;
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ProtocolTag, TagKind};

/// IPv4 header length without options.
pub const IPV4_MIN_HEADER_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Header length in 32-bit words, as stored
    pub ihl: u8,
    /// DSCP and ECN
    pub tos: u8,
    pub total_length: u16,
    pub identification: u16,
    /// Reserved, DF and MF bits
    pub flags: u8,
    /// Fragment offset in 8-byte units
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: ProtocolTag,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    /// Raw option bytes including padding
    pub options: Bytes,
    pub option_list: SmallVec<[OptionEntry; 4]>,
}

impl Ipv4Header {
    pub const FLAG_RESERVED: u8 = 0b100;
    pub const FLAG_DONT_FRAGMENT: u8 = 0b010;
    pub const FLAG_MORE_FRAGMENTS: u8 = 0b001;

    pub fn header_len(&self) -> usize {
        IPV4_MIN_HEADER_LEN + self.options.len()
    }

    pub fn dont_fragment(&self) -> bool {
        self.flags & Self::FLAG_DONT_FRAGMENT != 0
    }

    pub fn more_fragments(&self) -> bool {
        self.flags & Self::FLAG_MORE_FRAGMENTS != 0
    }

    /// True for any fragment of a larger datagram.
    pub fn is_fragment(&self) -> bool {
        self.more_fragments() || self.fragment_offset != 0
    }

    /// Payload length declared by `total_length`, if it is usable.
    pub fn declared_payload_len(&self) -> Option<usize> {
        (self.total_length as usize).checked_sub(self.header_len())
    }
}

impl HeaderFormat for Ipv4Header {
    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn len(&self) -> usize {
        self.header_len()
    }

    fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, _ip: Option<&IpContext>) {
        let start = out.len();
        let (ihl, total_length) = if fixups.correct_length {
            let hlen = self.header_len();
            ((hlen / 4) as u8, (hlen + payload.len()) as u16)
        } else {
            (self.ihl, self.total_length)
        };
        let flags_offset = ((self.flags as u16 & 0b111) << 13) | (self.fragment_offset & 0x1fff);

        out.push(0x40 | (ihl & 0x0f));
        out.push(self.tos);
        out.extend_from_slice(&total_length.to_be_bytes());
        out.extend_from_slice(&self.identification.to_be_bytes());
        out.extend_from_slice(&flags_offset.to_be_bytes());
        out.push(self.ttl);
        out.push(self.protocol.value() as u8);
        out.extend_from_slice(&self.checksum.to_be_bytes());
        out.extend_from_slice(&self.source.octets());
        out.extend_from_slice(&self.destination.octets());
        out.extend_from_slice(&self.options);

        if fixups.correct_checksum {
            patch_u16(&mut out[start..], 10, 0);
            let checksum = internet_checksum(&out[start..]);
            patch_u16(&mut out[start..], 10, checksum);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Ipv4Decoder;

impl Decoder for Ipv4Decoder {
    fn name(&self) -> &'static str {
        "ipv4"
    }

    fn display_name(&self) -> &'static str {
        "IPv4"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        let ipv4 = Ipv4HeaderSlice::from_slice(data).map_err(|e| malformed("ipv4", e))?;
        let hlen = ipv4.slice().len();
        let total_length = ipv4.total_len();
        // Zero total length is left by TCP segmentation offload; treat as unknown
        if total_length != 0 && (total_length as usize) < hlen {
            return Err(DecodeError::invalid(
                "ipv4",
                "total_length",
                format!("{total_length} is smaller than the {hlen} byte header"),
            ));
        }

        let options = data.slice(IPV4_MIN_HEADER_LEN..hlen);
        let option_list = parse_options("ipv4", TagKind::Ipv4OptionType, &options, ctx)?;
        let protocol = ctx.tag("ipv4", TagKind::IpNumber, ipv4.protocol().0 as u32)?;
        let flags_offset = read_be16(data, 6)?;

        let header = Ipv4Header {
            ihl: ipv4.ihl(),
            tos: data[1],
            total_length,
            identification: ipv4.identification(),
            flags: (flags_offset >> 13) as u8,
            fragment_offset: flags_offset & 0x1fff,
            ttl: ipv4.ttl(),
            protocol,
            checksum: ipv4.header_checksum(),
            source: Ipv4Addr::from(ipv4.source()),
            destination: Ipv4Addr::from(ipv4.destination()),
            options,
            option_list,
        };

        let fragment = header.is_fragment();
        let mut decoded = DecodedHeader::new(header);
        if total_length != 0 {
            decoded = decoded.payload_len(total_length as usize - hlen);
        }
        // Fragments stay opaque until reassembled
        if !fragment {
            decoded = decoded.next(protocol);
        }
        Ok(decoded.into())
    }
}
