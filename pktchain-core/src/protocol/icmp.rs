//! ICMPv4 decoder.
//!
//! Error messages (destination unreachable, time exceeded, ...) carry the
//! start of the datagram that caused them, which is decoded as an inner
//! IPv4 packet.

use bytes::Bytes;

use super::{ensure_len, patch_u16, HeaderFormat};
use crate::buffer::checksum::internet_checksum_parts;
use crate::buffer::read_be16;
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ethertype, icmpv4_type, ProtocolTag, TagKind};

pub const ICMP_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icmpv4Header {
    pub icmp_type: ProtocolTag,
    pub code: u8,
    pub checksum: u16,
    /// Type-specific word (identifier/sequence, gateway, MTU, ...)
    pub rest: [u8; 4],
}

impl Icmpv4Header {
    pub fn is_error(&self) -> bool {
        matches!(
            self.icmp_type.value() as u8,
            icmpv4_type::DESTINATION_UNREACHABLE
                | icmpv4_type::SOURCE_QUENCH
                | icmpv4_type::REDIRECT
                | icmpv4_type::TIME_EXCEEDED
                | icmpv4_type::PARAMETER_PROBLEM
        )
    }

    /// Identifier of an echo request or reply.
    pub fn identifier(&self) -> u16 {
        u16::from_be_bytes([self.rest[0], self.rest[1]])
    }

    /// Sequence number of an echo request or reply.
    pub fn sequence(&self) -> u16 {
        u16::from_be_bytes([self.rest[2], self.rest[3]])
    }
}

impl HeaderFormat for Icmpv4Header {
    fn name(&self) -> &'static str {
        "icmpv4"
    }

    fn len(&self) -> usize {
        ICMP_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, _ip: Option<&IpContext>) {
        let start = out.len();
        out.push(self.icmp_type.value() as u8);
        out.push(self.code);
        out.extend_from_slice(&self.checksum.to_be_bytes());
        out.extend_from_slice(&self.rest);

        if fixups.correct_checksum {
            patch_u16(&mut out[start..], 2, 0);
            let checksum = internet_checksum_parts(&[&out[start..], payload]);
            patch_u16(&mut out[start..], 2, checksum);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Icmpv4Decoder;

impl Decoder for Icmpv4Decoder {
    fn name(&self) -> &'static str {
        "icmpv4"
    }

    fn display_name(&self) -> &'static str {
        "ICMPv4"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("icmpv4", data, ICMP_HEADER_LEN)?;
        let header = Icmpv4Header {
            icmp_type: ctx.tag("icmpv4", TagKind::IcmpV4Type, data[0] as u32)?,
            code: data[1],
            checksum: read_be16(data, 2)?,
            rest: [data[4], data[5], data[6], data[7]],
        };

        let error = header.is_error();
        let decoded = DecodedHeader::new(header);
        if error {
            let invoking = ctx.tag("icmpv4", TagKind::EtherType, ethertype::IPV4 as u32)?;
            return Ok(decoded.next(invoking).into());
        }
        Ok(decoded.into())
    }
}
