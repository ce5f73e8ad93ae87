//! ICMPv6 decoder.

use bytes::Bytes;

use super::{ensure_len, patch_u16, HeaderFormat};
use crate::buffer::read_be16;
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ethertype, ip_number, ProtocolTag, TagKind};

pub const ICMPV6_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icmpv6Header {
    pub icmp_type: ProtocolTag,
    pub code: u8,
    pub checksum: u16,
    pub rest: [u8; 4],
}

impl Icmpv6Header {
    /// Error messages have types below 128 and quote the invoking packet.
    pub fn is_error(&self) -> bool {
        self.icmp_type.value() < 128
    }

    /// MTU of a Packet Too Big message.
    pub fn mtu(&self) -> u32 {
        u32::from_be_bytes(self.rest)
    }
}

impl HeaderFormat for Icmpv6Header {
    fn name(&self) -> &'static str {
        "icmpv6"
    }

    fn len(&self) -> usize {
        ICMPV6_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, ip: Option<&IpContext>) {
        let start = out.len();
        out.push(self.icmp_type.value() as u8);
        out.push(self.code);
        out.extend_from_slice(&self.checksum.to_be_bytes());
        out.extend_from_slice(&self.rest);

        if let (true, Some(ip)) = (fixups.correct_checksum, ip) {
            patch_u16(&mut out[start..], 2, 0);
            let checksum = ip.checksum(ip_number::ICMPV6, &[&out[start..], payload]);
            patch_u16(&mut out[start..], 2, checksum);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Icmpv6Decoder;

impl Decoder for Icmpv6Decoder {
    fn name(&self) -> &'static str {
        "icmpv6"
    }

    fn display_name(&self) -> &'static str {
        "ICMPv6"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("icmpv6", data, ICMPV6_HEADER_LEN)?;
        let header = Icmpv6Header {
            icmp_type: ctx.tag("icmpv6", TagKind::IcmpV6Type, data[0] as u32)?,
            code: data[1],
            checksum: read_be16(data, 2)?,
            rest: [data[4], data[5], data[6], data[7]],
        };

        let error = header.is_error();
        let decoded = DecodedHeader::new(header);
        if error {
            let invoking = ctx.tag("icmpv6", TagKind::EtherType, ethertype::IPV6 as u32)?;
            return Ok(decoded.next(invoking).into());
        }
        Ok(decoded.into())
    }
}
