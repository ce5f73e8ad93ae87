//! IPv6 decoder.
//!
//! Extension headers are separate layers (see [`super::ipv6_ext`]), so the
//! payload of an IPv6 packet starts at the first extension header if any.

use std::net::Ipv6Addr;

use bytes::Bytes;
use etherparse::Ipv6HeaderSlice;

use super::{malformed, HeaderFormat};
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ProtocolTag, TagKind};

/// Fixed IPv6 header length.
pub const IPV6_HEADER_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Header {
    pub traffic_class: u8,
    /// 20-bit flow label
    pub flow_label: u32,
    pub payload_length: u16,
    pub next_header: ProtocolTag,
    pub hop_limit: u8,
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
}

impl HeaderFormat for Ipv6Header {
    fn name(&self) -> &'static str {
        "ipv6"
    }

    fn len(&self) -> usize {
        IPV6_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, _ip: Option<&IpContext>) {
        let payload_length = if fixups.correct_length {
            payload.len() as u16
        } else {
            self.payload_length
        };
        let first_word =
            (6u32 << 28) | ((self.traffic_class as u32) << 20) | (self.flow_label & 0x000f_ffff);
        out.extend_from_slice(&first_word.to_be_bytes());
        out.extend_from_slice(&payload_length.to_be_bytes());
        out.push(self.next_header.value() as u8);
        out.push(self.hop_limit);
        out.extend_from_slice(&self.source.octets());
        out.extend_from_slice(&self.destination.octets());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Ipv6Decoder;

impl Decoder for Ipv6Decoder {
    fn name(&self) -> &'static str {
        "ipv6"
    }

    fn display_name(&self) -> &'static str {
        "IPv6"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        let ipv6 = Ipv6HeaderSlice::from_slice(data).map_err(|e| malformed("ipv6", e))?;
        let next_header = ctx.tag("ipv6", TagKind::IpNumber, ipv6.next_header().0 as u32)?;

        let header = Ipv6Header {
            traffic_class: ipv6.traffic_class(),
            flow_label: ipv6.flow_label().value(),
            payload_length: ipv6.payload_length(),
            next_header,
            hop_limit: ipv6.hop_limit(),
            source: Ipv6Addr::from(ipv6.source()),
            destination: Ipv6Addr::from(ipv6.destination()),
        };

        let payload_length = header.payload_length;
        let mut decoded = DecodedHeader::new(header).next(next_header);
        // Zero means a jumbogram or an offloaded capture
        if payload_length != 0 {
            decoded = decoded.payload_len(payload_length as usize);
        }
        Ok(decoded.into())
    }
}
