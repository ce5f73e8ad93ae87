//! UDP decoder.

use bytes::Bytes;
use etherparse::UdpHeaderSlice;

use super::{malformed, patch_u16, HeaderFormat};
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ip_number, ProtocolTag, TagKind};

pub const UDP_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpHeader {
    pub source_port: ProtocolTag,
    pub destination_port: ProtocolTag,
    /// Header plus payload length
    pub length: u16,
    pub checksum: u16,
}

impl HeaderFormat for UdpHeader {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn len(&self) -> usize {
        UDP_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, ip: Option<&IpContext>) {
        let start = out.len();
        let length = if fixups.correct_length {
            (UDP_HEADER_LEN + payload.len()) as u16
        } else {
            self.length
        };
        out.extend_from_slice(&(self.source_port.value() as u16).to_be_bytes());
        out.extend_from_slice(&(self.destination_port.value() as u16).to_be_bytes());
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&self.checksum.to_be_bytes());

        if let (true, Some(ip)) = (fixups.correct_checksum, ip) {
            patch_u16(&mut out[start..], 6, 0);
            let checksum = match ip.checksum(ip_number::UDP, &[&out[start..], payload]) {
                // Zero on the wire means "no checksum"
                0 => 0xffff,
                c => c,
            };
            patch_u16(&mut out[start..], 6, checksum);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UdpDecoder;

impl Decoder for UdpDecoder {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn display_name(&self) -> &'static str {
        "UDP"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        let udp = UdpHeaderSlice::from_slice(data).map_err(|e| malformed("udp", e))?;
        let length = udp.length();
        if (length as usize) < UDP_HEADER_LEN {
            return Err(DecodeError::invalid(
                "udp",
                "length",
                format!("{length} is smaller than the header"),
            ));
        }

        let source_port = ctx.tag("udp", TagKind::UdpPort, udp.source_port() as u32)?;
        let destination_port = ctx.tag("udp", TagKind::UdpPort, udp.destination_port() as u32)?;
        let header = UdpHeader {
            source_port,
            destination_port,
            length,
            checksum: udp.checksum(),
        };

        Ok(DecodedHeader::new(header)
            .payload_len(length as usize - UDP_HEADER_LEN)
            .next(source_port)
            .next(destination_port)
            .into())
    }
}
