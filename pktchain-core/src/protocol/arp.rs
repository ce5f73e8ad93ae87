//! ARP decoder.

use bytes::Bytes;

use super::{ensure_len, HeaderFormat};
use crate::buffer::{read_be16, read_link_addr, read_u8, LinkLayerAddress};
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ProtocolTag, TagKind};

/// Fixed part of the ARP header, before the addresses.
const ARP_FIXED_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpHeader {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub hardware_len: u8,
    pub protocol_len: u8,
    pub operation: ProtocolTag,
    pub sender_hardware: LinkLayerAddress,
    pub sender_protocol: LinkLayerAddress,
    pub target_hardware: LinkLayerAddress,
    pub target_protocol: LinkLayerAddress,
}

impl HeaderFormat for ArpHeader {
    fn name(&self) -> &'static str {
        "arp"
    }

    fn len(&self) -> usize {
        ARP_FIXED_LEN
            + self.sender_hardware.len()
            + self.sender_protocol.len()
            + self.target_hardware.len()
            + self.target_protocol.len()
    }

    fn write(&self, out: &mut Vec<u8>, _payload: &[u8], fixups: Fixups, _ip: Option<&IpContext>) {
        let (hardware_len, protocol_len) = if fixups.correct_length {
            (
                self.sender_hardware.len() as u8,
                self.sender_protocol.len() as u8,
            )
        } else {
            (self.hardware_len, self.protocol_len)
        };
        out.extend_from_slice(&self.hardware_type.to_be_bytes());
        out.extend_from_slice(&self.protocol_type.to_be_bytes());
        out.push(hardware_len);
        out.push(protocol_len);
        out.extend_from_slice(&(self.operation.value() as u16).to_be_bytes());
        out.extend_from_slice(self.sender_hardware.as_bytes());
        out.extend_from_slice(self.sender_protocol.as_bytes());
        out.extend_from_slice(self.target_hardware.as_bytes());
        out.extend_from_slice(self.target_protocol.as_bytes());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ArpDecoder;

impl Decoder for ArpDecoder {
    fn name(&self) -> &'static str {
        "arp"
    }

    fn display_name(&self) -> &'static str {
        "ARP"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("arp", data, ARP_FIXED_LEN)?;
        let hardware_len = read_u8(data, 4)?;
        let protocol_len = read_u8(data, 5)?;
        let hlen = hardware_len as usize;
        let plen = protocol_len as usize;
        ensure_len("arp", data, ARP_FIXED_LEN + 2 * (hlen + plen))?;

        let operation = ctx.tag("arp", TagKind::ArpOperation, read_be16(data, 6)? as u32)?;

        // Zero-length addresses fail here as buffer errors
        let mut at = ARP_FIXED_LEN;
        let mut next_addr = |len: usize| {
            let addr = read_link_addr(data, at, len);
            at += len;
            addr
        };
        let header = ArpHeader {
            hardware_type: read_be16(data, 0)?,
            protocol_type: read_be16(data, 2)?,
            hardware_len,
            protocol_len,
            operation,
            sender_hardware: next_addr(hlen)?,
            sender_protocol: next_addr(plen)?,
            target_hardware: next_addr(hlen)?,
            target_protocol: next_addr(plen)?,
        };

        // ARP ends the chain; anything after it is padding
        Ok(DecodedHeader::new(header).payload_len(0).into())
    }
}
