//! Ethernet II decoder.

use bytes::Bytes;
use etherparse::Ethernet2HeaderSlice;

use super::{malformed, HeaderFormat};
use crate::buffer::MacAddr;
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ethertype, ProtocolTag, TagKind};

/// Ethernet II header length in bytes.
pub const ETHERNET_HEADER_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: MacAddr,
    pub source: MacAddr,
    /// EtherType, or an 802.3 length for values up to 1500.
    pub ether_type: ProtocolTag,
}

impl HeaderFormat for EthernetHeader {
    fn name(&self) -> &'static str {
        "ethernet"
    }

    fn len(&self) -> usize {
        ETHERNET_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, _payload: &[u8], _fixups: Fixups, _ip: Option<&IpContext>) {
        out.extend_from_slice(&self.destination.octets());
        out.extend_from_slice(&self.source.octets());
        out.extend_from_slice(&(self.ether_type.value() as u16).to_be_bytes());
    }
}

/// Ethernet II decoder (LINKTYPE_ETHERNET).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EthernetDecoder;

impl Decoder for EthernetDecoder {
    fn name(&self) -> &'static str {
        "ethernet"
    }

    fn display_name(&self) -> &'static str {
        "Ethernet"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        let eth = Ethernet2HeaderSlice::from_slice(data).map_err(|e| malformed("ethernet", e))?;
        let type_or_len = eth.ether_type().0;
        let ether_type = ctx.tag("ethernet", TagKind::EtherType, type_or_len as u32)?;

        let header = EthernetHeader {
            destination: MacAddr(eth.destination()),
            source: MacAddr(eth.source()),
            ether_type,
        };

        let decoded = DecodedHeader::new(header);
        if type_or_len <= ethertype::MAX_802_3_LENGTH {
            // 802.3 frame: the field is the LLC payload length
            return Ok(decoded.payload_len(type_or_len as usize).into());
        }
        Ok(decoded.next(ether_type).into())
    }
}
