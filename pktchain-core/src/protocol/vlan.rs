//! IEEE 802.1Q VLAN tag decoder.
//!
//! Also used for 802.1ad (Q-in-Q) outer tags, which share the layout.

use bytes::Bytes;

use super::{ensure_len, HeaderFormat};
use crate::buffer::read_be16;
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ProtocolTag, TagKind};

pub const VLAN_HEADER_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanHeader {
    /// Priority code point (3 bits)
    pub priority: u8,
    /// Drop eligible indicator
    pub drop_eligible: bool,
    /// VLAN identifier (12 bits)
    pub vlan_id: u16,
    pub ether_type: ProtocolTag,
}

impl VlanHeader {
    fn tci(&self) -> u16 {
        ((self.priority as u16 & 0x7) << 13)
            | ((self.drop_eligible as u16) << 12)
            | (self.vlan_id & 0x0FFF)
    }
}

impl HeaderFormat for VlanHeader {
    fn name(&self) -> &'static str {
        "dot1q"
    }

    fn len(&self) -> usize {
        VLAN_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, _payload: &[u8], _fixups: Fixups, _ip: Option<&IpContext>) {
        out.extend_from_slice(&self.tci().to_be_bytes());
        out.extend_from_slice(&(self.ether_type.value() as u16).to_be_bytes());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VlanDecoder;

impl Decoder for VlanDecoder {
    fn name(&self) -> &'static str {
        "dot1q"
    }

    fn display_name(&self) -> &'static str {
        "802.1Q VLAN"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("dot1q", data, VLAN_HEADER_LEN)?;
        let tci = read_be16(data, 0)?;
        let ether_type = ctx.tag("dot1q", TagKind::EtherType, read_be16(data, 2)? as u32)?;

        let header = VlanHeader {
            priority: (tci >> 13) as u8,
            drop_eligible: tci & 0x1000 != 0,
            vlan_id: tci & 0x0FFF,
            ether_type,
        };
        Ok(DecodedHeader::new(header).next(ether_type).into())
    }
}
