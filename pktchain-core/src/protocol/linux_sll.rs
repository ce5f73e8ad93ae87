//! Linux cooked capture (LINKTYPE_LINUX_SLL) decoder.
//!
//! Used when capturing on the "any" interface. The 16-byte header carries
//! a variable-length link-layer address padded to 8 bytes.

use bytes::Bytes;

use super::{ensure_len, HeaderFormat};
use crate::buffer::{read_be16, read_link_addr, LinkLayerAddress};
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ProtocolTag, TagKind};

/// Linux SLL header length in bytes.
pub const LINUX_SLL_HEADER_LEN: usize = 16;

/// Packet type values.
pub mod packet_type {
    pub const HOST: u16 = 0;
    pub const BROADCAST: u16 = 1;
    pub const MULTICAST: u16 = 2;
    pub const OTHERHOST: u16 = 3;
    pub const OUTGOING: u16 = 4;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxSllHeader {
    pub packet_type: u16,
    /// ARPHRD_* hardware type
    pub hardware_type: u16,
    pub address_len: u16,
    /// Address field as captured, zero padded
    pub address: [u8; 8],
    pub protocol: ProtocolTag,
}

impl LinuxSllHeader {
    /// The link-layer address, if the header carries one.
    pub fn link_address(&self) -> Option<LinkLayerAddress> {
        let len = (self.address_len as usize).min(self.address.len());
        read_link_addr(&self.address, 0, len).ok()
    }
}

impl HeaderFormat for LinuxSllHeader {
    fn name(&self) -> &'static str {
        "linux_sll"
    }

    fn len(&self) -> usize {
        LINUX_SLL_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, _payload: &[u8], _fixups: Fixups, _ip: Option<&IpContext>) {
        out.extend_from_slice(&self.packet_type.to_be_bytes());
        out.extend_from_slice(&self.hardware_type.to_be_bytes());
        out.extend_from_slice(&self.address_len.to_be_bytes());
        out.extend_from_slice(&self.address);
        out.extend_from_slice(&(self.protocol.value() as u16).to_be_bytes());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LinuxSllDecoder;

impl Decoder for LinuxSllDecoder {
    fn name(&self) -> &'static str {
        "linux_sll"
    }

    fn display_name(&self) -> &'static str {
        "Linux SLL"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("linux_sll", data, LINUX_SLL_HEADER_LEN)?;

        let mut address = [0u8; 8];
        address.copy_from_slice(&data[6..14]);
        let protocol = ctx.tag("linux_sll", TagKind::EtherType, read_be16(data, 14)? as u32)?;

        let header = LinuxSllHeader {
            packet_type: read_be16(data, 0)?,
            hardware_type: read_be16(data, 2)?,
            address_len: read_be16(data, 4)?,
            address,
            protocol,
        };
        Ok(DecodedHeader::new(header).next(protocol).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::{decode_header, decode_with};
    use crate::protocol::Header;

    #[test]
    fn test_decode_linux_sll() {
        let data = [
            0x00, 0x04, // Packet type: outgoing
            0x00, 0x01, // ARPHRD_ETHER
            0x00, 0x06, // Address length: 6
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x00, 0x00, // Address + padding
            0x86, 0xdd, // Protocol: IPv6
        ];

        let decoded = decode_header(LinuxSllDecoder, &data);
        let Header::LinuxSll(sll) = &decoded.header else {
            panic!("expected a Linux SLL header");
        };
        assert_eq!(sll.packet_type, packet_type::OUTGOING);
        assert_eq!(sll.link_address().unwrap().to_string(), "00:11:22:33:44:55");
        assert_eq!(sll.protocol.name(), "IPv6");
        assert_eq!(decoded.next.unwrap()[0], sll.protocol);

        let mut out = Vec::new();
        decoded.header.write(&mut out, &[], Fixups::NONE, None);
        assert_eq!(out, data);
    }

    #[test]
    fn test_no_link_address() {
        let mut data = [0u8; 16];
        data[14] = 0x08;
        let decoded = decode_header(LinuxSllDecoder, &data);
        let Header::LinuxSll(sll) = &decoded.header else {
            panic!("expected a Linux SLL header");
        };
        assert_eq!(sll.link_address(), None);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            decode_with(LinuxSllDecoder, &[0u8; 15]),
            Err(DecodeError::too_short("linux_sll", 16, 15))
        );
    }
}
