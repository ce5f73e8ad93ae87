//! SCTP common header decoder.
//!
//! Only the 12-byte common header is decoded; the chunks that follow are
//! dispatched on the port numbers like any other transport payload.

use bytes::Bytes;

use super::{ensure_len, HeaderFormat};
use crate::buffer::checksum::crc32c;
use crate::buffer::{read_be16, read_be32, read_u32, ByteOrder};
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ProtocolTag, TagKind};

pub const SCTP_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SctpHeader {
    pub source_port: ProtocolTag,
    pub destination_port: ProtocolTag,
    pub verification_tag: u32,
    /// CRC32C, which goes on the wire least significant byte first
    pub checksum: u32,
}

impl SctpHeader {
    /// CRC32C of a packet with this header, checksum field zeroed.
    pub fn compute_checksum(&self, payload: &[u8]) -> u32 {
        let mut packet = Vec::with_capacity(SCTP_HEADER_LEN + payload.len());
        self.write_fields(&mut packet, 0);
        packet.extend_from_slice(payload);
        crc32c(&packet)
    }

    fn write_fields(&self, out: &mut Vec<u8>, checksum: u32) {
        out.extend_from_slice(&(self.source_port.value() as u16).to_be_bytes());
        out.extend_from_slice(&(self.destination_port.value() as u16).to_be_bytes());
        out.extend_from_slice(&self.verification_tag.to_be_bytes());
        out.extend_from_slice(&checksum.to_le_bytes());
    }
}

impl HeaderFormat for SctpHeader {
    fn name(&self) -> &'static str {
        "sctp"
    }

    fn len(&self) -> usize {
        SCTP_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, _ip: Option<&IpContext>) {
        let checksum = if fixups.correct_checksum {
            self.compute_checksum(payload)
        } else {
            self.checksum
        };
        self.write_fields(out, checksum);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SctpDecoder;

impl Decoder for SctpDecoder {
    fn name(&self) -> &'static str {
        "sctp"
    }

    fn display_name(&self) -> &'static str {
        "SCTP"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("sctp", data, SCTP_HEADER_LEN)?;
        let source_port = ctx.tag("sctp", TagKind::SctpPort, read_be16(data, 0)? as u32)?;
        let destination_port = ctx.tag("sctp", TagKind::SctpPort, read_be16(data, 2)? as u32)?;
        let header = SctpHeader {
            source_port,
            destination_port,
            verification_tag: read_be32(data, 4)?,
            checksum: read_u32(data, 8, ByteOrder::Little)?,
        };
        Ok(DecodedHeader::new(header)
            .next(source_port)
            .next(destination_port)
            .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::{decode_header, decode_with};
    use crate::protocol::Header;

    const INIT: [u8; 32] = [
        0x0f, 0x1c, // Src port: 3868 (Diameter)
        0x0f, 0x1c, // Dst port: 3868
        0x00, 0x00, 0x00, 0x00, // Verification tag (0 for INIT)
        0x00, 0x00, 0x00, 0x00, // Checksum (filled in by the test)
        0x01, // Chunk type: INIT
        0x00, // Chunk flags
        0x00, 0x14, // Chunk length: 20
        0x12, 0x34, 0x56, 0x78, // Initiate tag
        0x00, 0x01, 0x00, 0x00, // a_rwnd
        0x00, 0x0a, // Outbound streams
        0x00, 0x0a, // Inbound streams
        0x00, 0x00, 0x00, 0x01, // Initial TSN
    ];

    #[test]
    fn test_decode_sctp() {
        let decoded = decode_header(SctpDecoder, &INIT);
        let Header::Sctp(sctp) = &decoded.header else {
            panic!("expected an SCTP header");
        };
        assert_eq!(sctp.source_port.name(), "Diameter");
        assert_eq!(sctp.verification_tag, 0);
        assert_eq!(decoded.next.map(|c| c.len()), Some(2));
    }

    #[test]
    fn test_checksum_is_crc32c_little_endian() {
        let decoded = decode_header(SctpDecoder, &INIT);
        let mut out = Vec::new();
        decoded.header.write(&mut out, &INIT[12..], Fixups::ALL, None);

        let mut zeroed = INIT;
        zeroed[8..12].fill(0);
        let crc = crc32c(&zeroed);
        assert_eq!(&out[8..12], &crc.to_le_bytes());

        // Decoding the fixed packet reads the same value back
        out.extend_from_slice(&INIT[12..]);
        let decoded = decode_header(SctpDecoder, &out);
        let Header::Sctp(sctp) = &decoded.header else {
            panic!("expected an SCTP header");
        };
        assert_eq!(sctp.checksum, crc);
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            decode_with(SctpDecoder, &INIT[..11]),
            Err(DecodeError::too_short("sctp", 12, 11))
        );
    }
}
