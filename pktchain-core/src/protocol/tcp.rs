//! TCP decoder.

use bytes::Bytes;
use etherparse::TcpHeaderSlice;
use smallvec::SmallVec;

use super::options::{parse_options, OptionEntry};
use super::{malformed, patch_u16, HeaderFormat};
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ip_number, ProtocolTag, TagKind};

/// TCP header length without options.
pub const TCP_MIN_HEADER_LEN: usize = 20;

/// TCP flag bits, as stored in the low 9 bits of bytes 12-13.
pub mod tcp_flags {
    pub const FIN: u16 = 0x001;
    pub const SYN: u16 = 0x002;
    pub const RST: u16 = 0x004;
    pub const PSH: u16 = 0x008;
    pub const ACK: u16 = 0x010;
    pub const URG: u16 = 0x020;
    pub const ECE: u16 = 0x040;
    pub const CWR: u16 = 0x080;
    pub const NS: u16 = 0x100;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeader {
    pub source_port: ProtocolTag,
    pub destination_port: ProtocolTag,
    pub sequence: u32,
    pub acknowledgment: u32,
    /// Header length in 32-bit words, as stored
    pub data_offset: u8,
    pub reserved: u8,
    pub flags: u16,
    pub window: u16,
    pub checksum: u16,
    pub urgent_pointer: u16,
    pub options: Bytes,
    pub option_list: SmallVec<[OptionEntry; 4]>,
}

impl TcpHeader {
    pub fn header_len(&self) -> usize {
        TCP_MIN_HEADER_LEN + self.options.len()
    }

    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }
}

impl HeaderFormat for TcpHeader {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn len(&self) -> usize {
        self.header_len()
    }

    fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, ip: Option<&IpContext>) {
        let start = out.len();
        let data_offset = if fixups.correct_length {
            (self.header_len() / 4) as u8
        } else {
            self.data_offset
        };
        let offset_flags = ((data_offset as u16) << 12)
            | ((self.reserved as u16 & 0b111) << 9)
            | (self.flags & 0x1ff);

        out.extend_from_slice(&(self.source_port.value() as u16).to_be_bytes());
        out.extend_from_slice(&(self.destination_port.value() as u16).to_be_bytes());
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.acknowledgment.to_be_bytes());
        out.extend_from_slice(&offset_flags.to_be_bytes());
        out.extend_from_slice(&self.window.to_be_bytes());
        out.extend_from_slice(&self.checksum.to_be_bytes());
        out.extend_from_slice(&self.urgent_pointer.to_be_bytes());
        out.extend_from_slice(&self.options);

        // Without an enclosing IP header there is no pseudo-header to sum
        if let (true, Some(ip)) = (fixups.correct_checksum, ip) {
            patch_u16(&mut out[start..], 16, 0);
            let checksum = ip.checksum(ip_number::TCP, &[&out[start..], payload]);
            patch_u16(&mut out[start..], 16, checksum);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TcpDecoder;

impl Decoder for TcpDecoder {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn display_name(&self) -> &'static str {
        "TCP"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        let tcp = TcpHeaderSlice::from_slice(data).map_err(|e| malformed("tcp", e))?;
        let hlen = tcp.slice().len();
        let options = data.slice(TCP_MIN_HEADER_LEN..hlen);
        let option_list = parse_options("tcp", TagKind::TcpOptionKind, &options, ctx)?;

        let source_port = ctx.tag("tcp", TagKind::TcpPort, tcp.source_port() as u32)?;
        let destination_port = ctx.tag("tcp", TagKind::TcpPort, tcp.destination_port() as u32)?;

        let header = TcpHeader {
            source_port,
            destination_port,
            sequence: tcp.sequence_number(),
            acknowledgment: tcp.acknowledgment_number(),
            data_offset: tcp.data_offset(),
            reserved: (data[12] >> 1) & 0b111,
            flags: ((data[12] as u16 & 1) << 8) | data[13] as u16,
            window: tcp.window_size(),
            checksum: tcp.checksum(),
            urgent_pointer: tcp.urgent_pointer(),
            options,
            option_list,
        };

        Ok(DecodedHeader::new(header)
            .next(source_port)
            .next(destination_port)
            .into())
    }
}
