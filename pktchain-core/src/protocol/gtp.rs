//! GTPv1 decoder (3GPP TS 29.060, TS 29.281).
//!
//! A G-PDU carries a user-plane IP packet whose version is not announced
//! anywhere in the GTP header, so both IPv4 and IPv6 are offered as
//! candidates and the first that decodes wins.

use bytes::Bytes;

use super::{ensure_len, HeaderFormat};
use crate::buffer::{read_be16, read_be32};
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ethertype, gtp_message_type, ProtocolTag, TagKind};

/// Mandatory part of the header; the length field counts everything after it.
pub const GTP_MANDATORY_LEN: usize = 8;

/// Maximum extension headers followed before giving up.
const MAX_EXTENSION_HEADERS: usize = 16;

/// Flag bits in the first octet, below the version.
pub mod gtp_flags {
    pub const PROTOCOL_TYPE: u8 = 0x10;
    pub const EXTENSION: u8 = 0x04;
    pub const SEQUENCE: u8 = 0x02;
    pub const N_PDU: u8 = 0x01;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtpHeader {
    /// Low five bits of the first octet
    pub flags: u8,
    pub message_type: ProtocolTag,
    pub length: u16,
    pub teid: u32,
    /// Sequence number, N-PDU number and next extension type, present when
    /// any of the E, S or PN flags is set
    pub optional: Option<[u8; 4]>,
    /// Extension header chain, each `length * 4` bytes
    pub extensions: Bytes,
}

impl GtpHeader {
    pub fn sequence(&self) -> Option<u16> {
        match self.optional {
            Some(o) if self.flags & gtp_flags::SEQUENCE != 0 => Some(u16::from_be_bytes([o[0], o[1]])),
            _ => None,
        }
    }

    pub fn n_pdu(&self) -> Option<u8> {
        match self.optional {
            Some(o) if self.flags & gtp_flags::N_PDU != 0 => Some(o[2]),
            _ => None,
        }
    }

    /// Number of extension headers in the chain.
    pub fn extension_count(&self) -> usize {
        let mut count = 0;
        let mut at = 0;
        while at < self.extensions.len() {
            let len = self.extensions[at] as usize * 4;
            if len == 0 {
                break;
            }
            at += len;
            count += 1;
        }
        count
    }
}

impl HeaderFormat for GtpHeader {
    fn name(&self) -> &'static str {
        "gtpv1"
    }

    fn len(&self) -> usize {
        GTP_MANDATORY_LEN + self.optional.map_or(0, |o| o.len()) + self.extensions.len()
    }

    fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, _ip: Option<&IpContext>) {
        let length = if fixups.correct_length {
            (self.len() - GTP_MANDATORY_LEN + payload.len()) as u16
        } else {
            self.length
        };
        out.push((1 << 5) | (self.flags & 0x1f));
        out.push(self.message_type.value() as u8);
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&self.teid.to_be_bytes());
        if let Some(optional) = self.optional {
            out.extend_from_slice(&optional);
        }
        out.extend_from_slice(&self.extensions);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GtpDecoder;

impl GtpDecoder {
    /// Walk the extension header chain starting at `start`, returning its end.
    fn extension_chain_end(
        data: &Bytes,
        start: usize,
        mut next_type: u8,
    ) -> Result<usize, DecodeError> {
        let mut at = start;
        let mut count = 0;
        while next_type != 0 {
            if count == MAX_EXTENSION_HEADERS {
                return Err(DecodeError::invalid(
                    "gtpv1",
                    "extension",
                    format!("more than {MAX_EXTENSION_HEADERS} extension headers"),
                ));
            }
            ensure_len("gtpv1", data, at + 1)?;
            let len = data[at] as usize * 4;
            if len == 0 {
                return Err(DecodeError::invalid(
                    "gtpv1",
                    "extension",
                    format!("zero-length extension header at offset {at}"),
                ));
            }
            ensure_len("gtpv1", data, at + len)?;
            next_type = data[at + len - 1];
            at += len;
            count += 1;
        }
        Ok(at)
    }
}

impl Decoder for GtpDecoder {
    fn name(&self) -> &'static str {
        "gtpv1"
    }

    fn display_name(&self) -> &'static str {
        "GTPv1"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("gtpv1", data, GTP_MANDATORY_LEN)?;
        let version = data[0] >> 5;
        if version != 1 {
            return Err(DecodeError::invalid(
                "gtpv1",
                "version",
                format!("expected 1, got {version}"),
            ));
        }
        let flags = data[0] & 0x1f;
        let message_type = ctx.tag("gtpv1", TagKind::GtpV1MessageType, data[1] as u32)?;
        let length = read_be16(data, 2)?;
        let teid = read_be32(data, 4)?;

        let has_optional =
            flags & (gtp_flags::EXTENSION | gtp_flags::SEQUENCE | gtp_flags::N_PDU) != 0;
        let (optional, ext_start) = if has_optional {
            ensure_len("gtpv1", data, GTP_MANDATORY_LEN + 4)?;
            (Some([data[8], data[9], data[10], data[11]]), GTP_MANDATORY_LEN + 4)
        } else {
            (None, GTP_MANDATORY_LEN)
        };
        let ext_end = match optional {
            Some(o) if flags & gtp_flags::EXTENSION != 0 => {
                Self::extension_chain_end(data, ext_start, o[3])?
            }
            _ => ext_start,
        };

        let counted = ext_end - GTP_MANDATORY_LEN;
        if (length as usize) < counted {
            return Err(DecodeError::invalid(
                "gtpv1",
                "length",
                format!("{length} does not cover the {counted} optional header bytes"),
            ));
        }

        let header = GtpHeader {
            flags,
            message_type,
            length,
            teid,
            optional,
            extensions: data.slice(ext_start..ext_end),
        };
        let mut decoded = DecodedHeader::new(header).payload_len(length as usize - counted);
        if message_type.value() == gtp_message_type::G_PDU as u32 {
            decoded = decoded
                .next(ctx.tag("gtpv1", TagKind::EtherType, ethertype::IPV4 as u32)?)
                .next(ctx.tag("gtpv1", TagKind::EtherType, ethertype::IPV6 as u32)?);
        }
        Ok(decoded.into())
    }
}
