//! TLS record layer and heartbeat message decoders.
//!
//! Both content type and heartbeat message type are closed number spaces:
//! a value outside the catalog makes the layer illegal instead of
//! producing an "unknown" tag.

use bytes::Bytes;

use super::{ensure_len, HeaderFormat};
use crate::buffer::read_be16;
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ProtocolTag, TagKind};

pub const TLS_RECORD_HEADER_LEN: usize = 5;
pub const HEARTBEAT_HEADER_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsRecordHeader {
    pub content_type: ProtocolTag,
    /// Legacy record version, 0x0301 through 0x0304 in practice
    pub version: u16,
    pub length: u16,
}

impl HeaderFormat for TlsRecordHeader {
    fn name(&self) -> &'static str {
        "tls"
    }

    fn len(&self) -> usize {
        TLS_RECORD_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, _ip: Option<&IpContext>) {
        let length = if fixups.correct_length {
            payload.len() as u16
        } else {
            self.length
        };
        out.push(self.content_type.value() as u8);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&length.to_be_bytes());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TlsRecordDecoder;

impl Decoder for TlsRecordDecoder {
    fn name(&self) -> &'static str {
        "tls"
    }

    fn display_name(&self) -> &'static str {
        "TLS Record"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("tls", data, TLS_RECORD_HEADER_LEN)?;
        let content_type = ctx.tag("tls", TagKind::TlsContentType, data[0] as u32)?;
        let version = read_be16(data, 1)?;
        if version >> 8 != 3 {
            return Err(DecodeError::invalid(
                "tls",
                "version",
                format!("0x{version:04x} is not an SSL 3.0 / TLS version"),
            ));
        }
        let length = read_be16(data, 3)?;

        let header = TlsRecordHeader {
            content_type,
            version,
            length,
        };
        Ok(DecodedHeader::new(header)
            .payload_len(length as usize)
            .next(content_type)
            .into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatHeader {
    pub message_type: ProtocolTag,
    /// Claimed payload length; padding follows the payload
    pub payload_length: u16,
}

impl HeaderFormat for HeartbeatHeader {
    fn name(&self) -> &'static str {
        "tls_heartbeat"
    }

    fn len(&self) -> usize {
        HEARTBEAT_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, _payload: &[u8], _fixups: Fixups, _ip: Option<&IpContext>) {
        out.push(self.message_type.value() as u8);
        out.extend_from_slice(&self.payload_length.to_be_bytes());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HeartbeatDecoder;

impl Decoder for HeartbeatDecoder {
    fn name(&self) -> &'static str {
        "tls_heartbeat"
    }

    fn display_name(&self) -> &'static str {
        "TLS Heartbeat"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("tls_heartbeat", data, HEARTBEAT_HEADER_LEN)?;
        let header = HeartbeatHeader {
            message_type: ctx.tag("tls_heartbeat", TagKind::HeartbeatMessageType, data[0] as u32)?,
            payload_length: read_be16(data, 1)?,
        };
        Ok(DecodedHeader::new(header).into())
    }
}
