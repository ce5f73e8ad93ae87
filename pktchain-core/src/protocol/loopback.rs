//! BSD loopback (LINKTYPE_NULL) decoder.
//!
//! The 4-byte header is the protocol family in the capturing host's byte
//! order, which is little-endian for every platform that still produces
//! these captures. IPv6 has a different family number on each BSD flavor,
//! so several values map to the same decoder.

use bytes::Bytes;

use super::{ensure_len, HeaderFormat};
use crate::buffer::{read_u32, ByteOrder};
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};
use crate::tag::{ProtocolTag, TagKind};

pub const BSD_LOOPBACK_HEADER_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BsdLoopbackHeader {
    pub family: ProtocolTag,
}

impl HeaderFormat for BsdLoopbackHeader {
    fn name(&self) -> &'static str {
        "bsd_loopback"
    }

    fn len(&self) -> usize {
        BSD_LOOPBACK_HEADER_LEN
    }

    fn write(&self, out: &mut Vec<u8>, _payload: &[u8], _fixups: Fixups, _ip: Option<&IpContext>) {
        out.extend_from_slice(&self.family.value().to_le_bytes());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BsdLoopbackDecoder;

impl Decoder for BsdLoopbackDecoder {
    fn name(&self) -> &'static str {
        "bsd_loopback"
    }

    fn display_name(&self) -> &'static str {
        "BSD Loopback"
    }

    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        ensure_len("bsd_loopback", data, BSD_LOOPBACK_HEADER_LEN)?;
        let family = read_u32(data, 0, ByteOrder::Little)?;
        let family = ctx.tag("bsd_loopback", TagKind::ProtocolFamily, family)?;
        Ok(DecodedHeader::new(BsdLoopbackHeader { family })
            .next(family)
            .into())
    }
}
