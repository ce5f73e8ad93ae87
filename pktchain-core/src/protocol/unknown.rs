//! Fallback decoder.

use bytes::Bytes;

use crate::decode::{DecodeContext, Decoded, Decoder};
use crate::error::DecodeError;

/// Accepts anything and interprets nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UnknownDecoder;

impl Decoder for UnknownDecoder {
    fn name(&self) -> &'static str {
        "unknown"
    }

    fn display_name(&self) -> &'static str {
        "Unknown"
    }

    fn is_total(&self) -> bool {
        true
    }

    fn decode(&self, _data: &Bytes, _ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        Ok(Decoded::Opaque)
    }
}
