//! Type-length-value option lists shared by IPv4 and TCP.
//!
//! Kind 0 ends the list (the rest is padding) and kind 1 is a single-byte
//! no-op; every other option carries a length byte that counts the kind
//! and length bytes themselves.

use bytes::Bytes;
use smallvec::SmallVec;

use crate::decode::DecodeContext;
use crate::error::DecodeError;
use crate::tag::{ProtocolTag, TagKind};

const END_OF_LIST: u8 = 0;
const NO_OPERATION: u8 = 1;

/// One parsed option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub kind: ProtocolTag,
    /// Option data, without the kind and length bytes.
    pub data: Bytes,
}

/// Parse an option area, rejecting options that overrun it.
pub fn parse_options(
    protocol: &'static str,
    kind: TagKind,
    area: &Bytes,
    ctx: &DecodeContext<'_>,
) -> Result<SmallVec<[OptionEntry; 4]>, DecodeError> {
    let mut entries = SmallVec::new();
    let mut at = 0;
    while at < area.len() {
        let code = area[at];
        let tag = ctx.tag(protocol, kind, code as u32)?;
        match code {
            END_OF_LIST => {
                entries.push(OptionEntry {
                    kind: tag,
                    data: Bytes::new(),
                });
                break;
            }
            NO_OPERATION => {
                entries.push(OptionEntry {
                    kind: tag,
                    data: Bytes::new(),
                });
                at += 1;
            }
            _ => {
                let Some(&len) = area.get(at + 1) else {
                    return Err(DecodeError::invalid(
                        protocol,
                        "options",
                        format!("option {code} at offset {at} has no length byte"),
                    ));
                };
                let len = len as usize;
                if len < 2 || at + len > area.len() {
                    return Err(DecodeError::invalid(
                        protocol,
                        "options",
                        format!(
                            "option {code} at offset {at} has length {len}, {} bytes left",
                            area.len() - at
                        ),
                    ));
                }
                entries.push(OptionEntry {
                    kind: tag,
                    data: area.slice(at + 2..at + len),
                });
                at += len;
            }
        }
    }
    Ok(entries)
}
