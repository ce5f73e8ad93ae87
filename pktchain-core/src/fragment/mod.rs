//! IP fragmentation and reassembly.
//!
//! [`ipv4`] and [`ipv6`] split a decoded packet into MTU-sized fragments and
//! put a caller-supplied fragment set back together. Reassembly is all or
//! nothing: a gap, an overlap or a length that does not add up fails the
//! whole set with a [`FragmentError`] naming its offsets.
//!
//! [`FragmentSet`] sits on top for streaming input. It groups fragments by
//! datagram and reassembles a group as soon as its byte ranges are
//! complete.
//!
//! ```text
//!  IPv4:  [ip hdr][     payload      ]
//!            │
//!            ├─► [ip hdr MF=1 off=0][chunk 0]
//!            ├─► [ip hdr MF=1 off=n][chunk 1]
//!            └─► [ip hdr MF=0 off=m][chunk 2]
//!
//!  IPv6:  [ip6 hdr][hop-by-hop][routing] | [rest ...]
//!          unfragmentable part          ─► [..][frag hdr][chunk i]
//! ```

pub mod ipv4;
pub mod ipv6;

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::Bytes;
use tracing::debug;

use crate::decode::Dissector;
use crate::error::FragmentError;
use crate::packet::Packet;
use crate::protocol::Header;

/// Byte range a fragment covers within its datagram's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: usize,
    pub len: usize,
    pub more: bool,
}

impl Span {
    fn overlaps(&self, other: &Span) -> bool {
        self.start < other.start + other.len && other.start < self.start + self.len
    }
}

/// Datagram a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKey {
    V4 {
        source: Ipv4Addr,
        destination: Ipv4Addr,
        protocol: u8,
        identification: u16,
    },
    V6 {
        source: Ipv6Addr,
        destination: Ipv6Addr,
        identification: u32,
    },
}

impl FragmentKey {
    /// Key of `packet`, or `None` when it is not a fragment.
    pub fn of(packet: &Packet) -> Option<FragmentKey> {
        match &packet.header {
            Header::Ipv4(_) => ipv4::key(packet),
            Header::Ipv6(_) => ipv6::key(packet),
            _ => None,
        }
    }
}

/// Reassemble a fragment set of either IP version.
///
/// The version is taken from the first fragment.
pub fn defragment(fragments: &[Packet], dissector: &Dissector) -> Result<Packet, FragmentError> {
    match fragments.first().map(|p| &p.header) {
        None => Err(FragmentError::Empty),
        Some(Header::Ipv6(_)) => ipv6::defragment(fragments, dissector),
        Some(_) => ipv4::defragment(fragments, dissector),
    }
}

/// Copy `pieces` (sorted by start) into one buffer of `total` bytes.
///
/// Each piece must start exactly where the previous one ended and the last
/// must end at `total`.
pub(crate) fn assemble(
    pieces: &[(usize, Bytes)],
    total: usize,
    offsets: &[u32],
) -> Result<Vec<u8>, FragmentError> {
    let inconsistent = |reason: String| FragmentError::Inconsistent {
        reason,
        offsets: offsets.to_vec(),
    };

    let mut data = Vec::with_capacity(total);
    for (start, bytes) in pieces {
        let start = *start;
        if start > data.len() {
            return Err(inconsistent(format!("missing bytes {}..{}", data.len(), start)));
        }
        if start < data.len() {
            return Err(inconsistent(format!("fragment at byte {start} overlaps its predecessor")));
        }
        if start + bytes.len() > total {
            return Err(inconsistent(format!(
                "fragment at byte {start} runs past the reassembled length {total}"
            )));
        }
        data.extend_from_slice(bytes);
    }
    if data.len() != total {
        return Err(inconsistent(format!(
            "reassembled {} of {total} bytes",
            data.len()
        )));
    }
    Ok(data)
}

fn span(packet: &Packet) -> Option<Span> {
    match &packet.header {
        Header::Ipv4(_) => ipv4::span(packet),
        Header::Ipv6(_) => ipv6::span(packet),
        _ => None,
    }
}

/// Whether `spans` cover a datagram from byte 0 to a last fragment.
fn is_complete(spans: &mut [Span]) -> bool {
    spans.sort_by_key(|s| s.start);
    let mut end = 0;
    for s in spans.iter() {
        if s.start != end {
            return false;
        }
        end += s.len;
    }
    spans.last().is_some_and(|s| !s.more)
}

/// Outcome of offering a packet to a [`FragmentSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reassembly {
    /// Not a fragment; handed back untouched
    Unfragmented(Packet),
    /// Stored until the rest of its datagram arrives
    Pending(FragmentKey),
    /// Last missing piece arrived
    Complete { packet: Packet, fragments: usize },
}

/// Fragments waiting for the rest of their datagram.
#[derive(Debug, Default)]
pub struct FragmentSet {
    pending: HashMap<FragmentKey, Vec<Packet>>,
}

impl FragmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a decoded IP packet.
    ///
    /// An exact duplicate of a stored fragment is dropped. A fragment that
    /// partly overlaps a stored one, or a group that fails to reassemble,
    /// drops the whole group and returns the error.
    pub fn push(&mut self, packet: Packet, dissector: &Dissector) -> Result<Reassembly, FragmentError> {
        let Some(key) = FragmentKey::of(&packet) else {
            return Ok(Reassembly::Unfragmented(packet));
        };

        let group = self.pending.entry(key).or_default();
        if let Some(new) = span(&packet) {
            let stored: Vec<Span> = group.iter().filter_map(span).collect();
            if stored.contains(&new) {
                debug!(?key, start = new.start, "duplicate fragment dropped");
                return Ok(Reassembly::Pending(key));
            }
            if stored.iter().any(|s| s.overlaps(&new)) {
                let mut offsets: Vec<u32> = stored
                    .iter()
                    .chain(std::iter::once(&new))
                    .map(|s| (s.start / 8) as u32)
                    .collect();
                offsets.sort_unstable();
                self.pending.remove(&key);
                debug!(?key, ?offsets, "overlapping fragment, group dropped");
                return Err(FragmentError::Inconsistent {
                    reason: format!("fragment at byte {} overlaps a stored fragment", new.start),
                    offsets,
                });
            }
        }
        group.push(packet);
        let mut spans: Vec<Span> = group.iter().filter_map(span).collect();
        if !is_complete(&mut spans) {
            return Ok(Reassembly::Pending(key));
        }

        let group = self.pending.remove(&key).unwrap_or_default();
        let fragments = group.len();
        let packet = defragment(&group, dissector)?;
        debug!(?key, fragments, len = packet.len(), "datagram complete");
        Ok(Reassembly::Complete { packet, fragments })
    }

    /// Number of datagrams still missing fragments.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every incomplete group.
    pub fn drain(&mut self) -> impl Iterator<Item = (FragmentKey, Vec<Packet>)> + '_ {
        self.pending.drain()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
