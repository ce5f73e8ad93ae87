//! IPv4 fragmentation (RFC 791).

use bytes::Bytes;
use tracing::debug;

use super::{assemble, FragmentKey, Span};
use crate::decode::Dissector;
use crate::error::FragmentError;
use crate::packet::{Fixups, Layer, OpaqueLayer, Packet};
use crate::protocol::Ipv4Header;

fn header(packet: &Packet, index: usize) -> Result<&Ipv4Header, FragmentError> {
    packet.header.as_ipv4().ok_or(FragmentError::NotFragment {
        index,
        expected: "IPv4",
    })
}

pub(crate) fn key(packet: &Packet) -> Option<FragmentKey> {
    let ip = packet.header.as_ipv4().filter(|ip| ip.is_fragment())?;
    Some(FragmentKey::V4 {
        source: ip.source,
        destination: ip.destination,
        protocol: ip.protocol.value() as u8,
        identification: ip.identification,
    })
}

pub(crate) fn span(packet: &Packet) -> Option<Span> {
    let ip = packet.header.as_ipv4()?;
    Some(Span {
        start: ip.fragment_offset as usize * 8,
        len: packet.payload_len(),
        more: ip.more_fragments(),
    })
}

/// Split `packet` into fragments of at most `mtu` bytes.
///
/// A packet that already fits is returned as the only element. Every
/// fragment is marked for length and checksum recomputation.
pub fn fragment(packet: &Packet, mtu: usize) -> Result<Vec<Packet>, FragmentError> {
    let ip = header(packet, 0)?;
    if packet.len() <= mtu {
        return Ok(vec![packet.clone()]);
    }
    let header_len = ip.header_len();
    if mtu < header_len + 8 {
        return Err(FragmentError::MtuTooSmall { mtu, header_len });
    }

    let payload = Bytes::from(packet.payload_bytes(None));
    let chunk = (mtu - header_len) & !7;
    let base = ip.fragment_offset as usize * 8;
    // Splitting a fragment again keeps its own MF on the last piece
    let more_after = ip.more_fragments();

    let mut fragments = Vec::with_capacity(payload.len().div_ceil(chunk));
    let mut start = 0;
    while start < payload.len() {
        let end = (start + chunk).min(payload.len());
        let more = end < payload.len() || more_after;

        let mut h = ip.clone();
        h.fragment_offset = ((base + start) / 8) as u16;
        h.flags = if more {
            h.flags | Ipv4Header::FLAG_MORE_FRAGMENTS
        } else {
            h.flags & !Ipv4Header::FLAG_MORE_FRAGMENTS
        };
        h.total_length = (header_len + end - start) as u16;

        fragments.push(Packet {
            offset: packet.offset,
            header: h.into(),
            payload: Some(Box::new(Layer::Opaque(OpaqueLayer {
                offset: packet.offset + header_len,
                tag: None,
                data: payload.slice(start..end),
            }))),
            trailer: Bytes::new(),
            fixups: Fixups::ALL,
        });
        start = end;
    }

    debug!(
        identification = ip.identification,
        mtu,
        fragments = fragments.len(),
        "fragmented IPv4 datagram"
    );
    Ok(fragments)
}

/// Reassemble `fragments` (any order) into one datagram.
///
/// The payload is decoded again with `dissector` from the protocol of the
/// first fragment.
pub fn defragment(fragments: &[Packet], dissector: &Dissector) -> Result<Packet, FragmentError> {
    if fragments.is_empty() {
        return Err(FragmentError::Empty);
    }
    let mut parts = fragments
        .iter()
        .enumerate()
        .map(|(i, p)| Ok((header(p, i)?, p)))
        .collect::<Result<Vec<_>, FragmentError>>()?;
    parts.sort_by_key(|(ip, _)| ip.fragment_offset);

    let offsets: Vec<u32> = parts.iter().map(|(ip, _)| ip.fragment_offset as u32).collect();
    let (first, first_packet) = parts[0];
    let (last, last_packet) = parts[parts.len() - 1];

    if parts.iter().any(|(ip, _)| !same_datagram(first, ip)) {
        return Err(FragmentError::Inconsistent {
            reason: "fragments belong to different datagrams".to_string(),
            offsets,
        });
    }

    let last_len = last
        .declared_payload_len()
        .filter(|_| last.total_length != 0)
        .unwrap_or_else(|| last_packet.payload_len());
    let length = last.fragment_offset as i64 * 8 + last_len as i64;
    if length <= 0 {
        debug!(length, ?offsets, "cannot defragment");
        return Err(FragmentError::NonPositiveLength { length, offsets });
    }

    let pieces: Vec<(usize, Bytes)> = parts
        .iter()
        .map(|(ip, p)| (ip.fragment_offset as usize * 8, Bytes::from(p.payload_bytes(None))))
        .collect();
    let data = assemble(&pieces, length as usize, &offsets).map_err(|e| {
        debug!(identification = first.identification, error = %e, "cannot defragment");
        e
    })?;

    let header_len = first.header_len();
    let total_length = u16::try_from(header_len + data.len()).map_err(|_| {
        FragmentError::Inconsistent {
            reason: format!("reassembled datagram of {} bytes exceeds 65535", header_len + data.len()),
            offsets: offsets.clone(),
        }
    })?;

    let mut ip = first.clone();
    ip.flags &= !Ipv4Header::FLAG_MORE_FRAGMENTS;
    ip.fragment_offset = 0;
    ip.total_length = total_length;

    let payload_offset = first_packet.offset + header_len;
    let payload = dissector.decode_at(&[ip.protocol], data, payload_offset)?;

    debug!(
        identification = ip.identification,
        fragments = parts.len(),
        len = total_length,
        "reassembled IPv4 datagram"
    );
    Ok(Packet {
        offset: first_packet.offset,
        header: ip.into(),
        payload: Some(Box::new(payload)),
        trailer: Bytes::new(),
        fixups: Fixups::ALL,
    })
}

fn same_datagram(a: &Ipv4Header, b: &Ipv4Header) -> bool {
    a.identification == b.identification
        && a.source == b.source
        && a.destination == b.destination
        && a.protocol == b.protocol
}
