//! IPv6 fragmentation (RFC 8200 section 4.5).
//!
//! The unfragmentable part is the IPv6 header plus any Hop-by-Hop and
//! Routing headers that directly follow it. A Fragment header is inserted
//! after it and everything below is split.

use bytes::Bytes;
use tracing::debug;

use super::{assemble, FragmentKey, Span};
use crate::decode::Dissector;
use crate::error::FragmentError;
use crate::packet::{Fixups, Layer, OpaqueLayer, Packet};
use crate::protocol::{
    Header, Ipv6ExtensionKind, Ipv6FragmentHeader, Ipv6Header, IPV6_FRAGMENT_HEADER_LEN,
};
use crate::tag::{ip_number, ProtocolTag, TagKind};

const FRAGMENT_TAG: ProtocolTag = ProtocolTag::new(
    TagKind::IpNumber,
    ip_number::IPV6_FRAG as u32,
    "Fragment Header for IPv6",
);

/// A fragment as found in a decoded chain.
struct Located<'a> {
    ip: &'a Ipv6Header,
    /// IPv6 packet and the extension headers above the Fragment header
    unfragmentable: Vec<&'a Packet>,
    fragment: &'a Packet,
    header: &'a Ipv6FragmentHeader,
}

impl Located<'_> {
    /// Fragment payload length declared by the IPv6 payload length field.
    fn declared_len(&self) -> Option<usize> {
        if self.ip.payload_length == 0 {
            return None;
        }
        let extensions: usize = self.unfragmentable[1..]
            .iter()
            .map(|p| p.header.len())
            .sum();
        (self.ip.payload_length as usize).checked_sub(extensions + IPV6_FRAGMENT_HEADER_LEN)
    }

    fn data(&self) -> Bytes {
        self.fragment
            .payload()
            .map(|l| Bytes::from(l.to_bytes()))
            .unwrap_or_default()
    }
}

/// Walk from the IPv6 header through extension headers to a Fragment header.
fn locate(packet: &Packet) -> Option<Located<'_>> {
    let ip = packet.header.as_ipv6()?;
    let mut unfragmentable = vec![packet];
    let mut current = packet;
    loop {
        let next = current.payload().and_then(Layer::as_packet)?;
        match &next.header {
            Header::Ipv6Fragment(header) => {
                return Some(Located {
                    ip,
                    unfragmentable,
                    fragment: next,
                    header,
                })
            }
            Header::Ipv6Extension(_) => {
                unfragmentable.push(next);
                current = next;
            }
            _ => return None,
        }
    }
}

fn located(packet: &Packet, index: usize) -> Result<Located<'_>, FragmentError> {
    locate(packet).ok_or(FragmentError::NotFragment {
        index,
        expected: "IPv6",
    })
}

pub(crate) fn key(packet: &Packet) -> Option<FragmentKey> {
    let found = locate(packet).filter(|f| !f.header.is_atomic())?;
    Some(FragmentKey::V6 {
        source: found.ip.source,
        destination: found.ip.destination,
        identification: found.header.identification,
    })
}

pub(crate) fn span(packet: &Packet) -> Option<Span> {
    let found = locate(packet)?;
    Some(Span {
        start: found.header.fragment_offset as usize * 8,
        len: found.fragment.payload_len(),
        more: found.header.more_fragments,
    })
}

fn next_header(header: &Header) -> Option<ProtocolTag> {
    match header {
        Header::Ipv6(h) => Some(h.next_header),
        Header::Ipv6Extension(h) => Some(h.next_header),
        _ => None,
    }
}

fn set_next_header(header: &mut Header, tag: ProtocolTag) {
    match header {
        Header::Ipv6(h) => h.next_header = tag,
        Header::Ipv6Extension(h) => h.next_header = tag,
        _ => {}
    }
}

/// Rebuild `top` and the extension headers below it on top of `inner`,
/// pointing the innermost header's next-header field at `next`.
fn wrap(top: &Packet, extensions: &[&Packet], next: ProtocolTag, inner: Layer, fixups: Fixups) -> Packet {
    let mut next = Some(next);
    let mut layer = inner;
    for p in extensions.iter().rev() {
        layer = Layer::Packet(rebuild(p, &mut next, layer, fixups));
    }
    rebuild(top, &mut next, layer, fixups)
}

fn rebuild(p: &Packet, next: &mut Option<ProtocolTag>, inner: Layer, fixups: Fixups) -> Packet {
    let mut header = p.header.clone();
    if let Some(tag) = next.take() {
        set_next_header(&mut header, tag);
    }
    Packet {
        offset: p.offset,
        header,
        payload: Some(Box::new(inner)),
        trailer: Bytes::new(),
        fixups,
    }
}

/// Split `packet` into fragments of at most `mtu` bytes, all carrying
/// `identification`.
///
/// A packet that already fits is returned as the only element.
pub fn fragment(packet: &Packet, mtu: usize, identification: u32) -> Result<Vec<Packet>, FragmentError> {
    if packet.header.as_ipv6().is_none() {
        return Err(FragmentError::NotFragment {
            index: 0,
            expected: "IPv6",
        });
    }
    if packet.len() <= mtu {
        return Ok(vec![packet.clone()]);
    }

    let mut unfragmentable = vec![packet];
    let mut rest = packet.payload();
    while let Some(Layer::Packet(p)) = rest {
        let routing_part = matches!(
            &p.header,
            Header::Ipv6Extension(e)
                if matches!(e.kind, Ipv6ExtensionKind::HopByHop | Ipv6ExtensionKind::Routing)
        );
        if !routing_part {
            break;
        }
        unfragmentable.push(p);
        rest = p.payload();
    }

    let prefix_len: usize = unfragmentable.iter().map(|p| p.header.len()).sum();
    let header_len = prefix_len + IPV6_FRAGMENT_HEADER_LEN;
    if mtu < header_len + 8 {
        return Err(FragmentError::MtuTooSmall { mtu, header_len });
    }

    let last = unfragmentable[unfragmentable.len() - 1];
    let upper = next_header(&last.header).unwrap_or(FRAGMENT_TAG);
    let ip = packet.header.ip_context();
    let payload = rest
        .map(|l| Bytes::from(l.to_bytes_within(ip, None)))
        .unwrap_or_default();

    let extensions = prefix_len - packet.header.len();
    let chunk = (mtu - header_len) & !7;
    let fragment_offset = packet.offset + prefix_len;
    let mut fragments = Vec::with_capacity(payload.len().div_ceil(chunk));
    let mut start = 0;
    while start < payload.len() {
        let end = (start + chunk).min(payload.len());
        let header = Ipv6FragmentHeader {
            next_header: upper,
            reserved: 0,
            fragment_offset: (start / 8) as u16,
            res: 0,
            more_fragments: end < payload.len(),
            identification,
        };
        let inner = Layer::Packet(Packet {
            offset: fragment_offset,
            header: header.into(),
            payload: Some(Box::new(Layer::Opaque(OpaqueLayer {
                offset: fragment_offset + IPV6_FRAGMENT_HEADER_LEN,
                tag: None,
                data: payload.slice(start..end),
            }))),
            trailer: Bytes::new(),
            fixups: Fixups::ALL,
        });
        let mut piece = wrap(packet, &unfragmentable[1..], FRAGMENT_TAG, inner, Fixups::ALL);
        if let Header::Ipv6(ip) = &mut piece.header {
            ip.payload_length = (extensions + IPV6_FRAGMENT_HEADER_LEN + end - start) as u16;
        }
        fragments.push(piece);
        start = end;
    }

    debug!(
        identification,
        mtu,
        fragments = fragments.len(),
        "fragmented IPv6 packet"
    );
    Ok(fragments)
}

/// Reassemble `fragments` (any order) into one packet.
///
/// The Fragment header is dropped; the header above it takes over its
/// next-header value and the payload is decoded again from there.
pub fn defragment(fragments: &[Packet], dissector: &Dissector) -> Result<Packet, FragmentError> {
    if fragments.is_empty() {
        return Err(FragmentError::Empty);
    }
    let mut parts = fragments
        .iter()
        .enumerate()
        .map(|(i, p)| located(p, i))
        .collect::<Result<Vec<_>, FragmentError>>()?;
    parts.sort_by_key(|f| f.header.fragment_offset);

    let offsets: Vec<u32> = parts.iter().map(|f| f.header.fragment_offset as u32).collect();
    let first = &parts[0];
    let last = &parts[parts.len() - 1];

    let foreign = parts.iter().any(|f| {
        f.header.identification != first.header.identification
            || f.ip.source != first.ip.source
            || f.ip.destination != first.ip.destination
    });
    if foreign {
        return Err(FragmentError::Inconsistent {
            reason: "fragments belong to different packets".to_string(),
            offsets,
        });
    }

    let last_len = last
        .declared_len()
        .unwrap_or_else(|| last.fragment.payload_len());
    let length = last.header.fragment_offset as i64 * 8 + last_len as i64;
    if length <= 0 {
        debug!(length, ?offsets, "cannot defragment");
        return Err(FragmentError::NonPositiveLength { length, offsets });
    }

    let pieces: Vec<(usize, Bytes)> = parts
        .iter()
        .map(|f| (f.header.fragment_offset as usize * 8, f.data()))
        .collect();
    let data = assemble(&pieces, length as usize, &offsets).map_err(|e| {
        debug!(identification = first.header.identification, error = %e, "cannot defragment");
        e
    })?;

    let extensions: usize = first.unfragmentable[1..]
        .iter()
        .map(|p| p.header.len())
        .sum();
    let payload_length = u16::try_from(extensions + data.len()).map_err(|_| {
        FragmentError::Inconsistent {
            reason: format!(
                "reassembled payload of {} bytes exceeds 65535",
                extensions + data.len()
            ),
            offsets: offsets.clone(),
        }
    })?;

    let upper = first.header.next_header;
    let inner = dissector.decode_at(&[upper], data, first.fragment.offset)?;
    let mut packet = wrap(
        first.unfragmentable[0],
        &first.unfragmentable[1..],
        upper,
        inner,
        Fixups::new(true, false),
    );
    if let Header::Ipv6(ip) = &mut packet.header {
        ip.payload_length = payload_length;
    }

    debug!(
        identification = first.header.identification,
        fragments = parts.len(),
        len = packet.len(),
        "reassembled IPv6 packet"
    );
    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::test_utils::{Ipv6Builder, UdpBuilder};
    use crate::protocol::HeaderKind;
    use crate::tag::link_type;

    fn decode(bytes: Vec<u8>) -> Packet {
        match Dissector::builtin().decode_frame(link_type::IPV6, bytes).unwrap() {
            Layer::Packet(p) => p,
            other => panic!("expected a packet, got {other:?}"),
        }
    }

    fn datagram(payload_len: usize) -> Packet {
        let payload: Vec<u8> = (0..payload_len).map(|i| (i * 7) as u8).collect();
        let udp = UdpBuilder::new().ports(4000, 5000).payload(payload).build();
        decode(
            Ipv6Builder::new()
                .next_header(ip_number::UDP)
                .payload(udp)
                .build(),
        )
    }

    /// IPv6 with an 8-byte Hop-by-Hop header (PadN) in front of UDP.
    fn with_hop_by_hop(payload_len: usize) -> Packet {
        let mut ext = vec![ip_number::UDP, 0x00, 0x01, 0x04, 0x00, 0x00, 0x00, 0x00];
        ext.extend(UdpBuilder::new().payload(vec![0x5a; payload_len]).build());
        decode(
            Ipv6Builder::new()
                .next_header(ip_number::HOPOPT)
                .payload(ext)
                .build(),
        )
    }

    fn round_trip(packet: &Packet, mtu: usize) -> Vec<Packet> {
        let fragments = fragment(packet, mtu, 0xcafe).unwrap();
        for f in &fragments {
            assert!(f.len() <= mtu, "fragment of {} bytes over {mtu}", f.len());
        }
        let reassembled = defragment(&fragments, &Dissector::builtin()).unwrap();
        assert_eq!(
            reassembled.to_bytes_with(Fixups::ALL),
            packet.to_bytes_with(Fixups::ALL)
        );
        fragments
    }

    #[test]
    fn test_payload_multiple_of_eight() {
        // 8 + 152 = 160 bytes after the 48 bytes of headers
        let packet = datagram(152);
        let fragments = round_trip(&packet, 88);
        assert_eq!(fragments.len(), 4);
        for f in &fragments {
            let found = locate(f).unwrap();
            assert_eq!(found.fragment.payload_len(), 40);
            assert_eq!(found.header.identification, 0xcafe);
        }
    }

    #[test]
    fn test_payload_needs_padding() {
        let packet = datagram(93);
        let fragments = round_trip(&packet, 88);
        let lens: Vec<usize> = fragments
            .iter()
            .map(|f| locate(f).unwrap().fragment.payload_len())
            .collect();
        assert_eq!(lens, vec![40, 40, 21]);
        assert!(!locate(&fragments[2]).unwrap().header.more_fragments);
    }

    #[test]
    fn test_one_byte_over_mtu() {
        let packet = datagram(100);
        let fragments = round_trip(&packet, packet.len() - 1);
        assert_eq!(fragments.len(), 2);
    }

    #[test]
    fn test_hop_by_hop_stays_unfragmentable() {
        let packet = with_hop_by_hop(120);
        let fragments = round_trip(&packet, 96);
        for f in &fragments {
            let chain = Layer::Packet(f.clone());
            let kinds: Vec<&str> = chain.iter().map(Layer::name).collect();
            assert_eq!(&kinds[..3], &["ipv6", "ipv6_hop_by_hop", "ipv6_fragment"]);
        }
    }

    #[test]
    fn test_decoded_fragments_reassemble() {
        // Serialize the fragments and decode them as captured frames
        let packet = datagram(200);
        let wire: Vec<Packet> = fragment(&packet, 120, 7)
            .unwrap()
            .iter()
            .map(|f| decode(f.to_bytes()))
            .collect();
        assert!(wire.iter().all(|f| key(f).is_some()));
        let reassembled = defragment(&wire, &Dissector::builtin()).unwrap();
        assert!(Layer::Packet(reassembled.clone()).contains(HeaderKind::Udp));
        assert_eq!(reassembled.header.as_ipv6().unwrap().next_header.value(), 17);
        assert_eq!(reassembled.to_bytes(), packet.to_bytes_with(Fixups::new(true, false)));
    }

    #[test]
    fn test_fragments_declare_their_own_length() {
        // 408 bytes after the IPv6 header, 152 per fragment
        let packet = datagram(400);
        let fragments = fragment(&packet, 200, 7).unwrap();
        let lengths: Vec<u16> = fragments
            .iter()
            .map(|f| f.header.as_ipv6().unwrap().payload_length)
            .collect();
        assert_eq!(lengths, vec![160, 160, 112]);

        let reassembled = defragment(&fragments, &Dissector::builtin()).unwrap();
        assert_eq!(reassembled.header.as_ipv6().unwrap().payload_length, 408);
        assert_eq!(reassembled.len(), packet.len());
    }

    #[test]
    fn test_fragments_with_extension_declare_their_own_length() {
        let packet = with_hop_by_hop(120);
        let fragments = fragment(&packet, 96, 3).unwrap();
        for f in &fragments {
            let declared = f.header.as_ipv6().unwrap().payload_length as usize;
            assert_eq!(declared, f.len() - 40);
        }
    }

    #[test]
    fn test_missing_middle_fragment() {
        let packet = datagram(112);
        let mut fragments = fragment(&packet, 88, 1).unwrap();
        assert_eq!(fragments.len(), 3);
        fragments.remove(1);
        assert!(matches!(
            defragment(&fragments, &Dissector::builtin()),
            Err(FragmentError::Inconsistent { .. })
        ));
    }

    #[test]
    fn test_mtu_too_small() {
        let packet = datagram(100);
        assert_eq!(
            fragment(&packet, 55, 1),
            Err(FragmentError::MtuTooSmall { mtu: 55, header_len: 48 })
        );
    }

    #[test]
    fn test_unfragmented_packet_rejected() {
        let packet = datagram(16);
        assert_eq!(
            defragment(&[packet], &Dissector::builtin()).unwrap_err(),
            FragmentError::NotFragment { index: 0, expected: "IPv6" }
        );
    }
}
