//! Cutting a chain down to a byte budget.
//!
//! Used when a packet is quoted inside an error message (ICMP "original
//! datagram"): headers are kept from the outside in while they fit, and
//! everything from the first header that does not fit is replaced by the
//! raw bytes that fill the remaining budget. Every kept packet is marked
//! for length and checksum recomputation.

use bytes::Bytes;

use super::{Fixups, Layer, OpaqueLayer, Packet};

impl Layer {
    /// Truncate to at most `target` bytes.
    ///
    /// A chain already within budget is returned unchanged.
    pub fn truncate_to(&self, target: usize) -> Layer {
        if self.len() <= target {
            return self.clone();
        }
        let wire = Bytes::from(self.to_bytes());
        cut(self, &wire, 0, target)
    }

    /// Truncate to the largest multiple of 8 not above `target`.
    ///
    /// IPv6 extension header options must end on an 8-byte boundary.
    pub fn truncate_aligned(&self, target: usize) -> Layer {
        self.truncate_to(target & !7)
    }
}

fn cut(layer: &Layer, wire: &Bytes, consumed: usize, budget: usize) -> Layer {
    if layer.len() <= budget {
        return layer.clone();
    }
    match layer {
        Layer::Packet(p) if p.header.len() <= budget => {
            Layer::Packet(cut_packet(p, wire, consumed, budget))
        }
        _ => Layer::Opaque(OpaqueLayer {
            offset: layer.offset(),
            tag: None,
            data: wire.slice(consumed..consumed + budget),
        }),
    }
}

fn cut_packet(packet: &Packet, wire: &Bytes, consumed: usize, budget: usize) -> Packet {
    let header_len = packet.header.len();
    let remaining = budget - header_len;
    let payload_len = packet.payload_len();

    let (payload, trailer) = if payload_len <= remaining {
        // Only the trailer is cut
        (packet.payload.clone(), packet.trailer.slice(..remaining - payload_len))
    } else {
        let inner = packet
            .payload()
            .map(|p| Box::new(cut(p, wire, consumed + header_len, remaining)));
        (inner, Bytes::new())
    };

    Packet {
        offset: packet.offset,
        header: packet.header.clone(),
        payload,
        trailer,
        fixups: Fixups::ALL,
    }
}
