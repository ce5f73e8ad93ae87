//! Decoded packet chains.
//!
//! A decoded frame is a singly-linked chain of [`Layer`]s. Each layer is
//! one of:
//!
//! - [`Layer::Packet`] - a parsed header, an optional payload layer and an
//!   optional trailer (bytes after the payload the header did not claim,
//!   e.g. Ethernet padding)
//! - [`Layer::Opaque`] - bytes no decoder interpreted
//! - [`Layer::Illegal`] - bytes a decoder rejected, with the reason
//!
//! Every layer keeps its bytes as [`Bytes`] views into the original frame.
//! For any chain, `layer.len()` equals the sum of all header, opaque,
//! illegal and trailer lengths below it.

mod serialize;
mod truncate;

pub use serialize::{Fixups, IpContext};

use bytes::Bytes;

use crate::error::DecodeError;
use crate::protocol::{Header, HeaderKind};
use crate::tag::ProtocolTag;

/// One node of a decoded chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Packet(Packet),
    Opaque(OpaqueLayer),
    Illegal(IllegalLayer),
}

/// A successfully decoded header and what follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Offset of the header within the original frame.
    pub offset: usize,
    pub header: Header,
    pub payload: Option<Box<Layer>>,
    /// Bytes after the payload that the header's length fields exclude.
    pub trailer: Bytes,
    /// Which stored fields serialization recomputes.
    pub fixups: Fixups,
}

/// Bytes no decoder interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueLayer {
    pub offset: usize,
    /// Tag that led here, if the bytes were dispatched at all.
    pub tag: Option<ProtocolTag>,
    pub data: Bytes,
}

/// Bytes a decoder rejected as structurally invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct IllegalLayer {
    pub offset: usize,
    /// Tag of the first candidate whose decoder rejected the bytes.
    pub tag: ProtocolTag,
    pub data: Bytes,
    pub error: DecodeError,
}

impl Packet {
    pub fn new(header: impl Into<Header>) -> Self {
        Self {
            offset: 0,
            header: header.into(),
            payload: None,
            trailer: Bytes::new(),
            fixups: Fixups::NONE,
        }
    }

    pub fn with_payload(mut self, payload: Layer) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    pub fn with_fixups(mut self, fixups: Fixups) -> Self {
        self.fixups = fixups;
        self
    }

    /// Header plus payload plus trailer.
    pub fn len(&self) -> usize {
        self.header.len() + self.payload_len() + self.trailer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, |p| p.len())
    }

    pub fn payload(&self) -> Option<&Layer> {
        self.payload.as_deref()
    }
}

impl OpaqueLayer {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            offset: 0,
            tag: None,
            data: data.into(),
        }
    }
}

impl From<Packet> for Layer {
    fn from(packet: Packet) -> Self {
        Layer::Packet(packet)
    }
}

impl From<OpaqueLayer> for Layer {
    fn from(opaque: OpaqueLayer) -> Self {
        Layer::Opaque(opaque)
    }
}

impl Layer {
    /// Opaque layer over `data`.
    pub fn opaque(data: impl Into<Bytes>) -> Self {
        Layer::Opaque(OpaqueLayer::new(data))
    }

    /// Total bytes covered by this layer and everything below it.
    pub fn len(&self) -> usize {
        match self {
            Layer::Packet(p) => p.len(),
            Layer::Opaque(o) => o.data.len(),
            Layer::Illegal(i) => i.data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn offset(&self) -> usize {
        match self {
            Layer::Packet(p) => p.offset,
            Layer::Opaque(o) => o.offset,
            Layer::Illegal(i) => i.offset,
        }
    }

    /// Short name for display, e.g. "ipv4", "opaque", "illegal".
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Packet(p) => p.header.name(),
            Layer::Opaque(_) => "opaque",
            Layer::Illegal(_) => "illegal",
        }
    }

    pub fn as_packet(&self) -> Option<&Packet> {
        match self {
            Layer::Packet(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_illegal(&self) -> bool {
        matches!(self, Layer::Illegal(_))
    }

    /// The layer below this one.
    pub fn next(&self) -> Option<&Layer> {
        match self {
            Layer::Packet(p) => p.payload(),
            _ => None,
        }
    }

    /// Walk the chain from this layer down.
    pub fn iter(&self) -> Layers<'_> {
        Layers { next: Some(self) }
    }

    /// The last layer of the chain.
    pub fn terminal(&self) -> &Layer {
        let mut layer = self;
        while let Some(next) = layer.next() {
            layer = next;
        }
        layer
    }

    /// First decoded packet of the given kind.
    pub fn find(&self, kind: HeaderKind) -> Option<&Packet> {
        self.iter()
            .filter_map(Layer::as_packet)
            .find(|p| p.header.kind() == kind)
    }

    /// Whether the chain holds a decoded packet of the given kind.
    pub fn contains(&self, kind: HeaderKind) -> bool {
        self.find(kind).is_some()
    }

    /// Number of layers in the chain.
    pub fn depth(&self) -> usize {
        self.iter().count()
    }
}

/// Iterator over the layers of a chain, outermost first.
#[derive(Debug, Clone)]
pub struct Layers<'a> {
    next: Option<&'a Layer>,
}

impl<'a> Iterator for Layers<'a> {
    type Item = &'a Layer;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next();
        Some(current)
    }
}

impl<'a> IntoIterator for &'a Layer {
    type Item = &'a Layer;
    type IntoIter = Layers<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
