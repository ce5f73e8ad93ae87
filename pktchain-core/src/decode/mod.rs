//! Decoders and the tables that map protocol tags to them.
//!
//! A [`Decoder`] parses exactly one layer: it either returns the header it
//! found (plus the candidate tags for the bytes that follow) or a
//! [`DecodeError`] explaining why the bytes are not a valid header of its
//! kind. Which decoder runs for a given tag is decided by a
//! [`DecoderTable`]:
//!
//! - [`FixedDecoderTable`] - compiled mapping, built once
//! - [`ConfiguredDecoderTable`] - mapping read from properties text, resolved
//!   lazily and cached
//!
//! The [`Dissector`] drives the per-layer state machine on top of a table.

pub mod chain;
pub mod config;
pub mod table;

pub use chain::{Dissector, MAX_DEPTH};
pub use config::{ConfigLoader, ConfiguredDecoderTable, DecoderCatalog, DecoderConfig};
pub use table::{DecoderTable, FixedDecoderTable, Resolved};

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use smallvec::SmallVec;

use crate::error::DecodeError;
use crate::protocol::{
    ArpDecoder, BsdLoopbackDecoder, EthernetDecoder, GtpDecoder, Header, HeartbeatDecoder,
    Icmpv4Decoder, Icmpv6Decoder, Ipv4Decoder, Ipv6Decoder, Ipv6ExtensionDecoder,
    Ipv6ExtensionKind, Ipv6FragmentDecoder, LinuxSllDecoder, SctpDecoder, TcpDecoder,
    TlsRecordDecoder, UdpDecoder, UnknownDecoder, VlanDecoder,
};
use crate::tag::{ProtocolTag, TagCatalog, TagKind};

/// Candidate tags for one layer, in trial order. Almost always one or two.
pub type Candidates = SmallVec<[ProtocolTag; 2]>;

/// What a decoder made of its bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A well-formed header
    Header(DecodedHeader),
    /// Not interpreted; the bytes become an opaque layer
    Opaque,
}

/// A parsed header and what follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedHeader {
    pub header: Header,
    /// Tags to try for the next layer; `None` keeps the payload opaque.
    pub next: Option<Candidates>,
    /// Bytes after the header that belong to the payload, when the header
    /// declares a length. Anything beyond becomes the layer's trailer.
    pub payload_len: Option<usize>,
}

impl DecodedHeader {
    pub fn new(header: impl Into<Header>) -> Self {
        Self {
            header: header.into(),
            next: None,
            payload_len: None,
        }
    }

    pub fn next(mut self, tag: ProtocolTag) -> Self {
        self.next.get_or_insert_with(Candidates::new).push(tag);
        self
    }

    pub fn payload_len(mut self, len: usize) -> Self {
        self.payload_len = Some(len);
        self
    }
}

impl From<DecodedHeader> for Decoded {
    fn from(header: DecodedHeader) -> Self {
        Decoded::Header(header)
    }
}

/// Shared state available to decoders.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    tags: &'a TagCatalog,
}

impl<'a> DecodeContext<'a> {
    pub fn new(tags: &'a TagCatalog) -> Self {
        Self { tags }
    }

    pub fn tags(&self) -> &'a TagCatalog {
        self.tags
    }

    /// Look up a tag for a header field. A closed kind rejecting the value
    /// is a structural error of `protocol`.
    pub fn tag(
        &self,
        protocol: &'static str,
        kind: TagKind,
        value: u32,
    ) -> Result<ProtocolTag, DecodeError> {
        self.tags
            .lookup(kind, value)
            .map_err(|source| DecodeError::Tag { protocol, source })
    }
}

/// Core trait every decoder implements.
pub trait Decoder: Send + Sync + fmt::Debug {
    /// Unique identifier, also used in decoder configuration (e.g. "ipv4").
    fn name(&self) -> &'static str;

    /// Human-readable display name.
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// True if the decoder accepts any input. Only total decoders may be
    /// used as fallbacks.
    fn is_total(&self) -> bool {
        false
    }

    /// Decode one layer from the start of `data`.
    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError>;
}

/// Enum of all built-in decoders.
///
/// Static dispatch for the common case; custom decoders go through
/// [`DecoderHandle::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinDecoder {
    Ethernet(EthernetDecoder),
    LinuxSll(LinuxSllDecoder),
    BsdLoopback(BsdLoopbackDecoder),
    Vlan(VlanDecoder),
    Arp(ArpDecoder),
    Ipv4(Ipv4Decoder),
    Ipv6(Ipv6Decoder),
    Ipv6Extension(Ipv6ExtensionDecoder),
    Ipv6Fragment(Ipv6FragmentDecoder),
    Tcp(TcpDecoder),
    Udp(UdpDecoder),
    Icmpv4(Icmpv4Decoder),
    Icmpv6(Icmpv6Decoder),
    Sctp(SctpDecoder),
    Gtp(GtpDecoder),
    TlsRecord(TlsRecordDecoder),
    Heartbeat(HeartbeatDecoder),
    Unknown(UnknownDecoder),
}

/// Macro to delegate Decoder trait methods to inner types.
macro_rules! delegate_decoder {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            BuiltinDecoder::Ethernet(d) => d.$method($($arg),*),
            BuiltinDecoder::LinuxSll(d) => d.$method($($arg),*),
            BuiltinDecoder::BsdLoopback(d) => d.$method($($arg),*),
            BuiltinDecoder::Vlan(d) => d.$method($($arg),*),
            BuiltinDecoder::Arp(d) => d.$method($($arg),*),
            BuiltinDecoder::Ipv4(d) => d.$method($($arg),*),
            BuiltinDecoder::Ipv6(d) => d.$method($($arg),*),
            BuiltinDecoder::Ipv6Extension(d) => d.$method($($arg),*),
            BuiltinDecoder::Ipv6Fragment(d) => d.$method($($arg),*),
            BuiltinDecoder::Tcp(d) => d.$method($($arg),*),
            BuiltinDecoder::Udp(d) => d.$method($($arg),*),
            BuiltinDecoder::Icmpv4(d) => d.$method($($arg),*),
            BuiltinDecoder::Icmpv6(d) => d.$method($($arg),*),
            BuiltinDecoder::Sctp(d) => d.$method($($arg),*),
            BuiltinDecoder::Gtp(d) => d.$method($($arg),*),
            BuiltinDecoder::TlsRecord(d) => d.$method($($arg),*),
            BuiltinDecoder::Heartbeat(d) => d.$method($($arg),*),
            BuiltinDecoder::Unknown(d) => d.$method($($arg),*),
        }
    };
}

impl Decoder for BuiltinDecoder {
    #[inline]
    fn name(&self) -> &'static str {
        delegate_decoder!(self, name)
    }

    #[inline]
    fn display_name(&self) -> &'static str {
        delegate_decoder!(self, display_name)
    }

    #[inline]
    fn is_total(&self) -> bool {
        delegate_decoder!(self, is_total)
    }

    #[inline]
    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        delegate_decoder!(self, decode, data, ctx)
    }
}

impl BuiltinDecoder {
    /// Every built-in decoder.
    pub fn all() -> [BuiltinDecoder; 20] {
        [
            EthernetDecoder.into(),
            LinuxSllDecoder.into(),
            BsdLoopbackDecoder.into(),
            VlanDecoder.into(),
            ArpDecoder.into(),
            Ipv4Decoder.into(),
            Ipv6Decoder.into(),
            Ipv6ExtensionDecoder::new(Ipv6ExtensionKind::HopByHop).into(),
            Ipv6ExtensionDecoder::new(Ipv6ExtensionKind::Routing).into(),
            Ipv6ExtensionDecoder::new(Ipv6ExtensionKind::DestinationOptions).into(),
            Ipv6FragmentDecoder.into(),
            TcpDecoder.into(),
            UdpDecoder.into(),
            Icmpv4Decoder.into(),
            Icmpv6Decoder.into(),
            SctpDecoder.into(),
            GtpDecoder.into(),
            TlsRecordDecoder.into(),
            HeartbeatDecoder.into(),
            UnknownDecoder.into(),
        ]
    }

    /// Find a built-in decoder by its [`Decoder::name`].
    pub fn by_name(name: &str) -> Option<BuiltinDecoder> {
        Self::all().into_iter().find(|d| d.name() == name)
    }
}

macro_rules! builtin_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for BuiltinDecoder {
                fn from(d: $ty) -> Self {
                    BuiltinDecoder::$variant(d)
                }
            }
        )*
    };
}

builtin_from! {
    Ethernet(EthernetDecoder),
    LinuxSll(LinuxSllDecoder),
    BsdLoopback(BsdLoopbackDecoder),
    Vlan(VlanDecoder),
    Arp(ArpDecoder),
    Ipv4(Ipv4Decoder),
    Ipv6(Ipv6Decoder),
    Ipv6Extension(Ipv6ExtensionDecoder),
    Ipv6Fragment(Ipv6FragmentDecoder),
    Tcp(TcpDecoder),
    Udp(UdpDecoder),
    Icmpv4(Icmpv4Decoder),
    Icmpv6(Icmpv6Decoder),
    Sctp(SctpDecoder),
    Gtp(GtpDecoder),
    TlsRecord(TlsRecordDecoder),
    Heartbeat(HeartbeatDecoder),
    Unknown(UnknownDecoder),
}

/// A resolved decoder: built-in or user supplied.
#[derive(Debug, Clone)]
pub enum DecoderHandle {
    Builtin(BuiltinDecoder),
    Custom(Arc<dyn Decoder>),
}

impl Decoder for DecoderHandle {
    fn name(&self) -> &'static str {
        match self {
            DecoderHandle::Builtin(d) => d.name(),
            DecoderHandle::Custom(d) => d.name(),
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            DecoderHandle::Builtin(d) => d.display_name(),
            DecoderHandle::Custom(d) => d.display_name(),
        }
    }

    fn is_total(&self) -> bool {
        match self {
            DecoderHandle::Builtin(d) => d.is_total(),
            DecoderHandle::Custom(d) => d.is_total(),
        }
    }

    #[inline]
    fn decode(&self, data: &Bytes, ctx: &DecodeContext<'_>) -> Result<Decoded, DecodeError> {
        match self {
            DecoderHandle::Builtin(d) => d.decode(data, ctx),
            DecoderHandle::Custom(d) => d.decode(data, ctx),
        }
    }
}

impl From<BuiltinDecoder> for DecoderHandle {
    fn from(d: BuiltinDecoder) -> Self {
        DecoderHandle::Builtin(d)
    }
}
