//! Tag-to-decoder tables.

use std::collections::HashMap;
use std::fmt;

use super::{BuiltinDecoder, DecoderHandle};
use crate::error::ConfigError;
use crate::protocol::{
    ArpDecoder, BsdLoopbackDecoder, EthernetDecoder, GtpDecoder, HeartbeatDecoder, Icmpv4Decoder,
    Icmpv6Decoder, Ipv4Decoder, Ipv6Decoder, Ipv6ExtensionDecoder, Ipv6ExtensionKind,
    Ipv6FragmentDecoder, LinuxSllDecoder, SctpDecoder, TcpDecoder, TlsRecordDecoder, UdpDecoder,
    UnknownDecoder, VlanDecoder,
};
use crate::tag::{
    ethertype, ip_number, link_type, port, protocol_family, tls_content_type, ProtocolTag,
    TagKind,
};

/// Outcome of a table lookup.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// The tag has a specific decoder
    Mapped(DecoderHandle),
    /// No mapping; the table's fallback decoder applies
    Fallback(DecoderHandle),
}

impl Resolved {
    pub fn handle(&self) -> &DecoderHandle {
        match self {
            Resolved::Mapped(h) | Resolved::Fallback(h) => h,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolved::Fallback(_))
    }
}

/// Maps a protocol tag to the decoder for the bytes it announces.
///
/// Resolution is total: a tag without a mapping resolves to the fallback
/// decoder, never to "nothing". The only failure is a misconfigured table.
pub trait DecoderTable: Send + Sync + fmt::Debug {
    fn resolve(&self, tag: &ProtocolTag) -> Result<Resolved, ConfigError>;
}

/// Compiled mapping, built once and queried without locking.
#[derive(Debug, Clone)]
pub struct FixedDecoderTable {
    map: HashMap<(TagKind, u32), BuiltinDecoder>,
    fallback: BuiltinDecoder,
}

impl Default for FixedDecoderTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedDecoderTable {
    /// Table with no mappings and the `unknown` fallback.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            fallback: UnknownDecoder.into(),
        }
    }

    /// Add or replace a mapping.
    pub fn with(mut self, kind: TagKind, value: u32, decoder: impl Into<BuiltinDecoder>) -> Self {
        self.map.insert((kind, value), decoder.into());
        self
    }

    /// The built-in dispatch table.
    pub fn builtin() -> Self {
        let hop_by_hop = Ipv6ExtensionDecoder::new(Ipv6ExtensionKind::HopByHop);
        let routing = Ipv6ExtensionDecoder::new(Ipv6ExtensionKind::Routing);
        let destination = Ipv6ExtensionDecoder::new(Ipv6ExtensionKind::DestinationOptions);

        let mut table = Self::new()
            // Link layer
            .with(TagKind::DataLinkType, link_type::NULL as u32, BsdLoopbackDecoder)
            .with(TagKind::DataLinkType, link_type::ETHERNET as u32, EthernetDecoder)
            .with(TagKind::DataLinkType, link_type::LINUX_SLL as u32, LinuxSllDecoder)
            .with(TagKind::DataLinkType, link_type::IPV4 as u32, Ipv4Decoder)
            .with(TagKind::DataLinkType, link_type::IPV6 as u32, Ipv6Decoder)
            .with(TagKind::ProtocolFamily, protocol_family::INET, Ipv4Decoder)
            .with(TagKind::ProtocolFamily, protocol_family::INET6_BSD, Ipv6Decoder)
            .with(TagKind::ProtocolFamily, protocol_family::INET6_FREEBSD, Ipv6Decoder)
            .with(TagKind::ProtocolFamily, protocol_family::INET6_DARWIN, Ipv6Decoder)
            // EtherType
            .with(TagKind::EtherType, ethertype::IPV4 as u32, Ipv4Decoder)
            .with(TagKind::EtherType, ethertype::ARP as u32, ArpDecoder)
            .with(TagKind::EtherType, ethertype::VLAN as u32, VlanDecoder)
            .with(TagKind::EtherType, ethertype::QINQ as u32, VlanDecoder)
            .with(TagKind::EtherType, ethertype::QINQ_LEGACY as u32, VlanDecoder)
            .with(TagKind::EtherType, ethertype::IPV6 as u32, Ipv6Decoder)
            // IP protocol numbers; 59 (no next header) stays unmapped
            .with(TagKind::IpNumber, ip_number::HOPOPT as u32, hop_by_hop)
            .with(TagKind::IpNumber, ip_number::ICMP as u32, Icmpv4Decoder)
            .with(TagKind::IpNumber, ip_number::IPIP as u32, Ipv4Decoder)
            .with(TagKind::IpNumber, ip_number::TCP as u32, TcpDecoder)
            .with(TagKind::IpNumber, ip_number::UDP as u32, UdpDecoder)
            .with(TagKind::IpNumber, ip_number::IPV6 as u32, Ipv6Decoder)
            .with(TagKind::IpNumber, ip_number::IPV6_ROUTE as u32, routing)
            .with(TagKind::IpNumber, ip_number::IPV6_FRAG as u32, Ipv6FragmentDecoder)
            .with(TagKind::IpNumber, ip_number::ICMPV6 as u32, Icmpv6Decoder)
            .with(TagKind::IpNumber, ip_number::IPV6_OPTS as u32, destination)
            .with(TagKind::IpNumber, ip_number::SCTP as u32, SctpDecoder)
            // Ports and application layer
            .with(TagKind::UdpPort, port::GTP_U as u32, GtpDecoder)
            .with(TagKind::TlsContentType, tls_content_type::HEARTBEAT as u32, HeartbeatDecoder);
        for tls_port in [port::HTTPS, port::IMAPS, port::POP3S, port::HTTPS_ALT] {
            table = table.with(TagKind::TcpPort, tls_port as u32, TlsRecordDecoder);
        }
        table
    }

    /// Specific decoder for a (kind, value) pair, if mapped.
    pub fn get(&self, kind: TagKind, value: u32) -> Option<BuiltinDecoder> {
        self.map.get(&(kind, value)).copied()
    }

    pub fn fallback(&self) -> BuiltinDecoder {
        self.fallback
    }

    /// All mappings, sorted by kind then value.
    pub fn entries(&self) -> Vec<(TagKind, u32, BuiltinDecoder)> {
        let mut entries: Vec<_> = self.map.iter().map(|(&(k, v), &d)| (k, v, d)).collect();
        entries.sort_by_key(|&(kind, value, _)| (kind, value));
        entries
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl DecoderTable for FixedDecoderTable {
    #[inline]
    fn resolve(&self, tag: &ProtocolTag) -> Result<Resolved, ConfigError> {
        Ok(match self.get(tag.kind(), tag.value()) {
            Some(decoder) => Resolved::Mapped(decoder.into()),
            None => Resolved::Fallback(self.fallback.into()),
        })
    }
}
