//! Protocol tags: named numeric values that identify the next layer.
//!
//! A [`ProtocolTag`] is a value of some [`TagKind`] (EtherType, IP protocol
//! number, UDP port, ...) plus a decorative name. Two tags are equal when
//! their kind and numeric value are equal; the name never takes part in
//! comparisons.
//!
//! Known tags live in a [`TagCatalog`], built once and passed around by
//! reference. Unknown values are synthesized on lookup with the name
//! `"Unknown"` and never cached, unless the kind's [`UnknownPolicy`] is
//! [`Reject`](UnknownPolicy::Reject), in which case lookup fails.

mod known;
mod registry;

pub use known::{
    arp_operation, ethertype, gtp_message_type, heartbeat_message_type, icmpv4_type, icmpv6_type,
    ip_number, ipv4_option_type, link_type, port, protocol_family, tcp_option_kind,
    tls_content_type,
};
pub use registry::{TagCatalog, TagRegistry};

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Name given to synthesized tags.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A numeric namespace used to classify protocol headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
    /// pcap LINKTYPE_* values
    DataLinkType,
    /// BSD loopback address family
    ProtocolFamily,
    EtherType,
    ArpOperation,
    /// IP protocol number / IPv6 next header
    IpNumber,
    Ipv4OptionType,
    TcpOptionKind,
    TcpPort,
    UdpPort,
    SctpPort,
    IcmpV4Type,
    IcmpV6Type,
    GtpV1MessageType,
    TlsContentType,
    HeartbeatMessageType,
}

impl TagKind {
    /// Every kind, in declaration order.
    pub const ALL: [TagKind; 15] = [
        TagKind::DataLinkType,
        TagKind::ProtocolFamily,
        TagKind::EtherType,
        TagKind::ArpOperation,
        TagKind::IpNumber,
        TagKind::Ipv4OptionType,
        TagKind::TcpOptionKind,
        TagKind::TcpPort,
        TagKind::UdpPort,
        TagKind::SctpPort,
        TagKind::IcmpV4Type,
        TagKind::IcmpV6Type,
        TagKind::GtpV1MessageType,
        TagKind::TlsContentType,
        TagKind::HeartbeatMessageType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::DataLinkType => "DataLinkType",
            TagKind::ProtocolFamily => "ProtocolFamily",
            TagKind::EtherType => "EtherType",
            TagKind::ArpOperation => "ArpOperation",
            TagKind::IpNumber => "IpNumber",
            TagKind::Ipv4OptionType => "IpV4OptionType",
            TagKind::TcpOptionKind => "TcpOptionKind",
            TagKind::TcpPort => "TcpPort",
            TagKind::UdpPort => "UdpPort",
            TagKind::SctpPort => "SctpPort",
            TagKind::IcmpV4Type => "IcmpV4Type",
            TagKind::IcmpV6Type => "IcmpV6Type",
            TagKind::GtpV1MessageType => "GtpV1MessageType",
            TagKind::TlsContentType => "TlsContentType",
            TagKind::HeartbeatMessageType => "HeartbeatMessageType",
        }
    }

    /// Width of the field carrying this kind, in bytes.
    pub fn width(&self) -> usize {
        match self {
            TagKind::ProtocolFamily => 4,
            TagKind::DataLinkType
            | TagKind::EtherType
            | TagKind::ArpOperation
            | TagKind::TcpPort
            | TagKind::UdpPort
            | TagKind::SctpPort => 2,
            TagKind::IpNumber
            | TagKind::Ipv4OptionType
            | TagKind::TcpOptionKind
            | TagKind::IcmpV4Type
            | TagKind::IcmpV6Type
            | TagKind::GtpV1MessageType
            | TagKind::TlsContentType
            | TagKind::HeartbeatMessageType => 1,
        }
    }

    /// Largest value representable in this kind's width.
    pub fn max_value(&self) -> u32 {
        match self.width() {
            1 => u8::MAX as u32,
            2 => u16::MAX as u32,
            _ => u32::MAX,
        }
    }

    /// Policy used by [`TagCatalog::builtin`].
    ///
    /// TLS content types and heartbeat message types are fully assigned by
    /// their RFCs, so any other value is rejected.
    pub fn default_policy(&self) -> UnknownPolicy {
        match self {
            TagKind::TlsContentType | TagKind::HeartbeatMessageType => UnknownPolicy::Reject,
            _ => UnknownPolicy::Synthesize,
        }
    }

    fn format_value(&self, value: u32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::EtherType => write!(f, "0x{value:04x}"),
            _ => write!(f, "{value}"),
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or(())
    }
}

/// What a registry does with a value it has no name for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnknownPolicy {
    /// Build an `"Unknown"` tag on the fly
    Synthesize,
    /// Fail with [`TagError::Unknown`](crate::error::TagError::Unknown)
    Reject,
}

/// A named protocol number of a particular [`TagKind`].
#[derive(Debug, Clone, Copy)]
pub struct ProtocolTag {
    kind: TagKind,
    value: u32,
    name: &'static str,
    known: bool,
}

impl ProtocolTag {
    pub const fn new(kind: TagKind, value: u32, name: &'static str) -> Self {
        Self {
            kind,
            value,
            name,
            known: true,
        }
    }

    /// Tag for a value outside the catalog.
    pub const fn unknown(kind: TagKind, value: u32) -> Self {
        Self {
            kind,
            value,
            name: UNKNOWN_NAME,
            known: false,
        }
    }

    #[inline]
    pub fn kind(&self) -> TagKind {
        self.kind
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.value
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True for tags synthesized for a value the catalog has no name for.
    pub fn is_unknown(&self) -> bool {
        !self.known
    }
}

impl PartialEq for ProtocolTag {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

impl Eq for ProtocolTag {}

impl Hash for ProtocolTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.value.hash(state);
    }
}

impl PartialOrd for ProtocolTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProtocolTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.format_value(self.value, f)?;
        write!(f, " ({})", self.name)
    }
}
