//! Built-in tag values.
//!
//! Only the values the built-in decoders dispatch on or name in their
//! headers are listed; this is not a full IANA catalog.

use super::TagKind;

/// pcap link-layer header types (LINKTYPE_*).
pub mod link_type {
    /// BSD loopback, host-order protocol family
    pub const NULL: u16 = 0;
    pub const ETHERNET: u16 = 1;
    /// DLT_RAW on most platforms
    pub const RAW_LEGACY: u16 = 12;
    /// DLT_RAW on OpenBSD
    pub const RAW_OPENBSD: u16 = 14;
    pub const RAW: u16 = 101;
    pub const LINUX_SLL: u16 = 113;
    pub const IPV4: u16 = 228;
    pub const IPV6: u16 = 229;
}

/// BSD loopback protocol families. IPv6 has a different value per OS.
pub mod protocol_family {
    pub const INET: u32 = 2;
    pub const INET6_BSD: u32 = 24;
    pub const INET6_FREEBSD: u32 = 28;
    pub const INET6_DARWIN: u32 = 30;
}

/// EtherType values.
pub mod ethertype {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
    pub const VLAN: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    pub const QINQ: u16 = 0x88A8;
    pub const QINQ_LEGACY: u16 = 0x9100;
    /// Values up to this are 802.3 length fields, not types
    pub const MAX_802_3_LENGTH: u16 = 1500;
}

pub mod arp_operation {
    pub const REQUEST: u16 = 1;
    pub const REPLY: u16 = 2;
}

/// IP protocol numbers, shared with the IPv6 next-header field.
pub mod ip_number {
    pub const HOPOPT: u8 = 0;
    pub const ICMP: u8 = 1;
    pub const IPIP: u8 = 4;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const IPV6: u8 = 41;
    pub const IPV6_ROUTE: u8 = 43;
    pub const IPV6_FRAG: u8 = 44;
    pub const GRE: u8 = 47;
    pub const ESP: u8 = 50;
    pub const AH: u8 = 51;
    pub const ICMPV6: u8 = 58;
    pub const IPV6_NONXT: u8 = 59;
    pub const IPV6_OPTS: u8 = 60;
    pub const SCTP: u8 = 132;
}

pub mod ipv4_option_type {
    pub const END_OF_OPTION_LIST: u8 = 0;
    pub const NO_OPERATION: u8 = 1;
    pub const RECORD_ROUTE: u8 = 7;
    pub const TIMESTAMP: u8 = 68;
    pub const LOOSE_SOURCE_ROUTE: u8 = 131;
    pub const STRICT_SOURCE_ROUTE: u8 = 137;
    pub const ROUTER_ALERT: u8 = 148;
}

pub mod tcp_option_kind {
    pub const END: u8 = 0;
    pub const NOP: u8 = 1;
    pub const MSS: u8 = 2;
    pub const WINDOW_SCALE: u8 = 3;
    pub const SACK_PERMITTED: u8 = 4;
    pub const SACK: u8 = 5;
    pub const TIMESTAMPS: u8 = 8;
}

/// Well-known TCP/UDP/SCTP ports the built-in tables dispatch on.
pub mod port {
    pub const DNS: u16 = 53;
    pub const HTTPS: u16 = 443;
    pub const IMAPS: u16 = 993;
    pub const POP3S: u16 = 995;
    pub const GTP_C: u16 = 2123;
    pub const GTP_U: u16 = 2152;
    pub const DIAMETER: u16 = 3868;
    pub const HTTPS_ALT: u16 = 8443;
}

pub mod icmpv4_type {
    pub const ECHO_REPLY: u8 = 0;
    pub const DESTINATION_UNREACHABLE: u8 = 3;
    pub const SOURCE_QUENCH: u8 = 4;
    pub const REDIRECT: u8 = 5;
    pub const ECHO_REQUEST: u8 = 8;
    pub const TIME_EXCEEDED: u8 = 11;
    pub const PARAMETER_PROBLEM: u8 = 12;
}

pub mod icmpv6_type {
    pub const DESTINATION_UNREACHABLE: u8 = 1;
    pub const PACKET_TOO_BIG: u8 = 2;
    pub const TIME_EXCEEDED: u8 = 3;
    pub const PARAMETER_PROBLEM: u8 = 4;
    pub const ECHO_REQUEST: u8 = 128;
    pub const ECHO_REPLY: u8 = 129;
    pub const NEIGHBOR_SOLICITATION: u8 = 135;
    pub const NEIGHBOR_ADVERTISEMENT: u8 = 136;
}

pub mod gtp_message_type {
    pub const ECHO_REQUEST: u8 = 1;
    pub const ECHO_RESPONSE: u8 = 2;
    pub const ERROR_INDICATION: u8 = 26;
    pub const END_MARKER: u8 = 254;
    pub const G_PDU: u8 = 255;
}

/// TLS record content types (RFC 8446, RFC 6520).
pub mod tls_content_type {
    pub const CHANGE_CIPHER_SPEC: u8 = 20;
    pub const ALERT: u8 = 21;
    pub const HANDSHAKE: u8 = 22;
    pub const APPLICATION_DATA: u8 = 23;
    pub const HEARTBEAT: u8 = 24;
}

pub mod heartbeat_message_type {
    pub const REQUEST: u8 = 1;
    pub const RESPONSE: u8 = 2;
}

/// (kind, value, name) triples interned by [`TagCatalog::builtin`](super::TagCatalog::builtin).
pub(super) const BUILTIN_TAGS: &[(TagKind, u32, &str)] = &[
    (TagKind::DataLinkType, link_type::NULL as u32, "NULL"),
    (TagKind::DataLinkType, link_type::ETHERNET as u32, "Ethernet"),
    (TagKind::DataLinkType, link_type::RAW_LEGACY as u32, "Raw IP"),
    (TagKind::DataLinkType, link_type::RAW_OPENBSD as u32, "Raw IP (OpenBSD)"),
    (TagKind::DataLinkType, link_type::RAW as u32, "Raw IP"),
    (TagKind::DataLinkType, link_type::LINUX_SLL as u32, "Linux cooked"),
    (TagKind::DataLinkType, link_type::IPV4 as u32, "IPv4"),
    (TagKind::DataLinkType, link_type::IPV6 as u32, "IPv6"),
    (TagKind::ProtocolFamily, protocol_family::INET, "AF_INET"),
    (TagKind::ProtocolFamily, protocol_family::INET6_BSD, "AF_INET6 (BSD)"),
    (TagKind::ProtocolFamily, protocol_family::INET6_FREEBSD, "AF_INET6 (FreeBSD)"),
    (TagKind::ProtocolFamily, protocol_family::INET6_DARWIN, "AF_INET6 (Darwin)"),
    (TagKind::EtherType, ethertype::IPV4 as u32, "IPv4"),
    (TagKind::EtherType, ethertype::ARP as u32, "ARP"),
    (TagKind::EtherType, ethertype::VLAN as u32, "IEEE 802.1Q VLAN-tagged frames"),
    (TagKind::EtherType, ethertype::IPV6 as u32, "IPv6"),
    (TagKind::EtherType, ethertype::QINQ as u32, "IEEE 802.1ad Provider Bridge"),
    (TagKind::EtherType, ethertype::QINQ_LEGACY as u32, "Q-in-Q"),
    (TagKind::ArpOperation, arp_operation::REQUEST as u32, "REQUEST"),
    (TagKind::ArpOperation, arp_operation::REPLY as u32, "REPLY"),
    (TagKind::IpNumber, ip_number::HOPOPT as u32, "IPv6 Hop-by-Hop Option"),
    (TagKind::IpNumber, ip_number::ICMP as u32, "ICMPv4"),
    (TagKind::IpNumber, ip_number::IPIP as u32, "IPv4"),
    (TagKind::IpNumber, ip_number::TCP as u32, "TCP"),
    (TagKind::IpNumber, ip_number::UDP as u32, "UDP"),
    (TagKind::IpNumber, ip_number::IPV6 as u32, "IPv6"),
    (TagKind::IpNumber, ip_number::IPV6_ROUTE as u32, "Routing Header for IPv6"),
    (TagKind::IpNumber, ip_number::IPV6_FRAG as u32, "Fragment Header for IPv6"),
    (TagKind::IpNumber, ip_number::GRE as u32, "GRE"),
    (TagKind::IpNumber, ip_number::ESP as u32, "ESP"),
    (TagKind::IpNumber, ip_number::AH as u32, "AH"),
    (TagKind::IpNumber, ip_number::ICMPV6 as u32, "ICMPv6"),
    (TagKind::IpNumber, ip_number::IPV6_NONXT as u32, "No Next Header for IPv6"),
    (TagKind::IpNumber, ip_number::IPV6_OPTS as u32, "Destination Options for IPv6"),
    (TagKind::IpNumber, ip_number::SCTP as u32, "SCTP"),
    (TagKind::Ipv4OptionType, ipv4_option_type::END_OF_OPTION_LIST as u32, "End of Option List"),
    (TagKind::Ipv4OptionType, ipv4_option_type::NO_OPERATION as u32, "No Operation"),
    (TagKind::Ipv4OptionType, ipv4_option_type::RECORD_ROUTE as u32, "Record Route"),
    (TagKind::Ipv4OptionType, ipv4_option_type::TIMESTAMP as u32, "Timestamp"),
    (TagKind::Ipv4OptionType, ipv4_option_type::LOOSE_SOURCE_ROUTE as u32, "Loose Source Route"),
    (TagKind::Ipv4OptionType, ipv4_option_type::STRICT_SOURCE_ROUTE as u32, "Strict Source Route"),
    (TagKind::Ipv4OptionType, ipv4_option_type::ROUTER_ALERT as u32, "Router Alert"),
    (TagKind::TcpOptionKind, tcp_option_kind::END as u32, "End of Option List"),
    (TagKind::TcpOptionKind, tcp_option_kind::NOP as u32, "No Operation"),
    (TagKind::TcpOptionKind, tcp_option_kind::MSS as u32, "Maximum Segment Size"),
    (TagKind::TcpOptionKind, tcp_option_kind::WINDOW_SCALE as u32, "Window Scale"),
    (TagKind::TcpOptionKind, tcp_option_kind::SACK_PERMITTED as u32, "SACK Permitted"),
    (TagKind::TcpOptionKind, tcp_option_kind::SACK as u32, "SACK"),
    (TagKind::TcpOptionKind, tcp_option_kind::TIMESTAMPS as u32, "Timestamps"),
    (TagKind::TcpPort, port::DNS as u32, "Domain"),
    (TagKind::TcpPort, port::HTTPS as u32, "HTTPS"),
    (TagKind::TcpPort, port::IMAPS as u32, "IMAPS"),
    (TagKind::TcpPort, port::POP3S as u32, "POP3S"),
    (TagKind::TcpPort, port::HTTPS_ALT as u32, "HTTPS Alternate"),
    (TagKind::UdpPort, port::DNS as u32, "Domain"),
    (TagKind::UdpPort, port::GTP_C as u32, "GTP-C"),
    (TagKind::UdpPort, port::GTP_U as u32, "GTP-U"),
    (TagKind::SctpPort, port::DIAMETER as u32, "Diameter"),
    (TagKind::IcmpV4Type, icmpv4_type::ECHO_REPLY as u32, "Echo Reply"),
    (TagKind::IcmpV4Type, icmpv4_type::DESTINATION_UNREACHABLE as u32, "Destination Unreachable"),
    (TagKind::IcmpV4Type, icmpv4_type::SOURCE_QUENCH as u32, "Source Quench"),
    (TagKind::IcmpV4Type, icmpv4_type::REDIRECT as u32, "Redirect"),
    (TagKind::IcmpV4Type, icmpv4_type::ECHO_REQUEST as u32, "Echo"),
    (TagKind::IcmpV4Type, icmpv4_type::TIME_EXCEEDED as u32, "Time Exceeded"),
    (TagKind::IcmpV4Type, icmpv4_type::PARAMETER_PROBLEM as u32, "Parameter Problem"),
    (TagKind::IcmpV6Type, icmpv6_type::DESTINATION_UNREACHABLE as u32, "Destination Unreachable"),
    (TagKind::IcmpV6Type, icmpv6_type::PACKET_TOO_BIG as u32, "Packet Too Big"),
    (TagKind::IcmpV6Type, icmpv6_type::TIME_EXCEEDED as u32, "Time Exceeded"),
    (TagKind::IcmpV6Type, icmpv6_type::PARAMETER_PROBLEM as u32, "Parameter Problem"),
    (TagKind::IcmpV6Type, icmpv6_type::ECHO_REQUEST as u32, "Echo Request"),
    (TagKind::IcmpV6Type, icmpv6_type::ECHO_REPLY as u32, "Echo Reply"),
    (TagKind::IcmpV6Type, icmpv6_type::NEIGHBOR_SOLICITATION as u32, "Neighbor Solicitation"),
    (TagKind::IcmpV6Type, icmpv6_type::NEIGHBOR_ADVERTISEMENT as u32, "Neighbor Advertisement"),
    (TagKind::GtpV1MessageType, gtp_message_type::ECHO_REQUEST as u32, "Echo Request"),
    (TagKind::GtpV1MessageType, gtp_message_type::ECHO_RESPONSE as u32, "Echo Response"),
    (TagKind::GtpV1MessageType, gtp_message_type::ERROR_INDICATION as u32, "Error Indication"),
    (TagKind::GtpV1MessageType, gtp_message_type::END_MARKER as u32, "End Marker"),
    (TagKind::GtpV1MessageType, gtp_message_type::G_PDU as u32, "G-PDU"),
    (TagKind::TlsContentType, tls_content_type::CHANGE_CIPHER_SPEC as u32, "change_cipher_spec"),
    (TagKind::TlsContentType, tls_content_type::ALERT as u32, "alert"),
    (TagKind::TlsContentType, tls_content_type::HANDSHAKE as u32, "handshake"),
    (TagKind::TlsContentType, tls_content_type::APPLICATION_DATA as u32, "application_data"),
    (TagKind::TlsContentType, tls_content_type::HEARTBEAT as u32, "heartbeat"),
    (TagKind::HeartbeatMessageType, heartbeat_message_type::REQUEST as u32, "heartbeat_request"),
    (TagKind::HeartbeatMessageType, heartbeat_message_type::RESPONSE as u32, "heartbeat_response"),
];
