//! Built-in protocol decoders and their header types.
//!
//! Each protocol module provides a header struct (the parsed fixed-format
//! fields) and a zero-sized decoder implementing
//! [`Decoder`](crate::decode::Decoder). Headers know how to write
//! themselves back to wire format through [`HeaderFormat`], recomputing
//! length and checksum fields when asked to.
//!
//! | Decoder | Layer | Next layer from |
//! |---------|-------|-----------------|
//! | `ethernet`, `linux_sll`, `dot1q` | link | EtherType |
//! | `bsd_loopback` | link | protocol family |
//! | `arp` | network | terminal |
//! | `ipv4`, `ipv6`, IPv6 extension headers | network | IP protocol number |
//! | `tcp`, `udp`, `sctp` | transport | source then destination port |
//! | `icmpv4`, `icmpv6` | network | invoking packet for error messages |
//! | `gtpv1` | tunnel | inner IPv4 or IPv6 |
//! | `tls`, `tls_heartbeat` | application | TLS content type |
//! | `unknown` | fallback | - |

mod arp;
mod ethernet;
mod gtp;
mod icmp;
mod icmpv6;
mod ipv4;
mod ipv6;
mod ipv6_ext;
mod linux_sll;
mod loopback;
mod options;
mod sctp;
mod tcp;
mod tls;
mod udp;
mod unknown;
mod vlan;

#[cfg(test)]
pub(crate) mod test_utils;

pub use arp::{ArpDecoder, ArpHeader};
pub use ethernet::{EthernetDecoder, EthernetHeader, ETHERNET_HEADER_LEN};
pub use gtp::{gtp_flags, GtpDecoder, GtpHeader};
pub use icmp::{Icmpv4Decoder, Icmpv4Header};
pub use icmpv6::{Icmpv6Decoder, Icmpv6Header};
pub use ipv4::{Ipv4Decoder, Ipv4Header, IPV4_MIN_HEADER_LEN};
pub use ipv6::{Ipv6Decoder, Ipv6Header, IPV6_HEADER_LEN};
pub use ipv6_ext::{
    Ipv6ExtensionDecoder, Ipv6ExtensionHeader, Ipv6ExtensionKind, Ipv6FragmentDecoder,
    Ipv6FragmentHeader, IPV6_FRAGMENT_HEADER_LEN,
};
pub use linux_sll::{LinuxSllDecoder, LinuxSllHeader};
pub use loopback::{BsdLoopbackDecoder, BsdLoopbackHeader};
pub use options::{parse_options, OptionEntry};
pub use sctp::{SctpDecoder, SctpHeader};
pub use tcp::{tcp_flags, TcpDecoder, TcpHeader};
pub use tls::{HeartbeatDecoder, HeartbeatHeader, TlsRecordDecoder, TlsRecordHeader};
pub use udp::{UdpDecoder, UdpHeader, UDP_HEADER_LEN};
pub use unknown::UnknownDecoder;
pub use vlan::{VlanDecoder, VlanHeader};

use std::fmt;

use bytes::Bytes;

use crate::error::DecodeError;
use crate::packet::{Fixups, IpContext};

/// Wire representation of a parsed header.
pub trait HeaderFormat {
    /// Name of the decoder that produces this header.
    fn name(&self) -> &'static str;

    /// Encoded header length in bytes.
    fn len(&self) -> usize;

    /// Append the encoded header to `out`.
    ///
    /// `payload` is the already encoded payload (without trailer) and `ip`
    /// the nearest enclosing IP header, for fields computed over them.
    fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, ip: Option<&IpContext>);
}

/// Kind of a decoded header, for chain searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    Ethernet,
    LinuxSll,
    BsdLoopback,
    Vlan,
    Arp,
    Ipv4,
    Ipv6,
    Ipv6HopByHop,
    Ipv6Routing,
    Ipv6DestinationOptions,
    Ipv6Fragment,
    Tcp,
    Udp,
    Icmpv4,
    Icmpv6,
    Sctp,
    Gtp,
    TlsRecord,
    Heartbeat,
}

/// Any built-in header.
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    Ethernet(EthernetHeader),
    LinuxSll(LinuxSllHeader),
    BsdLoopback(BsdLoopbackHeader),
    Vlan(VlanHeader),
    Arp(ArpHeader),
    Ipv4(Ipv4Header),
    Ipv6(Ipv6Header),
    Ipv6Extension(Ipv6ExtensionHeader),
    Ipv6Fragment(Ipv6FragmentHeader),
    Tcp(TcpHeader),
    Udp(UdpHeader),
    Icmpv4(Icmpv4Header),
    Icmpv6(Icmpv6Header),
    Sctp(SctpHeader),
    Gtp(GtpHeader),
    TlsRecord(TlsRecordHeader),
    Heartbeat(HeartbeatHeader),
}

/// Macro to delegate HeaderFormat methods to inner types.
macro_rules! delegate_header {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            Header::Ethernet(h) => h.$method($($arg),*),
            Header::LinuxSll(h) => h.$method($($arg),*),
            Header::BsdLoopback(h) => h.$method($($arg),*),
            Header::Vlan(h) => h.$method($($arg),*),
            Header::Arp(h) => h.$method($($arg),*),
            Header::Ipv4(h) => h.$method($($arg),*),
            Header::Ipv6(h) => h.$method($($arg),*),
            Header::Ipv6Extension(h) => h.$method($($arg),*),
            Header::Ipv6Fragment(h) => h.$method($($arg),*),
            Header::Tcp(h) => h.$method($($arg),*),
            Header::Udp(h) => h.$method($($arg),*),
            Header::Icmpv4(h) => h.$method($($arg),*),
            Header::Icmpv6(h) => h.$method($($arg),*),
            Header::Sctp(h) => h.$method($($arg),*),
            Header::Gtp(h) => h.$method($($arg),*),
            Header::TlsRecord(h) => h.$method($($arg),*),
            Header::Heartbeat(h) => h.$method($($arg),*),
        }
    };
}

#[allow(clippy::len_without_is_empty)]
impl Header {
    #[inline]
    pub fn name(&self) -> &'static str {
        delegate_header!(self, name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        delegate_header!(self, len)
    }

    #[inline]
    pub fn write(&self, out: &mut Vec<u8>, payload: &[u8], fixups: Fixups, ip: Option<&IpContext>) {
        delegate_header!(self, write, out, payload, fixups, ip)
    }

    pub fn kind(&self) -> HeaderKind {
        match self {
            Header::Ethernet(_) => HeaderKind::Ethernet,
            Header::LinuxSll(_) => HeaderKind::LinuxSll,
            Header::BsdLoopback(_) => HeaderKind::BsdLoopback,
            Header::Vlan(_) => HeaderKind::Vlan,
            Header::Arp(_) => HeaderKind::Arp,
            Header::Ipv4(_) => HeaderKind::Ipv4,
            Header::Ipv6(_) => HeaderKind::Ipv6,
            Header::Ipv6Extension(h) => match h.kind {
                Ipv6ExtensionKind::HopByHop => HeaderKind::Ipv6HopByHop,
                Ipv6ExtensionKind::Routing => HeaderKind::Ipv6Routing,
                Ipv6ExtensionKind::DestinationOptions => HeaderKind::Ipv6DestinationOptions,
            },
            Header::Ipv6Fragment(_) => HeaderKind::Ipv6Fragment,
            Header::Tcp(_) => HeaderKind::Tcp,
            Header::Udp(_) => HeaderKind::Udp,
            Header::Icmpv4(_) => HeaderKind::Icmpv4,
            Header::Icmpv6(_) => HeaderKind::Icmpv6,
            Header::Sctp(_) => HeaderKind::Sctp,
            Header::Gtp(_) => HeaderKind::Gtp,
            Header::TlsRecord(_) => HeaderKind::TlsRecord,
            Header::Heartbeat(_) => HeaderKind::Heartbeat,
        }
    }

    /// Pseudo-header context this header provides to the layers below it.
    pub fn ip_context(&self) -> Option<IpContext> {
        match self {
            Header::Ipv4(h) => Some(IpContext::V4 {
                src: h.source,
                dst: h.destination,
            }),
            Header::Ipv6(h) => Some(IpContext::V6 {
                src: h.source,
                dst: h.destination,
            }),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<&Ipv4Header> {
        match self {
            Header::Ipv4(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_ipv6(&self) -> Option<&Ipv6Header> {
        match self {
            Header::Ipv6(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_tcp(&self) -> Option<&TcpHeader> {
        match self {
            Header::Tcp(h) => Some(h),
            _ => None,
        }
    }
}

macro_rules! header_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Header {
                fn from(h: $ty) -> Self {
                    Header::$variant(h)
                }
            }
        )*
    };
}

header_from! {
    Ethernet(EthernetHeader),
    LinuxSll(LinuxSllHeader),
    BsdLoopback(BsdLoopbackHeader),
    Vlan(VlanHeader),
    Arp(ArpHeader),
    Ipv4(Ipv4Header),
    Ipv6(Ipv6Header),
    Ipv6Extension(Ipv6ExtensionHeader),
    Ipv6Fragment(Ipv6FragmentHeader),
    Tcp(TcpHeader),
    Udp(UdpHeader),
    Icmpv4(Icmpv4Header),
    Icmpv6(Icmpv6Header),
    Sctp(SctpHeader),
    Gtp(GtpHeader),
    TlsRecord(TlsRecordHeader),
    Heartbeat(HeartbeatHeader),
}

/// Wrap an error from an underlying header parser.
pub(crate) fn malformed(protocol: &'static str, err: impl fmt::Display) -> DecodeError {
    DecodeError::Malformed {
        protocol,
        reason: err.to_string(),
    }
}

/// Fail unless `data` holds at least `needed` bytes.
#[inline]
pub(crate) fn ensure_len(
    protocol: &'static str,
    data: &Bytes,
    needed: usize,
) -> Result<(), DecodeError> {
    if data.len() < needed {
        return Err(DecodeError::too_short(protocol, needed, data.len()));
    }
    Ok(())
}

/// Replace a big-endian u16 written earlier at `at`.
#[inline]
pub(crate) fn patch_u16(out: &mut [u8], at: usize, value: u16) {
    out[at..at + 2].copy_from_slice(&value.to_be_bytes());
}
