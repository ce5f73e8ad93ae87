//! End-to-end dissection of hand-built frames through the public API.

mod common;

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread;

use common::*;
use pktchain_core::protocol::tcp_flags;
use pktchain_core::{
    ConfiguredDecoderTable, DecodeError, Dissector, FixedDecoderTable, FrameSource, Header,
    HeaderKind, Layer, MemorySource, TagCatalog, TagKind,
};

// ============================================================================
// Link layer dispatch
// ============================================================================

#[test]
fn test_tcp_syn_over_ethernet() {
    let frame = tcp_syn_frame();
    assert_eq!(frame.len(), 54);

    let chain = decode_ethernet(frame);
    assert_eq!(names(&chain), vec!["ethernet", "ipv4", "tcp"]);
    assert_eq!(chain.len(), 54);

    let ip = chain.find(HeaderKind::Ipv4).unwrap().header.as_ipv4().unwrap();
    assert_eq!(ip.source, Ipv4Addr::from(CLIENT_V4));
    assert_eq!(ip.destination, Ipv4Addr::from(SERVER_V4));
    assert_eq!(ip.total_length, 40);
    assert_eq!(ip.identification, 0x1234);

    let tcp = chain.find(HeaderKind::Tcp).unwrap().header.as_tcp().unwrap();
    assert_eq!(tcp.source_port.value(), 12345);
    assert_eq!(tcp.destination_port.value(), 80);
    assert_eq!(tcp.sequence, 1);
    assert!(tcp.has_flag(tcp_flags::SYN));
    assert!(!tcp.has_flag(tcp_flags::ACK));
}

#[test]
fn test_vlan_tagged_frame() {
    let inner = ipv4(17, 1, &udp(1000, 2000, b"hello"));
    let frame = ethernet(0x8100, &vlan(42, 0x0800, &inner));

    let chain = decode_ethernet(frame);
    assert_eq!(names(&chain), vec!["ethernet", "dot1q", "ipv4", "udp", "opaque"]);
    let Header::Vlan(tag) = &chain.find(HeaderKind::Vlan).unwrap().header else {
        panic!("expected a VLAN header");
    };
    assert_eq!(tag.vlan_id, 42);
    assert_eq!(tag.priority, 3);
    assert!(!tag.drop_eligible);
}

#[test]
fn test_bsd_loopback_ipv4() {
    let mut frame = 2u32.to_le_bytes().to_vec(); // AF_INET, host order
    frame.extend_from_slice(&ipv4(17, 7, &udp(5353, 5353, &[0; 12])));

    let chain = Dissector::builtin().decode_frame(LINKTYPE_NULL, frame).unwrap();
    assert_eq!(names(&chain), vec!["bsd_loopback", "ipv4", "udp", "opaque"]);
}

#[test]
fn test_raw_link_type_carries_ipv6() {
    let packet = ipv6(17, &udp(1000, 2000, &[0xab; 4]));
    let chain = Dissector::builtin().decode_frame(LINKTYPE_RAW, packet).unwrap();
    assert_eq!(names(&chain), vec!["ipv6", "udp", "opaque"]);
}

#[test]
fn test_unregistered_link_type_is_opaque() {
    let chain = Dissector::builtin()
        .decode_frame(147, vec![0xde, 0xad, 0xbe, 0xef])
        .unwrap();
    let Layer::Opaque(rest) = chain else {
        panic!("expected opaque bytes");
    };
    assert_eq!(rest.data.len(), 4);
    assert_eq!(rest.tag.map(|t| t.kind()), Some(TagKind::DataLinkType));
}

// ============================================================================
// Ports, fallbacks and terminal layers
// ============================================================================

#[test]
fn test_dns_payload_stays_opaque() {
    let frame = dns_query_frame();
    let len = frame.len();
    let chain = decode_ethernet(frame);

    assert_eq!(names(&chain), vec!["ethernet", "ipv4", "udp", "opaque"]);
    assert_eq!(chain.len(), len);
    let Layer::Opaque(dns) = chain.terminal() else {
        panic!("expected opaque bytes");
    };
    // Neither port is mapped: the source port, tried first, is kept
    assert_eq!(dns.tag.map(|t| t.value()), Some(49152));
    assert_eq!(dns.offset, 42);
    assert_eq!(&dns.data[12..20], b"\x07example");
}

#[test]
fn test_tls_application_data() {
    let record = [
        0x17, // application data
        0x03, 0x03, // TLS 1.2
        0x00, 0x05, // length
        0xca, 0xfe, 0xba, 0xbe, 0x00,
    ];
    let frame = ethernet(0x0800, &ipv4(6, 9, &tcp(50000, 443, 0x18, &record)));
    let chain = decode_ethernet(frame);

    assert_eq!(names(&chain), vec!["ethernet", "ipv4", "tcp", "tls", "opaque"]);
    let Layer::Opaque(data) = chain.terminal() else {
        panic!("expected opaque bytes");
    };
    assert_eq!(data.tag.map(|t| (t.kind(), t.value())), Some((TagKind::TlsContentType, 23)));
    assert_eq!(data.data.len(), 5);
}

#[test]
fn test_tls_heartbeat() {
    let record = [
        0x18, // heartbeat
        0x03, 0x03, // TLS 1.2
        0x00, 0x03, // length
        0x01, // request
        0x00, 0x00, // payload length
    ];
    let frame = ethernet(0x0800, &ipv4(6, 9, &tcp(50000, 443, 0x18, &record)));
    let chain = decode_ethernet(frame);
    assert_eq!(names(&chain), vec!["ethernet", "ipv4", "tcp", "tls", "tls_heartbeat"]);
}

#[test]
fn test_icmp_error_quotes_invoking_datagram() {
    // Port unreachable quoting the first 8 bytes of a UDP datagram whose
    // IP header still claims the original 60 byte length
    let quoted_udp = &udp(49152, 53, &[0; 32])[..8];
    let mut quoted_ip = ipv4(17, 0x4321, quoted_udp);
    quoted_ip[2..4].copy_from_slice(&60u16.to_be_bytes());

    let mut icmp = vec![
        0x03, // destination unreachable
        0x03, // port unreachable
        0x00, 0x00, // checksum
        0x00, 0x00, 0x00, 0x00, // unused
    ];
    icmp.extend_from_slice(&quoted_ip);
    let frame = ethernet(0x0800, &ipv4(1, 0x0101, &icmp));
    let len = frame.len();

    let chain = decode_ethernet(frame);
    assert_eq!(names(&chain), vec!["ethernet", "ipv4", "icmpv4", "ipv4", "udp"]);
    assert_eq!(chain.len(), len);
}

#[test]
fn test_icmp_echo_payload_is_opaque() {
    let mut icmp = vec![
        0x08, 0x00, // echo request
        0x00, 0x00, // checksum
        0x00, 0x01, // identifier
        0x00, 0x07, // sequence
    ];
    icmp.extend_from_slice(&[0x61; 56]);
    let chain = decode_ethernet(ethernet(0x0800, &ipv4(1, 3, &icmp)));

    assert_eq!(names(&chain), vec!["ethernet", "ipv4", "icmpv4", "opaque"]);
    let Header::Icmpv4(echo) = &chain.find(HeaderKind::Icmpv4).unwrap().header else {
        panic!("expected ICMPv4");
    };
    assert_eq!(echo.identifier(), 1);
    assert_eq!(echo.sequence(), 7);
    assert_eq!(chain.terminal().len(), 56);
}

// ============================================================================
// Invalid input
// ============================================================================

#[test]
fn test_bad_udp_length_is_isolated() {
    let mut segment = udp(1000, 2000, &[0; 4]);
    segment[4..6].copy_from_slice(&4u16.to_be_bytes()); // shorter than the header
    let chain = decode_ethernet(ethernet(0x0800, &ipv4(17, 5, &segment)));

    assert_eq!(names(&chain), vec!["ethernet", "ipv4", "illegal"]);
    let Layer::Illegal(bad) = chain.terminal() else {
        panic!("expected an illegal layer");
    };
    assert_eq!(bad.offset, 34);
    assert_eq!(bad.tag.value(), 17);
    assert!(matches!(bad.error, DecodeError::InvalidField { protocol: "udp", .. }));

    // Outer layers are unaffected
    let ip = chain.find(HeaderKind::Ipv4).unwrap().header.as_ipv4().unwrap();
    assert_eq!(ip.source, Ipv4Addr::from(CLIENT_V4));
}

#[test]
fn test_truncated_capture() {
    let mut frame = tcp_syn_frame();
    frame.truncate(40); // cut inside the TCP header
    let chain = decode_ethernet(frame);

    assert_eq!(names(&chain), vec!["ethernet", "ipv4", "illegal"]);
    assert_eq!(chain.len(), 40);
}

#[test]
fn test_short_ethernet_frame() {
    let chain = decode_ethernet(vec![0x00, 0x11, 0x22]);
    assert!(chain.is_illegal());
    assert_eq!(chain.len(), 3);
}

// ============================================================================
// Tables and sharing
// ============================================================================

#[test]
fn test_custom_port_mapping() {
    // Carry GTP-U on a non-standard port
    let gtp = [
        0x30, // version 1, PT 1
        0xff, // G-PDU
        0x00, 0x1c, // length
        0x00, 0x00, 0x00, 0x01, // TEID
    ];
    let mut tunnel = gtp.to_vec();
    tunnel.extend_from_slice(&ipv4(17, 2, &udp(1, 2, &[])));
    let frame = ethernet(0x0800, &ipv4(17, 1, &udp(40000, 3386, &tunnel)));

    let stock = decode_ethernet(frame.clone());
    assert_eq!(names(&stock), vec!["ethernet", "ipv4", "udp", "opaque"]);

    let table = FixedDecoderTable::builtin().with(
        TagKind::UdpPort,
        3386,
        pktchain_core::protocol::GtpDecoder,
    );
    let dissector = Dissector::new(Arc::new(TagCatalog::builtin()), Arc::new(table));
    let chain = dissector.decode_frame(LINKTYPE_ETHERNET, frame).unwrap();
    assert_eq!(names(&chain), vec!["ethernet", "ipv4", "udp", "gtpv1", "ipv4", "udp"]);
}

#[test]
fn test_configured_dissector_matches_builtin() {
    let configured = Dissector::new(
        Arc::new(TagCatalog::builtin()),
        Arc::new(ConfiguredDecoderTable::builtin()),
    );
    for frame in [tcp_syn_frame(), dns_query_frame()] {
        let a = decode_ethernet(frame.clone());
        let b = configured.decode_frame(LINKTYPE_ETHERNET, frame).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn test_dissector_shared_across_threads() {
    let dissector = Dissector::builtin();
    let frames = [tcp_syn_frame(), dns_query_frame()];
    let expected: Vec<Layer> = frames
        .iter()
        .map(|f| dissector.decode_frame(LINKTYPE_ETHERNET, f.clone()).unwrap())
        .collect();

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for (frame, want) in frames.iter().zip(&expected) {
                    let got = dissector.decode_frame(LINKTYPE_ETHERNET, frame.clone()).unwrap();
                    assert_eq!(&got, want);
                }
            });
        }
    });
}

#[test]
fn test_decode_from_memory_source() {
    let mut source = MemorySource::new(LINKTYPE_ETHERNET);
    source.push(tcp_syn_frame()).push(dns_query_frame());

    let dissector = Dissector::builtin();
    let mut decoded = Vec::new();
    while let Some(frame) = source.next_frame().unwrap() {
        let chain = dissector.decode_raw(&frame).unwrap();
        decoded.push((frame.frame_number, names(&chain)));
    }
    assert_eq!(
        decoded,
        vec![
            (1, vec!["ethernet", "ipv4", "tcp"]),
            (2, vec!["ethernet", "ipv4", "udp", "opaque"]),
        ]
    );
}

#[test]
fn test_serialization_reproduces_wire_bytes() {
    for frame in [tcp_syn_frame(), dns_query_frame()] {
        let chain = decode_ethernet(frame.clone());
        assert_eq!(chain.to_bytes(), frame);
    }
}
