//! Hand-built frames shared by the integration tests.
//!
//! Every builder lays its header out field by field so a failing assertion
//! can be traced back to the byte that caused it.

#![allow(dead_code)]

use pktchain_core::{Dissector, Layer, Packet};

pub const LINKTYPE_ETHERNET: u16 = 1;
pub const LINKTYPE_NULL: u16 = 0;
pub const LINKTYPE_RAW: u16 = 101;

pub const CLIENT_V4: [u8; 4] = [192, 168, 1, 100];
pub const SERVER_V4: [u8; 4] = [10, 0, 0, 1];
pub const CLIENT_V6: [u8; 16] = [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01];
pub const SERVER_V6: [u8; 16] = [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x02];

/// Internet checksum over `data`.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    for chunk in data.chunks(2) {
        let word = match chunk {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        };
        sum += word as u32;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Ethernet II frame carrying `payload`.
pub fn ethernet(ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // dst MAC
        0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, // src MAC
    ];
    frame.extend_from_slice(&ethertype.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// 802.1Q tag followed by `payload`.
pub fn vlan(vlan_id: u16, ethertype: u16, payload: &[u8]) -> Vec<u8> {
    let tci = (3u16 << 13) | (vlan_id & 0x0fff); // PCP 3, DEI 0
    let mut out = tci.to_be_bytes().to_vec();
    out.extend_from_slice(&ethertype.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// IPv4 header (no options, valid checksum) followed by `payload`.
pub fn ipv4(protocol: u8, identification: u16, payload: &[u8]) -> Vec<u8> {
    let total = (20 + payload.len()) as u16;
    let mut header = vec![
        0x45, // version 4, IHL 5
        0x00, // TOS
    ];
    header.extend_from_slice(&total.to_be_bytes()); // total length
    header.extend_from_slice(&identification.to_be_bytes());
    header.extend_from_slice(&[0x00, 0x00]); // flags + fragment offset
    header.push(64); // TTL
    header.push(protocol);
    header.extend_from_slice(&[0x00, 0x00]); // checksum placeholder
    header.extend_from_slice(&CLIENT_V4);
    header.extend_from_slice(&SERVER_V4);
    let sum = checksum(&header);
    header[10..12].copy_from_slice(&sum.to_be_bytes());
    header.extend_from_slice(payload);
    header
}

/// IPv6 header followed by `payload`.
pub fn ipv6(next_header: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![
        0x60, 0x00, 0x00, 0x00, // version 6, traffic class 0, flow label 0
    ];
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes()); // payload length
    out.push(next_header);
    out.push(64); // hop limit
    out.extend_from_slice(&CLIENT_V6);
    out.extend_from_slice(&SERVER_V6);
    out.extend_from_slice(payload);
    out
}

/// UDP header (checksum 0) followed by `payload`.
pub fn udp(source_port: u16, destination_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&source_port.to_be_bytes());
    out.extend_from_slice(&destination_port.to_be_bytes());
    out.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes()); // length
    out.extend_from_slice(&[0x00, 0x00]); // checksum
    out.extend_from_slice(payload);
    out
}

/// 20 byte TCP header with the given flags, no options.
pub fn tcp(source_port: u16, destination_port: u16, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(20 + payload.len());
    out.extend_from_slice(&source_port.to_be_bytes());
    out.extend_from_slice(&destination_port.to_be_bytes());
    out.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]); // sequence
    out.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // acknowledgment
    out.push(0x50); // data offset 5
    out.push(flags);
    out.extend_from_slice(&[0xff, 0xff]); // window
    out.extend_from_slice(&[0x00, 0x00]); // checksum
    out.extend_from_slice(&[0x00, 0x00]); // urgent pointer
    out.extend_from_slice(payload);
    out
}

/// Ethernet/IPv4/TCP SYN from port 12345 to 80, 54 bytes.
pub fn tcp_syn_frame() -> Vec<u8> {
    ethernet(0x0800, &ipv4(6, 0x1234, &tcp(12345, 80, 0x02, &[])))
}

/// Ethernet/IPv4/UDP DNS query for `example.com`.
pub fn dns_query_frame() -> Vec<u8> {
    let query = [
        0x12, 0x34, // transaction ID
        0x01, 0x00, // flags: standard query, RD
        0x00, 0x01, // questions
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // answer/authority/additional
        0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', //
        0x03, b'c', b'o', b'm', 0x00, // example.com
        0x00, 0x01, // type A
        0x00, 0x01, // class IN
    ];
    ethernet(0x0800, &ipv4(17, 0x4321, &udp(49152, 53, &query)))
}

/// Decode an Ethernet frame with the built-in tables.
pub fn decode_ethernet(frame: Vec<u8>) -> Layer {
    Dissector::builtin()
        .decode_frame(LINKTYPE_ETHERNET, frame)
        .expect("built-in tables never fail")
}

/// Layer names from the outside in.
pub fn names(layer: &Layer) -> Vec<&'static str> {
    layer.iter().map(Layer::name).collect()
}

/// First IPv4 or IPv6 packet of a decoded frame.
pub fn ip_packet(layer: &Layer) -> Packet {
    layer
        .iter()
        .filter_map(Layer::as_packet)
        .find(|p| p.header.as_ipv4().is_some() || p.header.as_ipv6().is_some())
        .cloned()
        .expect("frame holds an IP packet")
}
