//! Test utilities for protocol decoding.
//!
//! Provides builders for constructing test frames and helpers for running a
//! single decoder against a byte slice with the built-in tag catalog.

use bytes::Bytes;

use crate::buffer::checksum::internet_checksum;
use crate::decode::{DecodeContext, Decoded, DecodedHeader, Decoder};
use crate::error::DecodeError;
use crate::tag::{ethertype, ip_number, TagCatalog};

/// Run `decoder` over `data` with the built-in tag catalog.
pub fn decode_with<D: Decoder>(decoder: D, data: &[u8]) -> Result<Decoded, DecodeError> {
    let tags = TagCatalog::builtin();
    decoder.decode(&Bytes::copy_from_slice(data), &DecodeContext::new(&tags))
}

/// Run `decoder` over `data`, panicking unless it yields a header.
pub fn decode_header<D: Decoder>(decoder: D, data: &[u8]) -> DecodedHeader {
    match decode_with(decoder, data) {
        Ok(Decoded::Header(header)) => header,
        other => panic!("expected a decoded header, got {other:?}"),
    }
}

/// Builder for constructing Ethernet frames.
#[derive(Debug, Clone)]
pub struct EthernetBuilder {
    src_mac: [u8; 6],
    dst_mac: [u8; 6],
    ethertype: u16,
    payload: Vec<u8>,
}

impl Default for EthernetBuilder {
    fn default() -> Self {
        Self {
            src_mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            dst_mac: [0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            ethertype: ethertype::IPV4,
            payload: Vec::new(),
        }
    }
}

impl EthernetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.ethertype = ethertype;
        self
    }

    pub fn ipv6(self) -> Self {
        self.ethertype(ethertype::IPV6)
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(14 + self.payload.len());
        frame.extend_from_slice(&self.dst_mac);
        frame.extend_from_slice(&self.src_mac);
        frame.extend_from_slice(&self.ethertype.to_be_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }
}

/// Builder for constructing IPv4 packets with a valid header checksum.
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    identification: u16,
    flags_fragment: u16,
    ttl: u8,
    protocol: u8,
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
    options: Vec<u8>,
    payload: Vec<u8>,
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self {
            identification: 0x0001,
            flags_fragment: 0x0000,
            ttl: 64,
            protocol: ip_number::TCP,
            src_ip: [192, 168, 1, 1],
            dst_ip: [192, 168, 1, 2],
            options: Vec::new(),
            payload: Vec::new(),
        }
    }
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn udp(self) -> Self {
        self.protocol(ip_number::UDP)
    }

    pub fn identification(mut self, identification: u16) -> Self {
        self.identification = identification;
        self
    }

    /// Flags (3 bits) and fragment offset in 8-byte units.
    pub fn fragment(mut self, flags: u8, offset: u16) -> Self {
        self.flags_fragment = ((flags as u16) << 13) | offset;
        self
    }

    /// Options, padded to a multiple of 4 bytes by the caller.
    pub fn options(mut self, options: Vec<u8>) -> Self {
        self.options = options;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let header_len = 20 + self.options.len();
        let total_length = (header_len + self.payload.len()) as u16;
        let mut packet = Vec::with_capacity(total_length as usize);

        packet.push(0x40 | (header_len / 4) as u8);
        packet.push(0x00); // TOS
        packet.extend_from_slice(&total_length.to_be_bytes());
        packet.extend_from_slice(&self.identification.to_be_bytes());
        packet.extend_from_slice(&self.flags_fragment.to_be_bytes());
        packet.push(self.ttl);
        packet.push(self.protocol);
        packet.extend_from_slice(&[0x00, 0x00]); // Checksum
        packet.extend_from_slice(&self.src_ip);
        packet.extend_from_slice(&self.dst_ip);
        packet.extend_from_slice(&self.options);

        let checksum = internet_checksum(&packet);
        packet[10..12].copy_from_slice(&checksum.to_be_bytes());
        packet.extend_from_slice(&self.payload);
        packet
    }
}

/// Builder for constructing IPv6 packets.
#[derive(Debug, Clone)]
pub struct Ipv6Builder {
    next_header: u8,
    hop_limit: u8,
    src_ip: [u8; 16],
    dst_ip: [u8; 16],
    payload: Vec<u8>,
}

impl Default for Ipv6Builder {
    fn default() -> Self {
        let mut src_ip = [0u8; 16];
        src_ip[..4].copy_from_slice(&[0x20, 0x01, 0x0d, 0xb8]);
        let mut dst_ip = src_ip;
        src_ip[15] = 1;
        dst_ip[15] = 2;
        Self {
            next_header: ip_number::TCP,
            hop_limit: 64,
            src_ip,
            dst_ip,
            payload: Vec::new(),
        }
    }
}

impl Ipv6Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_header(mut self, next_header: u8) -> Self {
        self.next_header = next_header;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(40 + self.payload.len());
        packet.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]); // Version 6
        packet.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        packet.push(self.next_header);
        packet.push(self.hop_limit);
        packet.extend_from_slice(&self.src_ip);
        packet.extend_from_slice(&self.dst_ip);
        packet.extend_from_slice(&self.payload);
        packet
    }
}

/// Builder for constructing TCP segments. The checksum is left zero.
#[derive(Debug, Clone)]
pub struct TcpBuilder {
    src_port: u16,
    dst_port: u16,
    seq: u32,
    flags: u8,
    options: Vec<u8>,
    payload: Vec<u8>,
}

impl Default for TcpBuilder {
    fn default() -> Self {
        Self {
            src_port: 12345,
            dst_port: 80,
            seq: 1,
            flags: 0x02, // SYN
            options: Vec::new(),
            payload: Vec::new(),
        }
    }
}

impl TcpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ports(mut self, src: u16, dst: u16) -> Self {
        self.src_port = src;
        self.dst_port = dst;
        self
    }

    /// Options, padded to a multiple of 4 bytes by the caller.
    pub fn options(mut self, options: Vec<u8>) -> Self {
        self.options = options;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let data_offset = ((20 + self.options.len()) / 4) as u8;
        let mut segment = Vec::with_capacity(20 + self.options.len() + self.payload.len());
        segment.extend_from_slice(&self.src_port.to_be_bytes());
        segment.extend_from_slice(&self.dst_port.to_be_bytes());
        segment.extend_from_slice(&self.seq.to_be_bytes());
        segment.extend_from_slice(&0u32.to_be_bytes()); // Ack
        segment.push(data_offset << 4);
        segment.push(self.flags);
        segment.extend_from_slice(&65535u16.to_be_bytes()); // Window
        segment.extend_from_slice(&[0x00, 0x00]); // Checksum
        segment.extend_from_slice(&[0x00, 0x00]); // Urgent pointer
        segment.extend_from_slice(&self.options);
        segment.extend_from_slice(&self.payload);
        segment
    }
}

/// Builder for constructing UDP datagrams. The checksum is left zero.
#[derive(Debug, Clone)]
pub struct UdpBuilder {
    src_port: u16,
    dst_port: u16,
    length: Option<u16>,
    payload: Vec<u8>,
}

impl Default for UdpBuilder {
    fn default() -> Self {
        Self {
            src_port: 54321,
            dst_port: 53,
            length: None,
            payload: Vec::new(),
        }
    }
}

impl UdpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ports(mut self, src: u16, dst: u16) -> Self {
        self.src_port = src;
        self.dst_port = dst;
        self
    }

    /// Override the length field instead of deriving it from the payload.
    pub fn length(mut self, length: u16) -> Self {
        self.length = Some(length);
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let length = self.length.unwrap_or((8 + self.payload.len()) as u16);
        let mut datagram = Vec::with_capacity(8 + self.payload.len());
        datagram.extend_from_slice(&self.src_port.to_be_bytes());
        datagram.extend_from_slice(&self.dst_port.to_be_bytes());
        datagram.extend_from_slice(&length.to_be_bytes());
        datagram.extend_from_slice(&[0x00, 0x00]); // Checksum
        datagram.extend_from_slice(&self.payload);
        datagram
    }
}
