//! Checksum algorithms used by the serializers.
//!
//! - Internet checksum (RFC 1071), with IPv4/IPv6 pseudo-header variants
//! - CRC32 (IEEE) via `crc32fast`
//! - CRC32C (Castagnoli, used by SCTP) via `crc32c`
//! - Adler32

use std::net::{Ipv4Addr, Ipv6Addr};

/// Running one's-complement sum over a sequence of byte slices.
///
/// Slices may have odd lengths; a dangling byte is paired with the first
/// byte of the next slice, as if the slices were concatenated.
#[derive(Debug, Default, Clone)]
struct OnesComplement {
    sum: u64,
    pending: Option<u8>,
}

impl OnesComplement {
    fn add(&mut self, mut data: &[u8]) {
        if let Some(hi) = self.pending.take() {
            match data.split_first() {
                Some((&lo, rest)) => {
                    self.sum += u16::from_be_bytes([hi, lo]) as u64;
                    data = rest;
                }
                None => {
                    self.pending = Some(hi);
                    return;
                }
            }
        }
        let mut chunks = data.chunks_exact(2);
        for chunk in &mut chunks {
            self.sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u64;
        }
        self.pending = chunks.remainder().first().copied();
    }

    fn finish(mut self) -> u16 {
        // Trailing odd byte is zero-padded
        if let Some(hi) = self.pending.take() {
            self.sum += (hi as u64) << 8;
        }
        while (self.sum >> 16) != 0 {
            self.sum = (self.sum & 0xFFFF) + (self.sum >> 16);
        }
        !(self.sum as u16)
    }
}

/// Internet checksum of `data`.
pub fn internet_checksum(data: &[u8]) -> u16 {
    internet_checksum_parts(&[data])
}

/// Internet checksum over the concatenation of `parts`, without copying.
pub fn internet_checksum_parts(parts: &[&[u8]]) -> u16 {
    let mut acc = OnesComplement::default();
    for part in parts {
        acc.add(part);
    }
    acc.finish()
}

/// TCP/UDP checksum with an IPv4 pseudo-header.
///
/// `segment` is the transport header (checksum field zeroed) followed by its payload.
pub fn ipv4_pseudo_checksum(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, segment: &[&[u8]]) -> u16 {
    let len: usize = segment.iter().map(|p| p.len()).sum();
    let mut pseudo = [0u8; 12];
    pseudo[0..4].copy_from_slice(&src.octets());
    pseudo[4..8].copy_from_slice(&dst.octets());
    pseudo[9] = protocol;
    pseudo[10..12].copy_from_slice(&(len as u16).to_be_bytes());

    let mut acc = OnesComplement::default();
    acc.add(&pseudo);
    for part in segment {
        acc.add(part);
    }
    acc.finish()
}

/// TCP/UDP/ICMPv6 checksum with an IPv6 pseudo-header (RFC 8200 section 8.1).
pub fn ipv6_pseudo_checksum(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    next_header: u8,
    segment: &[&[u8]],
) -> u16 {
    let len: usize = segment.iter().map(|p| p.len()).sum();
    let mut pseudo = [0u8; 40];
    pseudo[0..16].copy_from_slice(&src.octets());
    pseudo[16..32].copy_from_slice(&dst.octets());
    pseudo[32..36].copy_from_slice(&(len as u32).to_be_bytes());
    pseudo[39] = next_header;

    let mut acc = OnesComplement::default();
    acc.add(&pseudo);
    for part in segment {
        acc.add(part);
    }
    acc.finish()
}

/// CRC32 (IEEE 802.3 polynomial).
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// CRC32C (Castagnoli polynomial), as used by SCTP.
pub fn crc32c(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Adler-32 (RFC 1950).
pub fn adler32(data: &[u8]) -> u32 {
    const MOD: u32 = 65_521;
    // Largest n such that 255n(n+1)/2 + (n+1)(MOD-1) fits in u32
    const NMAX: usize = 5552;

    let mut a: u32 = 1;
    let mut b: u32 = 0;
    for chunk in data.chunks(NMAX) {
        for &byte in chunk {
            a += byte as u32;
            b += a;
        }
        a %= MOD;
        b %= MOD;
    }
    (b << 16) | a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internet_checksum_rfc1071_example() {
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(internet_checksum(&data), !0xddf2);
    }

    #[test]
    fn test_checksum_self_verifies() {
        // IPv4 header with checksum zeroed
        let mut header = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        let csum = internet_checksum(&header);
        assert_eq!(csum, 0xb861);
        header[10..12].copy_from_slice(&csum.to_be_bytes());
        assert_eq!(internet_checksum(&header), 0);
    }

    #[test]
    fn test_odd_length_padding() {
        assert_eq!(internet_checksum(&[0x01]), internet_checksum(&[0x01, 0x00]));
    }

    #[test]
    fn test_parts_match_concatenation() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde];
        let whole = internet_checksum(&data);
        assert_eq!(internet_checksum_parts(&[&data[..3], &data[3..]]), whole);
        assert_eq!(internet_checksum_parts(&[&data[..1], &[], &data[1..]]), whole);
    }

    #[test]
    fn test_pseudo_header_checksum_self_verifies() {
        let src = Ipv4Addr::new(10, 0, 0, 1);
        let dst = Ipv4Addr::new(10, 0, 0, 2);
        // UDP header, length 10, checksum zeroed, 2 bytes payload
        let mut segment = [0x30, 0x39, 0x00, 0x35, 0x00, 0x0a, 0x00, 0x00, 0xab, 0xcd];
        let csum = ipv4_pseudo_checksum(src, dst, 17, &[&segment]);
        segment[6..8].copy_from_slice(&csum.to_be_bytes());
        assert_eq!(ipv4_pseudo_checksum(src, dst, 17, &[&segment]), 0);

        let src6: Ipv6Addr = "fe80::1".parse().unwrap();
        let dst6: Ipv6Addr = "fe80::2".parse().unwrap();
        segment[6..8].copy_from_slice(&[0, 0]);
        let csum6 = ipv6_pseudo_checksum(src6, dst6, 17, &[&segment]);
        segment[6..8].copy_from_slice(&csum6.to_be_bytes());
        assert_eq!(ipv6_pseudo_checksum(src6, dst6, 17, &[&segment]), 0);
    }

    #[test]
    fn test_crc_check_values() {
        // Standard "123456789" check values
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32c(b"123456789"), 0xE306_9283);
    }

    #[test]
    fn test_adler32() {
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
        let long = vec![0xffu8; 100_000];
        let mut a: u64 = 1;
        let mut b: u64 = 0;
        for &byte in &long {
            a = (a + byte as u64) % 65_521;
            b = (b + a) % 65_521;
        }
        assert_eq!(adler32(&long), ((b << 16) | a) as u32);
    }
}
