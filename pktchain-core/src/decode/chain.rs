//! The per-layer decode state machine.
//!
//! For each layer the [`Dissector`] walks the candidate tags in order:
//!
//! ```text
//!   candidates ──► resolve ──► Mapped ──► decode ──► Ok(header) ──► next layer
//!                     │                     │
//!                     │                     └──► Err ──► remember first error,
//!                     │                                  try next candidate
//!                     └──► Fallback ──► skipped while a mapped candidate remains
//!
//!   no candidate decoded:  any mapped decoder failed ──► illegal layer
//!                          none mapped               ──► fallback of the first
//!                                                        candidate (opaque)
//! ```
//!
//! Structural errors never escape a layer boundary; only a misconfigured
//! decoder table makes [`Dissector::decode_frame`] fail.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use super::table::{DecoderTable, FixedDecoderTable, Resolved};
use super::{Candidates, DecodeContext, Decoded, DecodedHeader, Decoder, DecoderHandle};
use crate::error::{ConfigError, DecodeError};
use crate::packet::{Fixups, IllegalLayer, Layer, OpaqueLayer, Packet};
use crate::source::RawFrame;
use crate::tag::{link_type, ProtocolTag, TagCatalog, TagKind};

/// Maximum number of nested layers; deeper bytes stay opaque.
pub const MAX_DEPTH: usize = 32;

/// Decodes frames into layer chains using a tag catalog and decoder table.
///
/// Cheap to clone; the catalog and table are shared.
#[derive(Debug, Clone)]
pub struct Dissector {
    tags: Arc<TagCatalog>,
    table: Arc<dyn DecoderTable>,
}

impl Default for Dissector {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Dissector {
    pub fn new(tags: Arc<TagCatalog>, table: Arc<dyn DecoderTable>) -> Self {
        Self { tags, table }
    }

    /// Built-in tags with the fixed built-in table.
    pub fn builtin() -> Self {
        Self::new(
            Arc::new(TagCatalog::builtin()),
            Arc::new(FixedDecoderTable::builtin()),
        )
    }

    pub fn tags(&self) -> &TagCatalog {
        &self.tags
    }

    pub fn table(&self) -> &dyn DecoderTable {
        self.table.as_ref()
    }

    /// Candidate tags for the outermost layer of a frame.
    ///
    /// Raw-IP link types do not say which IP version follows, so both are
    /// offered, IPv4 first.
    pub fn link_candidates(&self, dlt: u16) -> Candidates {
        let values: &[u16] = match dlt {
            link_type::RAW_LEGACY | link_type::RAW_OPENBSD | link_type::RAW => {
                &[link_type::IPV4, link_type::IPV6]
            }
            _ => std::slice::from_ref(&dlt),
        };
        values
            .iter()
            .map(|&v| self.link_tag(v))
            .collect()
    }

    fn link_tag(&self, value: u16) -> ProtocolTag {
        self.tags
            .lookup(TagKind::DataLinkType, value as u32)
            .unwrap_or_else(|_| ProtocolTag::unknown(TagKind::DataLinkType, value as u32))
    }

    /// Decode one captured frame.
    ///
    /// Never fails on bad input: undecodable bytes end the chain in an
    /// opaque or illegal layer.
    pub fn decode_frame(&self, dlt: u16, data: impl Into<Bytes>) -> Result<Layer, ConfigError> {
        let candidates = self.link_candidates(dlt);
        self.decode(&candidates, data)
    }

    /// Decode a frame from a [`FrameSource`](crate::source::FrameSource).
    pub fn decode_raw(&self, frame: &RawFrame) -> Result<Layer, ConfigError> {
        self.decode_frame(frame.link_type, frame.data.clone())
    }

    /// Decode `data` as the layer announced by `candidates`.
    pub fn decode(&self, candidates: &[ProtocolTag], data: impl Into<Bytes>) -> Result<Layer, ConfigError> {
        self.decode_layer(candidates, data.into(), 0, 0)
    }

    /// Like [`decode`](Self::decode) for bytes that sit `offset` bytes into
    /// their frame, e.g. a reassembled fragment payload.
    pub fn decode_at(
        &self,
        candidates: &[ProtocolTag],
        data: impl Into<Bytes>,
        offset: usize,
    ) -> Result<Layer, ConfigError> {
        self.decode_layer(candidates, data.into(), offset, 0)
    }

    fn decode_layer(
        &self,
        candidates: &[ProtocolTag],
        data: Bytes,
        offset: usize,
        depth: usize,
    ) -> Result<Layer, ConfigError> {
        let first = candidates.first().copied();
        if data.is_empty() {
            return Ok(opaque(offset, first, data));
        }
        if depth >= MAX_DEPTH {
            debug!(offset, depth, "nesting limit reached, keeping the rest opaque");
            return Ok(opaque(offset, first, data));
        }

        let ctx = DecodeContext::new(&self.tags);
        let mut first_error: Option<(ProtocolTag, DecodeError)> = None;
        let mut fallback: Option<(ProtocolTag, DecoderHandle)> = None;

        for tag in candidates {
            let handle = match self.table.resolve(tag)? {
                Resolved::Mapped(handle) => handle,
                Resolved::Fallback(handle) => {
                    trace!(%tag, "no decoder mapped");
                    fallback.get_or_insert((*tag, handle));
                    continue;
                }
            };
            trace!(%tag, decoder = handle.name(), offset, "trying decoder");
            match handle.decode(&data, &ctx) {
                Ok(decoded) => return self.accept(decoded, *tag, data, offset, depth),
                Err(error) => {
                    trace!(%tag, %error, "decoder rejected bytes");
                    first_error.get_or_insert((*tag, error));
                }
            }
        }

        if let Some((tag, error)) = first_error {
            return Ok(illegal(tag, data, offset, error));
        }
        let Some((tag, handle)) = fallback else {
            return Ok(opaque(offset, first, data));
        };
        match handle.decode(&data, &ctx) {
            Ok(decoded) => self.accept(decoded, tag, data, offset, depth),
            Err(error) => Ok(illegal(tag, data, offset, error)),
        }
    }

    fn accept(
        &self,
        decoded: Decoded,
        tag: ProtocolTag,
        data: Bytes,
        offset: usize,
        depth: usize,
    ) -> Result<Layer, ConfigError> {
        match decoded {
            Decoded::Header(header) => self.finish(header, data, offset, depth),
            Decoded::Opaque => Ok(opaque(offset, Some(tag), data)),
        }
    }

    /// Split the bytes after a decoded header into payload and trailer and
    /// recurse into the payload.
    fn finish(
        &self,
        decoded: DecodedHeader,
        data: Bytes,
        offset: usize,
        depth: usize,
    ) -> Result<Layer, ConfigError> {
        let header_len = decoded.header.len().min(data.len());
        let rest = data.slice(header_len..);
        let (body, trailer) = match decoded.payload_len {
            Some(n) if n < rest.len() => (rest.slice(..n), rest.slice(n..)),
            _ => (rest, Bytes::new()),
        };

        let payload_offset = offset + header_len;
        let payload = if body.is_empty() {
            None
        } else {
            let layer = match &decoded.next {
                Some(next) => self.decode_layer(next, body, payload_offset, depth + 1)?,
                None => opaque(payload_offset, None, body),
            };
            Some(Box::new(layer))
        };

        Ok(Layer::Packet(Packet {
            offset,
            header: decoded.header,
            payload,
            trailer,
            fixups: Fixups::NONE,
        }))
    }
}

fn opaque(offset: usize, tag: Option<ProtocolTag>, data: Bytes) -> Layer {
    Layer::Opaque(OpaqueLayer { offset, tag, data })
}

fn illegal(tag: ProtocolTag, data: Bytes, offset: usize, error: DecodeError) -> Layer {
    debug!(%tag, offset, len = data.len(), %error, "illegal layer");
    Layer::Illegal(IllegalLayer {
        offset,
        tag,
        data,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ConfiguredDecoderTable;
    use crate::protocol::test_utils::{
        EthernetBuilder, Ipv4Builder, Ipv6Builder, TcpBuilder, UdpBuilder,
    };
    use crate::protocol::{Header, HeaderKind};
    use crate::tag::{ethertype, ip_number};

    /// Sum of header, trailer and terminal lengths over the whole chain.
    fn conserved_len(layer: &Layer) -> usize {
        layer
            .iter()
            .map(|l| match l {
                Layer::Packet(p) => p.header.len() + p.trailer.len(),
                Layer::Opaque(o) => o.data.len(),
                Layer::Illegal(i) => i.data.len(),
            })
            .sum()
    }

    fn eth_ipv4_tcp() -> Vec<u8> {
        let tcp = TcpBuilder::new().build();
        let ip = Ipv4Builder::new().payload(tcp).build();
        EthernetBuilder::new().payload(ip).build()
    }

    #[test]
    fn test_decode_ethernet_ipv4_tcp() {
        let frame = eth_ipv4_tcp();
        assert_eq!(frame.len(), 54);

        let chain = Dissector::builtin()
            .decode_frame(link_type::ETHERNET, frame)
            .unwrap();
        let names: Vec<&str> = chain.iter().map(Layer::name).collect();
        assert_eq!(names, vec!["ethernet", "ipv4", "tcp"]);
        assert!(chain.iter().all(|l| l.as_packet().is_some()));

        let tcp = chain.find(HeaderKind::Tcp).unwrap();
        assert_eq!(tcp.offset, 34);
        assert_eq!(tcp.payload_len(), 0);
        assert_eq!(conserved_len(&chain), 54);
    }

    #[test]
    fn test_truncated_option_is_illegal() {
        // TCP header claims 24 bytes but the capture ends mid-option
        let tcp = TcpBuilder::new()
            .options(vec![0x02, 0x04, 0x05, 0xb4])
            .build();
        let ip = Ipv4Builder::new().payload(tcp).build();
        let mut frame = EthernetBuilder::new().payload(ip).build();
        frame.truncate(frame.len() - 2);

        let chain = Dissector::builtin()
            .decode_frame(link_type::ETHERNET, frame.clone())
            .unwrap();
        let ip = chain.find(HeaderKind::Ipv4).unwrap();
        let Header::Ipv4(ipv4) = &ip.header else {
            panic!("expected IPv4");
        };
        assert_eq!(ipv4.total_length, 44);

        let Layer::Illegal(bad) = chain.terminal() else {
            panic!("expected an illegal terminal layer");
        };
        assert_eq!(bad.tag.value(), ip_number::TCP as u32);
        assert_eq!(bad.offset, 34);
        assert_eq!(&bad.data[..], &frame[34..]);
        assert_eq!(conserved_len(&chain), frame.len());
    }

    #[test]
    fn test_ethernet_padding_becomes_trailer() {
        let udp = UdpBuilder::new().payload(vec![0xab; 4]).build();
        let ip = Ipv4Builder::new().udp().payload(udp).build();
        let mut frame = EthernetBuilder::new().payload(ip).build();
        frame.resize(60, 0); // Minimum Ethernet frame

        let chain = Dissector::builtin()
            .decode_frame(link_type::ETHERNET, frame.clone())
            .unwrap();
        // IPv4 total length bounds the datagram; the padding hangs off it
        let ip = chain.find(HeaderKind::Ipv4).unwrap();
        assert_eq!(ip.trailer.len(), 60 - 46);
        assert!(chain.as_packet().unwrap().trailer.is_empty());
        assert_eq!(chain.len(), 60);
        assert_eq!(conserved_len(&chain), 60);
        assert_eq!(chain.to_bytes(), frame);

        // UDP port 53 has no decoder: the DNS bytes stay opaque, tagged
        let Layer::Opaque(dns) = chain.terminal() else {
            panic!("expected an opaque terminal layer");
        };
        assert_eq!(dns.tag.map(|t| t.value()), Some(54321));
        assert_eq!(dns.data.len(), 4);
    }

    #[test]
    fn test_raw_ip_tries_ipv4_then_ipv6() {
        let dissector = Dissector::builtin();
        let candidates = dissector.link_candidates(link_type::RAW);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].value(), link_type::IPV4 as u32);

        let packet = Ipv6Builder::new()
            .next_header(ip_number::UDP)
            .payload(UdpBuilder::new().build())
            .build();
        let chain = dissector.decode_frame(link_type::RAW, packet).unwrap();
        assert_eq!(chain.name(), "ipv6");
        assert!(chain.contains(HeaderKind::Udp));
    }

    #[test]
    fn test_all_candidates_fail_reports_first_error() {
        let dissector = Dissector::builtin();
        let chain = dissector.decode_frame(link_type::RAW, vec![0x00; 10]).unwrap();
        let Layer::Illegal(bad) = chain else {
            panic!("expected an illegal layer");
        };
        assert_eq!(bad.tag.value(), link_type::IPV4 as u32);
        assert!(matches!(bad.error, DecodeError::Malformed { protocol: "ipv4", .. }));
        assert_eq!(bad.data.len(), 10);
    }

    #[test]
    fn test_gtp_inner_ipv6() {
        let inner = Ipv6Builder::new()
            .next_header(ip_number::IPV6_NONXT)
            .build();
        let mut gtp = vec![0x30, 0xff];
        gtp.extend_from_slice(&(inner.len() as u16).to_be_bytes());
        gtp.extend_from_slice(&[0x00, 0x00, 0x00, 0x07]);
        gtp.extend_from_slice(&inner);
        let udp = UdpBuilder::new().ports(2152, 2152).payload(gtp).build();
        let ip = Ipv4Builder::new().udp().payload(udp).build();
        let frame = EthernetBuilder::new().payload(ip).build();

        let chain = Dissector::builtin()
            .decode_frame(link_type::ETHERNET, frame.clone())
            .unwrap();
        let names: Vec<&str> = chain.iter().map(Layer::name).collect();
        assert_eq!(names, vec!["ethernet", "ipv4", "udp", "gtpv1", "ipv6"]);
        assert_eq!(conserved_len(&chain), frame.len());
    }

    #[test]
    fn test_unknown_tls_content_type_is_illegal() {
        let record = vec![0x63, 0x03, 0x03, 0x00, 0x01, 0x00];
        let tcp = TcpBuilder::new().ports(50000, 443).payload(record).build();
        let ip = Ipv4Builder::new().payload(tcp).build();
        let chain = Dissector::builtin()
            .decode(&[ProtocolTag::unknown(TagKind::EtherType, ethertype::IPV4 as u32)], ip)
            .unwrap();
        let Layer::Illegal(bad) = chain.terminal() else {
            panic!("expected an illegal layer");
        };
        assert_eq!(bad.tag.value(), 443);
        assert!(matches!(bad.error, DecodeError::Tag { protocol: "tls", .. }));
    }

    #[test]
    fn test_no_next_header_is_opaque() {
        let packet = Ipv6Builder::new()
            .next_header(ip_number::IPV6_NONXT)
            .payload(vec![0xee; 6])
            .build();
        let chain = Dissector::builtin()
            .decode_frame(link_type::IPV6, packet)
            .unwrap();
        let Layer::Opaque(rest) = chain.terminal() else {
            panic!("expected opaque bytes");
        };
        assert_eq!(rest.tag.map(|t| t.value()), Some(59));
        assert_eq!(rest.data.len(), 6);
    }

    #[test]
    fn test_nesting_limit() {
        let mut packet = UdpBuilder::new().build();
        for _ in 0..40 {
            packet = Ipv4Builder::new().protocol(ip_number::IPIP).payload(packet).build();
        }
        let len = packet.len();
        let chain = Dissector::builtin()
            .decode_frame(link_type::IPV4, packet)
            .unwrap();
        assert_eq!(chain.depth(), MAX_DEPTH + 1);
        assert!(matches!(chain.terminal(), Layer::Opaque(_)));
        assert_eq!(conserved_len(&chain), len);
    }

    #[test]
    fn test_empty_frame() {
        let chain = Dissector::builtin()
            .decode_frame(link_type::ETHERNET, Vec::new())
            .unwrap();
        assert!(chain.is_empty());
        assert!(matches!(chain, Layer::Opaque(_)));
    }

    #[test]
    fn test_configured_table_decodes_identically() {
        let fixed = Dissector::builtin();
        let configured = Dissector::new(
            Arc::new(TagCatalog::builtin()),
            Arc::new(ConfiguredDecoderTable::builtin()),
        );
        let frame = eth_ipv4_tcp();
        assert_eq!(
            fixed.decode_frame(link_type::ETHERNET, frame.clone()),
            configured.decode_frame(link_type::ETHERNET, frame)
        );
    }

    #[test]
    fn test_config_error_propagates() {
        let config = crate::decode::DecoderConfig::parse(
            "Packet.classFor.DataLinkType.1 = ethernet\n\
             Packet.classFor.EtherType.2048 = nope\n",
        );
        let dissector = Dissector::new(
            Arc::new(TagCatalog::builtin()),
            Arc::new(ConfiguredDecoderTable::new(
                Arc::new(config),
                crate::decode::DecoderCatalog::builtin(),
            )),
        );
        let result = dissector.decode_frame(link_type::ETHERNET, eth_ipv4_tcp());
        assert!(matches!(result, Err(ConfigError::UnknownDecoder { .. })));
    }
}
