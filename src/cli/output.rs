//! Output formatting for decoded frames.
//!
//! `tree` prints one line per layer, indented by depth, with the header's
//! key fields; `line` prints one summary line per frame.

use std::io::Write;

use clap::ValueEnum;
use pktchain_core::buffer::hex::to_hex_string;
use pktchain_core::protocol::tcp_flags;
use pktchain_core::{Header, Layer, Packet, RawFrame};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented layer tree (default)
    Tree,
    /// One line per frame
    Line,
}

/// Bytes per line of a hex dump.
const HEX_WIDTH: usize = 16;

/// Formats decoded frames.
pub struct OutputFormatter {
    format: OutputFormat,
    hex: bool,
}

impl OutputFormatter {
    /// Create a new formatter with the specified format.
    pub fn new(format: OutputFormat, hex: bool) -> Self {
        Self { format, hex }
    }

    /// Write one captured frame and its decoded chain.
    pub fn write_frame<W: Write>(
        &self,
        frame: &RawFrame,
        chain: &Layer,
        writer: &mut W,
    ) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Tree => {
                writeln!(
                    writer,
                    "Frame {}: {} bytes on wire, {} captured, link type {}",
                    frame.frame_number,
                    frame.original_length,
                    frame.data.len(),
                    frame.link_type
                )?;
                self.write_tree(chain, writer)
            }
            OutputFormat::Line => {
                let ts = frame.timestamp_us;
                writeln!(
                    writer,
                    "{} {}.{:06} {} {}",
                    frame.frame_number,
                    ts.div_euclid(1_000_000),
                    ts.rem_euclid(1_000_000),
                    frame.data.len(),
                    layer_path(chain)
                )
            }
        }
    }

    /// Write a datagram rebuilt from `fragments` fragments, completed by
    /// frame `frame_number`.
    pub fn write_reassembled<W: Write>(
        &self,
        frame_number: u64,
        fragments: usize,
        packet: &Packet,
        writer: &mut W,
    ) -> std::io::Result<()> {
        let chain = Layer::Packet(packet.clone());
        match self.format {
            OutputFormat::Tree => {
                writeln!(
                    writer,
                    "Reassembled in frame {frame_number}: {} bytes from {fragments} fragments",
                    chain.len()
                )?;
                self.write_tree(&chain, writer)
            }
            OutputFormat::Line => writeln!(
                writer,
                "{frame_number} reassembled {} {}",
                chain.len(),
                layer_path(&chain)
            ),
        }
    }

    fn write_tree<W: Write>(&self, chain: &Layer, writer: &mut W) -> std::io::Result<()> {
        for (depth, layer) in chain.iter().enumerate() {
            let indent = "  ".repeat(depth + 1);
            match layer {
                Layer::Packet(p) => {
                    writeln!(
                        writer,
                        "{indent}{:<16} @{:<5} {:>5} bytes  {}",
                        p.header.name(),
                        p.offset,
                        p.header.len(),
                        summary(&p.header)
                    )?;
                    if !p.trailer.is_empty() {
                        writeln!(writer, "{indent}  trailer: {} bytes", p.trailer.len())?;
                        self.write_hex(&p.trailer, &indent, writer)?;
                    }
                }
                Layer::Opaque(o) => {
                    let tag = o.tag.map(|t| format!("  after {} {t}", t.kind())).unwrap_or_default();
                    writeln!(
                        writer,
                        "{indent}{:<16} @{:<5} {:>5} bytes{tag}",
                        "opaque",
                        o.offset,
                        o.data.len()
                    )?;
                    self.write_hex(&o.data, &indent, writer)?;
                }
                Layer::Illegal(i) => {
                    writeln!(
                        writer,
                        "{indent}{:<16} @{:<5} {:>5} bytes  {}: {}",
                        "illegal",
                        i.offset,
                        i.data.len(),
                        i.tag.kind(),
                        i.error
                    )?;
                    self.write_hex(&i.data, &indent, writer)?;
                }
            }
        }
        Ok(())
    }

    fn write_hex<W: Write>(&self, data: &[u8], indent: &str, writer: &mut W) -> std::io::Result<()> {
        if !self.hex {
            return Ok(());
        }
        for (i, chunk) in data.chunks(HEX_WIDTH).enumerate() {
            writeln!(writer, "{indent}  {:04x}  {}", i * HEX_WIDTH, to_hex_string(chunk, " "))?;
        }
        Ok(())
    }
}

/// Layer names joined by `/`, e.g. `ethernet/ipv4/tcp`.
pub fn layer_path(chain: &Layer) -> String {
    chain.iter().map(Layer::name).collect::<Vec<_>>().join("/")
}

/// Key fields of a header, for the tree view.
fn summary(header: &Header) -> String {
    match header {
        Header::Ethernet(h) => format!("{} -> {}  {}", h.source, h.destination, h.ether_type),
        Header::LinuxSll(h) => format!("packet type {}  {}", h.packet_type, h.protocol),
        Header::BsdLoopback(h) => h.family.to_string(),
        Header::Vlan(h) => format!("vlan {} pcp {}  {}", h.vlan_id, h.priority, h.ether_type),
        Header::Arp(h) => format!(
            "{}  {} -> {}",
            h.operation, h.sender_protocol, h.target_protocol
        ),
        Header::Ipv4(h) => {
            let mut s = format!(
                "{} -> {}  ttl {}  id 0x{:04x}  {}",
                h.source, h.destination, h.ttl, h.identification, h.protocol
            );
            if h.is_fragment() {
                s.push_str(&format!(
                    "  fragment offset {}{}",
                    h.fragment_offset as usize * 8,
                    if h.more_fragments() { " MF" } else { "" }
                ));
            }
            s
        }
        Header::Ipv6(h) => format!(
            "{} -> {}  hop limit {}  {}",
            h.source, h.destination, h.hop_limit, h.next_header
        ),
        Header::Ipv6Extension(h) => h.next_header.to_string(),
        Header::Ipv6Fragment(h) => format!(
            "id 0x{:08x}  offset {}{}  {}",
            h.identification,
            h.fragment_offset as usize * 8,
            if h.more_fragments { " M" } else { "" },
            h.next_header
        ),
        Header::Tcp(h) => format!(
            "{} -> {}  [{}]  seq {}",
            h.source_port.value(),
            h.destination_port.value(),
            flag_names(h.flags),
            h.sequence
        ),
        Header::Udp(h) => format!(
            "{} -> {}  len {}",
            h.source_port.value(),
            h.destination_port.value(),
            h.length
        ),
        Header::Icmpv4(h) => format!("{} code {}", h.icmp_type, h.code),
        Header::Icmpv6(h) => format!("{} code {}", h.icmp_type, h.code),
        Header::Sctp(h) => format!(
            "{} -> {}  vtag 0x{:08x}",
            h.source_port.value(),
            h.destination_port.value(),
            h.verification_tag
        ),
        Header::Gtp(h) => format!("{}  teid 0x{:08x}", h.message_type, h.teid),
        Header::TlsRecord(h) => format!("{}  version 0x{:04x}  len {}", h.content_type, h.version, h.length),
        Header::Heartbeat(h) => format!("{}  payload {}", h.message_type, h.payload_length),
    }
}

fn flag_names(flags: u16) -> String {
    const NAMES: [(u16, &str); 9] = [
        (tcp_flags::NS, "NS"),
        (tcp_flags::CWR, "CWR"),
        (tcp_flags::ECE, "ECE"),
        (tcp_flags::URG, "URG"),
        (tcp_flags::ACK, "ACK"),
        (tcp_flags::PSH, "PSH"),
        (tcp_flags::RST, "RST"),
        (tcp_flags::SYN, "SYN"),
        (tcp_flags::FIN, "FIN"),
    ];
    NAMES
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pktchain_core::Dissector;

    /// Ethernet / IPv4 / TCP SYN, 54 bytes.
    fn tcp_syn() -> RawFrame {
        let data = vec![
            // Ethernet
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0x08, 0x00,
            // IPv4: 20 bytes, total length 40, TTL 64, TCP
            0x45, 0x00, 0x00, 0x28, 0x12, 0x34, 0x00, 0x00, 0x40, 0x06, 0x00, 0x00,
            0xc0, 0xa8, 0x01, 0x64, // 192.168.1.100
            0x0a, 0x00, 0x00, 0x01, // 10.0.0.1
            // TCP: 12345 -> 80, seq 1, SYN
            0x30, 0x39, 0x00, 0x50, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
            0x50, 0x02, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut frame = RawFrame::new(1, 1, data);
        frame.timestamp_us = 1_700_000_000_000_500;
        frame
    }

    fn render(format: OutputFormat, hex: bool, frame: &RawFrame) -> String {
        let chain = Dissector::builtin().decode_raw(frame).unwrap();
        let mut out = Vec::new();
        OutputFormatter::new(format, hex)
            .write_frame(frame, &chain, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_line_format() {
        assert_eq!(
            render(OutputFormat::Line, false, &tcp_syn()),
            "1 1700000000.000500 54 ethernet/ipv4/tcp\n"
        );
    }

    #[test]
    fn test_tree_format() {
        let text = render(OutputFormat::Tree, false, &tcp_syn());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Frame 1: 54 bytes on wire"));
        assert!(lines[1].trim_start().starts_with("ethernet"));
        assert!(lines[2].contains("192.168.1.100 -> 10.0.0.1"));
        assert!(lines[3].contains("12345 -> 80  [SYN]  seq 1"));
    }

    #[test]
    fn test_hex_dump_of_illegal_layer() {
        let mut frame = tcp_syn();
        frame.data.truncate(40);
        let text = render(OutputFormat::Tree, true, &frame);
        assert!(text.contains("illegal"));
        // 6 bytes of the cut TCP header
        assert!(text.contains("0000  30 39 00 50 00 00"));
    }

    #[test]
    fn test_flag_names() {
        assert_eq!(flag_names(tcp_flags::SYN | tcp_flags::ACK), "ACK,SYN");
        assert_eq!(flag_names(0), "");
    }
}
