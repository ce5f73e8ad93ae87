//! PCAP and PCAPNG file reader.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bytes::Bytes;
use flate2::read::GzDecoder;
use pcap_parser::pcapng::Block;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError, PcapNGReader};
use pktchain_core::tag::link_type;
use pktchain_core::{FrameSource, RawFrame};
use tracing::debug;

use crate::error::{Error, PcapError as OurPcapError};

/// Buffer size for reading PCAP files (64KB).
const BUFFER_SIZE: usize = 65536;

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Timestamp resolution of legacy files, as a pcapng `if_tsresol` value.
const MICROSECONDS: u8 = 6;
const NANOSECONDS: u8 = 9;

type Input = BufReader<Box<dyn Read + Send>>;

/// Link type and clock of one capture interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interface {
    link_type: u16,
    ts_resolution: u8,
}

impl Default for Interface {
    fn default() -> Self {
        Self {
            link_type: link_type::ETHERNET,
            ts_resolution: MICROSECONDS,
        }
    }
}

enum ReaderInner {
    Legacy(LegacyPcapReader<Input>),
    Ng(PcapNGReader<Input>),
}

/// What one step of the block parser produced.
enum Step {
    Frame {
        timestamp_us: i64,
        original_length: u32,
        link_type: u16,
        data: Bytes,
    },
    Skip,
    Eof,
}

/// Frame source over a PCAP or PCAPNG file, with optional gzip
/// decompression.
pub struct PcapFrameSource {
    inner: ReaderInner,
    frame_number: u64,
    /// Interfaces of the current section; legacy files have exactly one
    interfaces: Vec<Interface>,
}

impl PcapFrameSource {
    /// Open a capture file for reading.
    ///
    /// Automatically detects and decompresses gzipped files.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let gzipped = is_gzip_file(path)?;

        // Peek at the magic number, then start over for the parser
        let mut magic = [0u8; 4];
        open_input(path, gzipped)?.read_exact(&mut magic).map_err(|_| {
            Error::Pcap(OurPcapError::InvalidFormat {
                reason: "File too short to read magic number".to_string(),
            })
        })?;
        let input = open_input(path, gzipped)?;

        let inner = match &magic {
            // PCAP, micro- or nanosecond, either byte order
            [0xd4, 0xc3, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0xc3, 0xd4]
            | [0x4d, 0x3c, 0xb2, 0xa1]
            | [0xa1, 0xb2, 0x3c, 0x4d] => {
                let reader = LegacyPcapReader::new(BUFFER_SIZE, input).map_err(|e| {
                    Error::Pcap(OurPcapError::InvalidFormat {
                        reason: format!("Failed to parse PCAP header: {e}"),
                    })
                })?;
                ReaderInner::Legacy(reader)
            }
            // PCAPNG
            [0x0a, 0x0d, 0x0d, 0x0a] => {
                let reader = PcapNGReader::new(BUFFER_SIZE, input).map_err(|e| {
                    Error::Pcap(OurPcapError::InvalidFormat {
                        reason: format!("Failed to parse PCAPNG header: {e}"),
                    })
                })?;
                ReaderInner::Ng(reader)
            }
            _ => {
                return Err(Error::Pcap(OurPcapError::InvalidFormat {
                    reason: format!("Unknown magic number: {magic:02x?}"),
                }))
            }
        };

        debug!(path = %path.display(), gzipped, "opened capture");
        Ok(Self {
            inner,
            frame_number: 0,
            interfaces: Vec::new(),
        })
    }

    /// Number of frames read so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }
}

impl FrameSource for PcapFrameSource {
    fn next_frame(&mut self) -> Result<Option<RawFrame>, pktchain_core::Error> {
        loop {
            let step = match &mut self.inner {
                ReaderInner::Legacy(reader) => legacy_step(reader, &mut self.interfaces)?,
                ReaderInner::Ng(reader) => ng_step(reader, &mut self.interfaces)?,
            };
            match step {
                Step::Frame {
                    timestamp_us,
                    original_length,
                    link_type,
                    data,
                } => {
                    self.frame_number += 1;
                    return Ok(Some(RawFrame {
                        frame_number: self.frame_number,
                        timestamp_us,
                        original_length,
                        link_type,
                        data,
                    }));
                }
                Step::Skip => continue,
                Step::Eof => return Ok(None),
            }
        }
    }

    fn link_type(&self) -> Option<u16> {
        let first = self.interfaces.first()?;
        self.interfaces
            .iter()
            .all(|i| i.link_type == first.link_type)
            .then_some(first.link_type)
    }
}

fn legacy_step(
    reader: &mut LegacyPcapReader<Input>,
    interfaces: &mut Vec<Interface>,
) -> Result<Step, OurPcapError> {
    match reader.next() {
        Ok((offset, block)) => {
            let step = match block {
                PcapBlockOwned::LegacyHeader(header) => {
                    interfaces.clear();
                    interfaces.push(Interface {
                        link_type: header.network.0 as u16,
                        ts_resolution: if header.is_nanosecond_precision() {
                            NANOSECONDS
                        } else {
                            MICROSECONDS
                        },
                    });
                    Step::Skip
                }
                PcapBlockOwned::Legacy(packet) => {
                    let interface = interfaces.first().copied().unwrap_or_default();
                    let fraction = to_micros(packet.ts_usec as u64, interface.ts_resolution);
                    Step::Frame {
                        timestamp_us: packet.ts_sec as i64 * 1_000_000 + fraction,
                        original_length: packet.origlen,
                        link_type: interface.link_type,
                        data: Bytes::copy_from_slice(captured(packet.data, packet.caplen)),
                    }
                }
                _ => Step::Skip,
            };
            reader.consume(offset);
            Ok(step)
        }
        Err(PcapError::Eof) => Ok(Step::Eof),
        Err(PcapError::Incomplete(_)) => {
            reader.refill().map_err(|e| OurPcapError::InvalidFormat {
                reason: format!("Refill error: {e}"),
            })?;
            Ok(Step::Skip)
        }
        Err(e) => Err(OurPcapError::InvalidFormat {
            reason: format!("Parse error: {e}"),
        }),
    }
}

fn ng_step(
    reader: &mut PcapNGReader<Input>,
    interfaces: &mut Vec<Interface>,
) -> Result<Step, OurPcapError> {
    match reader.next() {
        Ok((offset, block)) => {
            let step = match block {
                PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                    // Interface ids restart with every section
                    interfaces.clear();
                    Step::Skip
                }
                PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                    interfaces.push(Interface {
                        link_type: idb.linktype.0 as u16,
                        ts_resolution: idb.if_tsresol,
                    });
                    Step::Skip
                }
                PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                    let interface = interfaces.get(epb.if_id as usize).copied().unwrap_or_default();
                    let ticks = ((epb.ts_high as u64) << 32) | epb.ts_low as u64;
                    Step::Frame {
                        timestamp_us: to_micros(ticks, interface.ts_resolution),
                        original_length: epb.origlen,
                        link_type: interface.link_type,
                        data: Bytes::copy_from_slice(captured(epb.data, epb.caplen)),
                    }
                }
                PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                    // No timestamp in simple packets
                    let interface = interfaces.first().copied().unwrap_or_default();
                    Step::Frame {
                        timestamp_us: 0,
                        original_length: spb.origlen,
                        link_type: interface.link_type,
                        data: Bytes::copy_from_slice(captured(spb.data, spb.origlen)),
                    }
                }
                _ => Step::Skip,
            };
            reader.consume(offset);
            Ok(step)
        }
        Err(PcapError::Eof) => Ok(Step::Eof),
        Err(PcapError::Incomplete(_)) => {
            reader.refill().map_err(|e| OurPcapError::InvalidFormat {
                reason: format!("Refill error: {e}"),
            })?;
            Ok(Step::Skip)
        }
        Err(e) => Err(OurPcapError::InvalidFormat {
            reason: format!("Parse error: {e}"),
        }),
    }
}

/// Packet bytes without block padding.
fn captured(data: &[u8], caplen: u32) -> &[u8] {
    &data[..(caplen as usize).min(data.len())]
}

/// Convert `ticks` of a pcapng `if_tsresol` clock to microseconds.
///
/// Bit 7 clear: units of 10^-n seconds. Bit 7 set: units of 2^-n seconds.
fn to_micros(ticks: u64, resolution: u8) -> i64 {
    let exp = (resolution & 0x7f) as u32;
    let micros = if resolution & 0x80 == 0 {
        if exp >= 6 {
            10u64.checked_pow(exp - 6).map_or(0, |unit| ticks / unit)
        } else {
            ticks.saturating_mul(10u64.pow(6 - exp))
        }
    } else {
        ((ticks as u128 * 1_000_000) >> exp) as u64
    };
    micros as i64
}

fn open_input(path: &Path, gzipped: bool) -> Result<Input, Error> {
    let file = File::open(path).map_err(|_| {
        Error::Pcap(OurPcapError::FileNotFound {
            path: path.display().to_string(),
        })
    })?;
    let reader: Box<dyn Read + Send> = if gzipped {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(BufReader::with_capacity(BUFFER_SIZE, reader))
}

/// Check if a file is gzipped by extension or magic bytes.
fn is_gzip_file(path: &Path) -> Result<bool, Error> {
    if is_gzip_extension(path) {
        return Ok(true);
    }

    let mut file = File::open(path).map_err(|_| {
        Error::Pcap(OurPcapError::FileNotFound {
            path: path.display().to_string(),
        })
    })?;

    let mut magic = [0u8; 2];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        Err(_) => Ok(false), // File too short to be gzipped
    }
}

/// Check if a path appears to be a gzip file by extension only.
pub fn is_gzip_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|f| f.to_str())
        .is_some_and(|name| name.to_lowercase().ends_with(".gz"))
}
