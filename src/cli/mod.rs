//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Building the dissector from the built-in or a configured mapping
//! - Driving frames from a source through the dissector (and, on request,
//!   the fragment reassembler) into the output formatter

mod args;
mod output;

pub use args::Args;
pub use output::{layer_path, OutputFormat, OutputFormatter};

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use pktchain_core::{
    ConfigLoader, ConfiguredDecoderTable, Decoder, DecoderCatalog, Dissector, FragmentKey,
    FragmentSet, FrameSource, Layer, Packet, Reassembly, TagCatalog,
};
use tracing::{debug, info, warn};

/// Per-run options, taken from [`Args`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub limit: Option<u64>,
    pub defrag: bool,
}

impl From<&Args> for RunOptions {
    fn from(args: &Args) -> Self {
        Self {
            limit: args.limit,
            defrag: args.defrag,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub frames: u64,
    /// Frames whose chain ends in an illegal layer
    pub illegal: u64,
    /// Datagrams rebuilt from fragments
    pub reassembled: u64,
    /// Datagrams still missing fragments at end of input
    pub incomplete: usize,
}

/// Dissector over the built-in tables, or over the mapping in `decoders`.
///
/// A mapping with any invalid entry is rejected up front.
pub fn build_dissector(decoders: Option<&Path>) -> Result<Dissector> {
    let Some(path) = decoders else {
        return Ok(Dissector::builtin());
    };

    let config = ConfigLoader::new()
        .load(path)
        .with_context(|| format!("Failed to load decoder mapping: {}", path.display()))?;
    let catalog = DecoderCatalog::builtin();
    let errors = config.validate(&catalog);
    if let Some(first) = errors.first() {
        bail!(
            "{} invalid entries in {}, first: {first}",
            errors.len(),
            path.display()
        );
    }

    info!(path = %path.display(), mappings = config.len(), "using configured decoder mapping");
    let table = ConfiguredDecoderTable::new(config, catalog);
    Ok(Dissector::new(Arc::new(TagCatalog::builtin()), Arc::new(table)))
}

/// Decode every frame of `source` and print it.
pub fn run<S: FrameSource, W: Write>(
    source: &mut S,
    dissector: &Dissector,
    formatter: &OutputFormatter,
    options: &RunOptions,
    out: &mut W,
) -> Result<Summary> {
    let mut summary = Summary::default();
    let mut reassembler = options.defrag.then(FragmentSet::new);

    while options.limit.map_or(true, |limit| summary.frames < limit) {
        let Some(frame) = source.next_frame().context("Failed to read frame")? else {
            break;
        };
        summary.frames += 1;

        let chain = dissector
            .decode_raw(&frame)
            .with_context(|| format!("Decoder mapping failed on frame {}", frame.frame_number))?;
        if chain.terminal().is_illegal() {
            summary.illegal += 1;
            debug!(frame = frame.frame_number, path = %layer_path(&chain), "illegal layer");
        }
        formatter.write_frame(&frame, &chain, out)?;

        let Some(set) = reassembler.as_mut() else {
            continue;
        };
        let Some(fragment) = first_fragment(&chain) else {
            continue;
        };
        match set.push(fragment.clone(), dissector) {
            Ok(Reassembly::Complete { packet, fragments }) => {
                summary.reassembled += 1;
                formatter.write_reassembled(frame.frame_number, fragments, &packet, out)?;
            }
            Ok(_) => {}
            Err(e) => warn!(frame = frame.frame_number, error = %e, "dropping fragment set"),
        }
    }

    if let Some(set) = reassembler.as_mut() {
        summary.incomplete = set.pending();
        for (key, group) in set.drain() {
            warn!(?key, fragments = group.len(), "datagram incomplete at end of input");
        }
    }
    out.flush()?;
    Ok(summary)
}

/// Outermost IP packet of `chain` that is a fragment.
fn first_fragment(chain: &Layer) -> Option<&Packet> {
    chain
        .iter()
        .filter_map(Layer::as_packet)
        .find(|p| FragmentKey::of(p).is_some())
}

/// Print the decoder identifiers a mapping may use.
pub fn list_decoders<W: Write>(out: &mut W) -> std::io::Result<()> {
    let catalog = DecoderCatalog::builtin();

    writeln!(out, "Decoders:")?;
    writeln!(out, "{:-<50}", "")?;
    for name in catalog.names() {
        let Some(decoder) = catalog.get(name) else {
            continue;
        };
        let fallback = if decoder.is_total() { "  (fallback)" } else { "" };
        writeln!(out, "  {name:<26} {}{fallback}", decoder.display_name())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pktchain_core::MemorySource;
    use tempfile::NamedTempFile;

    /// Ethernet / IPv4 / UDP, 4000 -> 5000, no payload.
    const UDP_FRAME: [u8; 42] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0x08, 0x00,
        0x45, 0x00, 0x00, 0x1c, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00,
        0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x02,
        0x0f, 0xa0, 0x13, 0x88, 0x00, 0x08, 0x00, 0x00,
    ];

    fn source(count: usize) -> MemorySource {
        let mut source = MemorySource::new(1);
        for _ in 0..count {
            source.push(UDP_FRAME.to_vec());
        }
        source
    }

    #[test]
    fn test_limit() {
        let formatter = OutputFormatter::new(OutputFormat::Line, false);
        let options = RunOptions {
            limit: Some(2),
            defrag: false,
        };
        let mut out = Vec::new();
        let summary = run(&mut source(5), &Dissector::builtin(), &formatter, &options, &mut out)
            .unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_counts_illegal_frames() {
        let mut source = source(1);
        source.push(UDP_FRAME[..20].to_vec());
        let formatter = OutputFormatter::new(OutputFormat::Line, false);
        let mut out = Vec::new();
        let summary = run(
            &mut source,
            &Dissector::builtin(),
            &formatter,
            &RunOptions::default(),
            &mut out,
        )
        .unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.illegal, 1);
    }

    #[test]
    fn test_build_dissector_rejects_bad_mapping() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Packet.classFor.EtherType.2048 = nosuch").unwrap();
        let err = build_dissector(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("nosuch"));
    }

    #[test]
    fn test_build_dissector_missing_file() {
        let err = build_dissector(Some(Path::new("/nonexistent/decoders.properties"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load decoder mapping"));
    }

    #[test]
    fn test_list_decoders() {
        let mut out = Vec::new();
        list_decoders(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("ipv4"));
        assert!(text.contains("unknown"));
        assert!(text.contains("(fallback)"));
    }
}
