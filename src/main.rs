//! pktchain CLI entry point.

use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pktchain::cli::{self, Args, OutputFormatter, RunOptions};
use pktchain::pcap::PcapFrameSource;

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| args.log_filter().into()),
        )
        .with_writer(io::stderr)
        .init();

    if args.is_info_only() {
        cli::list_decoders(&mut io::stdout().lock())?;
        return Ok(());
    }

    let file = args
        .file
        .as_deref()
        .context("Capture file required. Use --help for usage.")?;
    let dissector = cli::build_dissector(args.decoders.as_deref())?;
    let mut source = PcapFrameSource::open(file)
        .with_context(|| format!("Failed to open capture file: {}", file.display()))?;

    let formatter = OutputFormatter::new(args.format, args.hex);
    let mut out = BufWriter::new(io::stdout().lock());
    let summary = cli::run(
        &mut source,
        &dissector,
        &formatter,
        &RunOptions::from(&args),
        &mut out,
    )?;

    info!(
        frames = summary.frames,
        illegal = summary.illegal,
        reassembled = summary.reassembled,
        incomplete = summary.incomplete,
        "done"
    );
    Ok(())
}
