//! Command-line argument definitions.

use clap::Parser;
use std::path::PathBuf;

use super::OutputFormat;

/// Decode capture files into protocol layer chains.
#[derive(Parser, Debug)]
#[command(name = "pktchain")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Capture file (pcap or pcapng, optionally gzipped)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Decoder mapping in properties format, instead of the built-in table
    #[arg(short = 'd', long = "decoders", value_name = "PROPERTIES")]
    pub decoders: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(short = 'n', long = "limit", value_name = "N")]
    pub limit: Option<u64>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "tree")]
    pub format: OutputFormat,

    /// Dump the bytes of opaque and illegal layers
    #[arg(long = "hex")]
    pub hex: bool,

    /// Reassemble IPv4/IPv6 fragments before printing
    #[arg(long = "defrag")]
    pub defrag: bool,

    /// List decoder identifiers usable in a decoder mapping
    #[arg(long = "list-decoders")]
    pub list_decoders: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Check if this is an info-only command (no capture file needed).
    pub fn is_info_only(&self) -> bool {
        self.list_decoders
    }

    /// Default log filter for the `-v` count.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
