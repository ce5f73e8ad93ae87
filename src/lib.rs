//! pktchain - decode capture files into protocol layer chains.
//!
//! The decoding engine lives in [`pktchain_core`]; this crate adds capture
//! file input and the command-line front end.
//!
//! # Example
//!
//! ```no_run
//! use pktchain::cli::{run, OutputFormat, OutputFormatter, RunOptions};
//! use pktchain::pcap::PcapFrameSource;
//! use pktchain_core::Dissector;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut source = PcapFrameSource::open("capture.pcap")?;
//!     let formatter = OutputFormatter::new(OutputFormat::Line, false);
//!     let summary = run(
//!         &mut source,
//!         &Dissector::builtin(),
//!         &formatter,
//!         &RunOptions::default(),
//!         &mut std::io::stdout(),
//!     )?;
//!     println!("{} frames", summary.frames);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod pcap;

pub use error::{Error, Result};
