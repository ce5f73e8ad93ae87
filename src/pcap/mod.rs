//! Capture file input.
//!
//! Reads legacy pcap and pcapng files (optionally gzip-compressed) and
//! yields their frames through [`FrameSource`](pktchain_core::FrameSource).

mod reader;

pub use reader::{is_gzip_extension, PcapFrameSource};
