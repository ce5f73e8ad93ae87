//! Error types for the pktchain front end.

use thiserror::Error;

/// Main error type for reading captures.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reading or parsing a capture file
    #[error("PCAP error: {0}")]
    Pcap(#[from] PcapError),

    /// Error reported by the decoding engine
    #[error(transparent)]
    Core(#[from] pktchain_core::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to capture file reading.
#[derive(Error, Debug)]
pub enum PcapError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Invalid PCAP format
    #[error("Invalid PCAP format: {reason}")]
    InvalidFormat { reason: String },
}

impl From<PcapError> for pktchain_core::Error {
    fn from(err: PcapError) -> Self {
        pktchain_core::Error::Source {
            reason: err.to_string(),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
