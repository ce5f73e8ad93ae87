//! Error types for pktchain-core.
//!
//! One enum per failure class:
//!
//! - [`BufferError`] - a read or write fell outside its buffer
//! - [`DecodeError`] - bytes do not form a valid header for the resolved decoder
//! - [`TagError`] - a closed tag kind saw a value it does not know
//! - [`ConfigError`] - the decoder table is misconfigured
//! - [`FragmentError`] - a fragment set cannot be reassembled or split
//!
//! Frame sources report I/O and capture-format failures through
//! [`Error::Io`] and [`Error::Source`].
//!
//! [`enum@Error`] wraps all of them. Only [`DecodeError`] is ever turned into
//! data (an illegal layer); the others propagate to the caller.

use std::path::PathBuf;

use thiserror::Error;

use crate::tag::TagKind;

/// Main error type for pktchain-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Out-of-bounds buffer access
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// Structurally invalid header
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Unknown value for a closed tag kind
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    /// Decoder registry misconfiguration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fragmentation or reassembly failure
    #[error("Fragment error: {0}")]
    Fragment(#[from] FragmentError),

    /// Reading frames failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame source produced unusable data
    #[error("Source error: {reason}")]
    Source { reason: String },
}

/// Errors from the bounds-checked buffer primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Access past the end of the buffer
    #[error("{len} bytes at offset {offset} out of bounds for buffer of {buffer_len} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },

    /// Zero-length access
    #[error("zero-length access at offset {offset}")]
    ZeroLength { offset: usize },

    /// Operands of a binary operation differ in length
    #[error("length mismatch: {left} vs {right} bytes")]
    LengthMismatch { left: usize, right: usize },

    /// Text is not a hex string
    #[error("invalid hex string: {input:?}")]
    InvalidHex { input: String },
}

/// Structural errors raised by decoders.
///
/// The decode chain turns these into illegal layers instead of propagating
/// them, so they are cheap to clone and comparable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bytes for the header
    #[error("{protocol}: packet too short (need {needed} bytes, have {have})")]
    TooShort {
        protocol: &'static str,
        needed: usize,
        have: usize,
    },

    /// Invalid header field value
    #[error("{protocol}: invalid {field}: {reason}")]
    InvalidField {
        protocol: &'static str,
        field: &'static str,
        reason: String,
    },

    /// Rejected by an underlying header parser
    #[error("{protocol}: {reason}")]
    Malformed {
        protocol: &'static str,
        reason: String,
    },

    /// Primitive read failed
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// A field carried a value its closed tag kind does not allow
    #[error("{protocol}: {source}")]
    Tag {
        protocol: &'static str,
        #[source]
        source: TagError,
    },
}

impl DecodeError {
    /// Shorthand for [`DecodeError::TooShort`].
    pub fn too_short(protocol: &'static str, needed: usize, have: usize) -> Self {
        DecodeError::TooShort {
            protocol,
            needed,
            have,
        }
    }

    /// Shorthand for [`DecodeError::InvalidField`].
    pub fn invalid(protocol: &'static str, field: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidField {
            protocol,
            field,
            reason: reason.into(),
        }
    }
}

/// Errors from the protocol tag registries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// Closed tag kind saw a value outside its catalog
    #[error("unknown {kind} value {value}")]
    Unknown { kind: TagKind, value: u32 },

    /// Value does not fit the kind's width
    #[error("{kind} value {value} does not fit in {width} byte(s)")]
    OutOfRange {
        kind: TagKind,
        value: u32,
        width: usize,
    },

    /// Same value interned twice
    #[error("{kind} value {value} is already interned")]
    Duplicate { kind: TagKind, value: u32 },
}

/// Decoder registry configuration errors.
///
/// Raised at the first resolution that touches the bad entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Entry names a decoder that is not in the catalog
    #[error("{key}: unknown decoder {decoder:?}")]
    UnknownDecoder { key: String, decoder: String },

    /// Key uses a target other than `Packet`
    #[error("{key}: unsupported target {target:?}")]
    UnsupportedTarget { key: String, target: String },

    /// Key names a tag kind that does not exist
    #[error("{key}: unknown tag kind {kind:?}")]
    UnknownTagKind { key: String, kind: String },

    /// Tag value is not a decimal number in range
    #[error("{key}: invalid tag value {value:?}")]
    InvalidValue { key: String, value: String },

    /// Fallback decoder can fail on arbitrary bytes
    #[error("{key}: decoder {decoder:?} cannot be used as a fallback")]
    InvalidFallback { key: String, decoder: String },

    /// Configuration resource could not be read
    #[error("cannot read decoder configuration {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },
}

/// Fragmentation and reassembly errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    /// Nothing to reassemble
    #[error("cannot defragment an empty fragment set")]
    Empty,

    /// Member is not a packet of the expected family
    #[error("fragment {index} is not an {expected} packet")]
    NotFragment {
        index: usize,
        expected: &'static str,
    },

    /// Computed payload length is zero or negative
    #[error("cannot defragment: reassembled length {length} is not positive (fragment offsets {offsets:?})")]
    NonPositiveLength { length: i64, offsets: Vec<u32> },

    /// Gap, overlap or shape mismatch in the fragment set
    #[error("cannot defragment: {reason} (fragment offsets {offsets:?})")]
    Inconsistent { reason: String, offsets: Vec<u32> },

    /// MTU cannot carry the unfragmentable part plus one 8-byte block
    #[error("MTU {mtu} cannot carry a {header_len}-byte header plus 8 bytes of payload")]
    MtuTooSmall { mtu: usize, header_len: usize },

    /// Decoding the reassembled payload hit a registry misconfiguration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
