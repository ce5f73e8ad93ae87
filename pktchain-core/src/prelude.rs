//! Convenient re-exports for common usage.
//!
//! ```rust
//! use pktchain_core::prelude::*;
//!
//! let dissector = Dissector::builtin();
//! let chain = dissector.decode_frame(link_type::RAW, vec![0u8; 4]).unwrap();
//! assert!(chain.is_illegal());
//! ```

// Decoding
pub use crate::decode::{Decoder, DecoderTable, Dissector, FixedDecoderTable};
pub use crate::decode::{ConfiguredDecoderTable, DecoderConfig};

// Decoded chains
pub use crate::packet::{Fixups, Layer, Packet};
pub use crate::protocol::{Header, HeaderKind};

// Tags
pub use crate::tag::{ethertype, ip_number, link_type, port};
pub use crate::tag::{ProtocolTag, TagCatalog, TagKind};

// Input
pub use crate::source::{FrameSource, MemorySource, RawFrame};

// Error types
pub use crate::error::{Error, Result};
