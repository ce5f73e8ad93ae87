//! # pktchain-core
//!
//! Protocol-number driven packet decoding.
//!
//! A captured frame is decoded one header at a time. Every header names the
//! protocol that follows it by a number (an EtherType, an IP protocol
//! number, a port), a decoder table maps that number to the next decoder,
//! and the result is a chain of layers that ends in a decoded packet, raw
//! bytes nobody claimed, or an *illegal* layer holding bytes that did not
//! parse together with the reason why.
//!
//! ## Quick Start
//!
//! ```rust
//! use pktchain_core::prelude::*;
//!
//! let dissector = Dissector::builtin();
//! let frame = [
//!     0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // Dst MAC
//!     0x00, 0x11, 0x22, 0x33, 0x44, 0x55, // Src MAC
//!     0x08, 0x06,                         // EtherType: ARP
//!     0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01,
//!     0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 192, 168, 1, 1,
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 192, 168, 1, 2,
//! ];
//!
//! let chain = dissector.decode_frame(link_type::ETHERNET, frame.to_vec()).unwrap();
//! let names: Vec<&str> = chain.iter().map(Layer::name).collect();
//! assert_eq!(names, ["ethernet", "arp"]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        pktchain-core                                |
//! +---------------------------------------------------------------------+
//! |  buffer/    - bounds-checked reads/writes, hex, checksums           |
//! |  tag/       - TagKind, ProtocolTag, per-kind registries             |
//! |  decode/    - Decoder trait, decoder tables, the Dissector          |
//! |  protocol/  - built-in decoders and header types                    |
//! |  packet/    - Layer chain, serialization, truncation                |
//! |  fragment/  - IPv4/IPv6 fragmentation and reassembly                |
//! |  source/    - RawFrame, FrameSource                                 |
//! |  error/     - Error types                                           |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Decoder tables
//!
//! | Table | Built | Use |
//! |-------|-------|-----|
//! | [`FixedDecoderTable`] | eagerly, compiled in | default, fastest |
//! | [`ConfiguredDecoderTable`] | lazily, from properties text | remapping ports, custom decoders |
//!
//! Both resolve every tag to a decoder: a value without a mapping resolves
//! to the fallback decoder, which keeps the bytes opaque.

pub mod buffer;
pub mod decode;
pub mod error;
pub mod fragment;
pub mod packet;
pub mod prelude;
pub mod protocol;
pub mod source;
pub mod tag;

// Re-export commonly used types at crate root for convenience
pub use decode::{
    ConfigLoader, ConfiguredDecoderTable, DecodeContext, Decoded, DecodedHeader, Decoder,
    DecoderCatalog, DecoderConfig, DecoderTable, Dissector, FixedDecoderTable, Resolved,
    MAX_DEPTH,
};
pub use error::{BufferError, ConfigError, DecodeError, Error, FragmentError, Result, TagError};
pub use fragment::{FragmentKey, FragmentSet, Reassembly};
pub use packet::{Fixups, IllegalLayer, Layer, OpaqueLayer, Packet};
pub use protocol::{Header, HeaderKind};
pub use source::{FrameSource, MemorySource, RawFrame};
pub use tag::{ProtocolTag, TagCatalog, TagKind, UnknownPolicy};
