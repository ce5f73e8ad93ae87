//! Fuzz target for decoder mapping files.
//!
//! Arbitrary text is parsed and validated; any configuration that validates
//! cleanly must then drive a decode without panicking.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use pktchain_core::{
    ConfiguredDecoderTable, DecoderCatalog, DecoderConfig, Dissector, TagCatalog,
};

/// Ethernet / IPv4 / UDP 4000 -> 53 with a 4 byte payload.
const FRAME: [u8; 46] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0x08, 0x00,
    0x45, 0x00, 0x00, 0x20, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00,
    0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x02,
    0x0f, 0xa0, 0x00, 0x35, 0x00, 0x0c, 0x00, 0x00,
    0xde, 0xad, 0xbe, 0xef,
];

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let config = DecoderConfig::parse(text);
    let catalog = DecoderCatalog::builtin();
    if !config.validate(&catalog).is_empty() {
        return;
    }

    let table = ConfiguredDecoderTable::new(Arc::new(config), catalog);
    let dissector = Dissector::new(Arc::new(TagCatalog::builtin()), Arc::new(table));
    let _ = dissector.decode_frame(1, FRAME.to_vec());
});
