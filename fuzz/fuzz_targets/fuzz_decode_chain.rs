//! Fuzz target for the decode chain.
//!
//! Every input must decode without panicking to a chain whose layers cover
//! the whole frame.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pktchain_core::tag::link_type;
use pktchain_core::Dissector;

fuzz_target!(|data: &[u8]| {
    let dissector = Dissector::builtin();

    for dlt in [
        link_type::ETHERNET,
        link_type::LINUX_SLL,
        link_type::NULL,
        link_type::RAW,
    ] {
        let Ok(chain) = dissector.decode_frame(dlt, data.to_vec()) else {
            continue;
        };
        assert_eq!(chain.len(), data.len());
        let _ = chain.to_bytes();
    }
});
