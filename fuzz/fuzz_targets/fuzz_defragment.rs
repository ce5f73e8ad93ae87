//! Fuzz target for fragmentation and reassembly.
//!
//! Raw IP input is decoded, split at an MTU taken from the first byte, and
//! put back together through a `FragmentSet`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pktchain_core::fragment::{ipv4, ipv6};
use pktchain_core::tag::link_type;
use pktchain_core::{Dissector, FragmentSet, Layer, Reassembly};

fuzz_target!(|data: &[u8]| {
    let Some((&mtu, wire)) = data.split_first() else {
        return;
    };
    let mtu = 48 + mtu as usize * 4;

    let dissector = Dissector::builtin();
    let Ok(Layer::Packet(packet)) = dissector.decode_frame(link_type::RAW, wire.to_vec()) else {
        return;
    };

    let fragments = if packet.header.as_ipv4().is_some() {
        ipv4::fragment(&packet, mtu)
    } else if packet.header.as_ipv6().is_some() {
        ipv6::fragment(&packet, mtu, 0x5eed)
    } else {
        return;
    };
    let Ok(fragments) = fragments else {
        return;
    };

    let mut set = FragmentSet::new();
    for fragment in fragments.into_iter().rev() {
        if let Ok(Reassembly::Complete { packet, .. }) = set.push(fragment, &dissector) {
            let _ = packet.to_bytes();
        }
    }
    set.clear();
});
