//! Fuzz target for system key encoding/decoding.
//!
//! Tests that boundary and purge task key decoding never panics on
//! arbitrary input, that successfully decoded keys roundtrip to the exact
//! original bytes, and that prefix ranges actually cover their prefix.

#![no_main]

use libfuzzer_sys::fuzz_target;

use blobrange_registry::keys::{
    boundary_key, decode_boundary_key, decode_purge_task_key, purge_task_key, range_of_prefix,
};
use blobrange_types::PurgeToken;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let selector = data[0] % 3;
    let payload = &data[1..];

    match selector {
        0 => fuzz_boundary(payload),
        1 => fuzz_purge_task(payload),
        _ => fuzz_prefix_range(payload),
    }
});

fn fuzz_boundary(data: &[u8]) {
    if let Some((tenant, boundary)) = decode_boundary_key(data) {
        let re_encoded = boundary_key(tenant, &boundary);
        assert_eq!(re_encoded, data, "boundary key roundtrip mismatch");
    }
}

fn fuzz_purge_task(data: &[u8]) {
    if let Some(token) = decode_purge_task_key(data) {
        let re_encoded = purge_task_key(&token);
        assert_eq!(re_encoded, data, "purge task key roundtrip mismatch");
    }
    // Arbitrary bytes always form a token; its key must decode back.
    let token = PurgeToken::from_bytes(data.to_vec());
    let key = purge_task_key(&token);
    assert_eq!(decode_purge_task_key(&key), Some(token), "token roundtrip mismatch");
}

fn fuzz_prefix_range(data: &[u8]) {
    // All-0xFF prefixes have no successor and are out of contract.
    if data.is_empty() || data.iter().all(|&b| b == 0xFF) {
        return;
    }
    let (begin, end) = range_of_prefix(data);
    assert_eq!(begin, data, "prefix range must start at the prefix");
    assert!(begin < end, "prefix range must be non-empty");

    // Every key extending the prefix falls inside the range.
    let mut extended = data.to_vec();
    extended.extend_from_slice(&[0xFF, 0xFF]);
    assert!(extended < end, "extended prefix key escaped the range");
}
