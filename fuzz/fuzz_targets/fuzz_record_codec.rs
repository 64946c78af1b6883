//! Fuzz target for the postcard codec over persisted record types.
//!
//! Tests that arbitrary bytes fed to `decode` never panic, and that
//! successfully decoded values roundtrip correctly.

#![no_main]

use libfuzzer_sys::fuzz_target;

use blobrange_types::{
    decode, encode, CutoffVersion, KeyRange, PurgeTaskRecord, PurgeTaskState, RangeState,
    TenantId, Version,
};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let selector = data[0] % 7;
    let payload = &data[1..];

    match selector {
        0 => try_roundtrip::<KeyRange>(payload),
        1 => try_roundtrip::<RangeState>(payload),
        2 => try_roundtrip::<Version>(payload),
        3 => try_roundtrip::<CutoffVersion>(payload),
        4 => try_roundtrip::<PurgeTaskRecord>(payload),
        5 => try_roundtrip::<PurgeTaskState>(payload),
        _ => try_roundtrip::<TenantId>(payload),
    }
});

/// Attempt to decode arbitrary bytes as type T. If successful, re-encode
/// and verify the roundtrip produces the same value.
fn try_roundtrip<T>(data: &[u8])
where
    T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    if let Ok(value) = decode::<T>(data) {
        let re_encoded = encode(&value);
        assert!(re_encoded.is_ok(), "encode failed after successful decode");

        let re_decoded = decode::<T>(&re_encoded.expect("already checked"));
        assert!(re_decoded.is_ok(), "re-decode failed after successful encode");
        assert_eq!(value, re_decoded.expect("already checked"), "roundtrip mismatch");
    }
    // Decode failure is expected for arbitrary bytes — no panic is the invariant.
}
