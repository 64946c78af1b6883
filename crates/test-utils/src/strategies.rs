//! Proptest strategies for blob range domain types.
//!
//! Generators deliberately draw keys from a small alphabet so that randomly
//! generated ranges collide, abut, and nest often; uniform random byte
//! strings would almost never exercise the overlap classification paths.

use blobrange_types::{CutoffVersion, Key, KeyRange, Version};
use proptest::prelude::*;

/// Generates a user-space key: 1-4 bytes drawn from a small alphabet.
pub fn arb_key() -> impl Strategy<Value = Key> {
    proptest::collection::vec(prop::sample::select(b"abcdefgh".to_vec()), 1..=4)
}

/// Generates a well-formed range: two distinct keys, sorted.
pub fn arb_range() -> impl Strategy<Value = KeyRange> {
    (arb_key(), arb_key())
        .prop_filter("range endpoints must differ", |(a, b)| a != b)
        .prop_map(|(a, b)| {
            let (begin, end) = if a < b { (a, b) } else { (b, a) };
            KeyRange::new(begin, end).unwrap_or_else(|| unreachable!("endpoints are sorted"))
        })
}

/// Generates 1 to `max` pairwise disjoint, non-adjacent ranges in key order.
///
/// Built from a sorted deduplicated boundary set, taking every other gap so
/// neighbors never touch.
pub fn arb_disjoint_ranges(max: usize) -> impl Strategy<Value = Vec<KeyRange>> {
    proptest::collection::btree_set(arb_key(), 2..=(max * 2).max(2)).prop_map(|boundaries| {
        let sorted: Vec<Key> = boundaries.into_iter().collect();
        sorted
            .chunks_exact(2)
            .filter_map(|pair| KeyRange::new(pair[0].clone(), pair[1].clone()))
            .collect()
    })
}

/// Generates a purge cutoff: `Latest` or a concrete low version.
pub fn arb_cutoff() -> impl Strategy<Value = CutoffVersion> {
    prop_oneof![
        Just(CutoffVersion::Latest),
        (0u64..1_000).prop_map(|v| CutoffVersion::At(Version::new(v))),
    ]
}

/// Generates a tenant name of 3-8 lowercase letters.
pub fn arb_tenant_name() -> impl Strategy<Value = String> {
    "[a-z]{3,8}"
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn strategy_produces_valid_ranges(r in arb_range()) {
            prop_assert!(r.begin < r.end);
        }

        #[test]
        fn strategy_produces_disjoint_ranges(ranges in arb_disjoint_ranges(4)) {
            for pair in ranges.windows(2) {
                prop_assert!(pair[0].end <= pair[1].begin);
                prop_assert!(!pair[0].overlaps(&pair[1]));
            }
        }
    }
}
