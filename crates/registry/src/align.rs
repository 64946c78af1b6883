//! Alignment classification for range mutations.
//!
//! Every mutating call is classified against the current set of active
//! ranges before anything is written. The single rule — boundary-exact or
//! reject — is what prevents silent fragmentation of a granule range:
//! splitting and merging are explicit operations elsewhere, never a side
//! effect of blobify/unblobify/purge.

use blobrange_types::KeyRange;

/// How a request range relates to the existing active ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// The request equals one active range boundary-for-boundary.
    ExactMatch,
    /// The request shares no key with any active range.
    DisjointFromAll,
    /// The request overlaps at least one active range without being
    /// identical to any single one: one-sided overlap, strict sub-range,
    /// strict super-range, or spanning multiple active ranges.
    PartialOverlap,
}

/// Classifies `request` against `active`, the active ranges overlapping it.
///
/// `active` may be any subset of the ledger's active ranges as long as it
/// contains every one that overlaps `request`; extra disjoint entries are
/// ignored.
#[must_use]
pub fn classify(active: &[KeyRange], request: &KeyRange) -> Alignment {
    let mut overlapping = active.iter().filter(|a| a.overlaps(request));
    match overlapping.next() {
        None => Alignment::DisjointFromAll,
        Some(first) => {
            if first == request && overlapping.next().is_none() {
                Alignment::ExactMatch
            } else {
                Alignment::PartialOverlap
            }
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn range(b: &[u8], e: &[u8]) -> KeyRange {
        KeyRange::new(b.to_vec(), e.to_vec()).expect("valid range")
    }

    #[test]
    fn test_empty_active_set_is_disjoint() {
        assert_eq!(classify(&[], &range(b"a", b"b")), Alignment::DisjointFromAll);
    }

    #[test]
    fn test_exact_match() {
        let active = vec![range(b"b", b"d")];
        assert_eq!(classify(&active, &range(b"b", b"d")), Alignment::ExactMatch);
    }

    #[test]
    fn test_disjoint_before_between_after() {
        let active = vec![range(b"c", b"e"), range(b"m", b"p")];
        assert_eq!(classify(&active, &range(b"a", b"c")), Alignment::DisjointFromAll);
        assert_eq!(classify(&active, &range(b"e", b"m")), Alignment::DisjointFromAll);
        assert_eq!(classify(&active, &range(b"p", b"z")), Alignment::DisjointFromAll);
    }

    // The eight misaligned shapes exercised against an active range
    // [activeBegin, activeEnd) inside an outer range, with a middle key:
    // every one must classify as PartialOverlap.
    #[test]
    fn test_partial_overlap_shapes() {
        let active = vec![range(b"rA", b"rB")]; // inside outer [r, r\xff)
        let cases = [
            range(b"r", b"r\xff"),   // strict super-range
            range(b"r", b"rB"),      // extends left, shares end
            range(b"rA", b"r\xff"),  // extends right, shares begin
            range(b"r", b"rAF"),     // overlaps left half
            range(b"rAF", b"r\xff"), // overlaps right half
            range(b"rA", b"rAF"),    // strict sub-range sharing begin
            range(b"rAF", b"rB"),    // strict sub-range sharing end
            range(b"rAF", b"rAG"),   // strict interior sub-range
        ];
        for request in cases {
            assert_eq!(
                classify(&active, &request),
                Alignment::PartialOverlap,
                "request {request} must be a partial overlap"
            );
        }
    }

    #[test]
    fn test_spanning_two_active_ranges() {
        let active = vec![range(b"b", b"d"), range(b"f", b"h")];
        assert_eq!(classify(&active, &range(b"b", b"h")), Alignment::PartialOverlap);
        assert_eq!(classify(&active, &range(b"c", b"g")), Alignment::PartialOverlap);
    }

    #[test]
    fn test_exact_match_with_disjoint_neighbors() {
        let active = vec![range(b"b", b"d"), range(b"f", b"h")];
        assert_eq!(classify(&active, &range(b"f", b"h")), Alignment::ExactMatch);
    }

    #[test]
    fn test_adjacency_is_disjoint() {
        // Half-open ranges: touching end-to-begin shares no key.
        let active = vec![range(b"c", b"e")];
        assert_eq!(classify(&active, &range(b"a", b"c")), Alignment::DisjointFromAll);
        assert_eq!(classify(&active, &range(b"e", b"g")), Alignment::DisjointFromAll);
    }
}
