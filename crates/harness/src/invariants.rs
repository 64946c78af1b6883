//! Ledger audits. Violations are registry bugs and panic immediately.

use blobrange_types::{keyspace_end, Key, KeyRange, RangeState};

/// Audits one tenant's raw boundary entries for representation invariants.
///
/// These hold at every committed state, so the check is sound while client
/// traffic is still in flight. Panics on:
///
/// - boundary keys out of order or duplicated
/// - consecutive boundaries sharing a state (non-minimal representation)
/// - a leading Inactive boundary (redundant with the implicit default)
pub fn audit_structure(snapshot: &[(Key, RangeState)]) {
    for pair in snapshot.windows(2) {
        assert!(
            pair[0].0 < pair[1].0,
            "boundary entries out of order: {:?} then {:?}",
            pair[0].0,
            pair[1].0
        );
        assert!(
            pair[0].1 != pair[1].1,
            "consecutive boundaries at {:?} and {:?} share state {}",
            pair[0].0,
            pair[1].0,
            pair[0].1
        );
    }
    if let Some((key, state)) = snapshot.first() {
        assert!(
            state.is_active(),
            "leading boundary at {key:?} is {state}, redundant with the implicit default"
        );
    }
}

/// Full audit: structure plus exact agreement with the expected active set.
///
/// `expected_active` is the shadow model's coalesced active space. Only
/// sound at quiescent points, when no mutation is in flight.
pub fn audit(snapshot: &[(Key, RangeState)], expected_active: &[KeyRange]) {
    audit_structure(snapshot);

    let mut actual_active = Vec::new();
    for (i, (key, state)) in snapshot.iter().enumerate() {
        if !state.is_active() {
            continue;
        }
        let end = snapshot.get(i + 1).map_or_else(keyspace_end, |(k, _)| k.clone());
        let run = KeyRange::new(key.clone(), end)
            .unwrap_or_else(|| panic!("empty active run at boundary {key:?}"));
        actual_active.push(run);
    }

    assert_eq!(
        actual_active, expected_active,
        "ledger active runs diverge from the expected active set"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn range(b: &[u8], e: &[u8]) -> KeyRange {
        KeyRange::new(b.to_vec(), e.to_vec()).expect("valid range")
    }

    fn entry(k: &[u8], s: RangeState) -> (Key, RangeState) {
        (k.to_vec(), s)
    }

    #[test]
    fn test_audit_accepts_consistent_ledger() {
        let snapshot = vec![
            entry(b"a", RangeState::Active),
            entry(b"c", RangeState::Inactive),
            entry(b"f", RangeState::Active),
            entry(b"h", RangeState::Inactive),
        ];
        audit(&snapshot, &[range(b"a", b"c"), range(b"f", b"h")]);
        audit(&[], &[]);
    }

    #[test]
    #[should_panic(expected = "share state")]
    fn test_audit_rejects_non_minimal_ledger() {
        let snapshot = vec![entry(b"a", RangeState::Active), entry(b"c", RangeState::Active)];
        audit(&snapshot, &[range(b"a", b"e")]);
    }

    #[test]
    #[should_panic(expected = "redundant with the implicit default")]
    fn test_audit_rejects_leading_inactive() {
        let snapshot = vec![entry(b"a", RangeState::Inactive), entry(b"c", RangeState::Active)];
        audit(&snapshot, &[]);
    }

    #[test]
    #[should_panic(expected = "diverge")]
    fn test_audit_rejects_missing_range() {
        let snapshot = vec![entry(b"a", RangeState::Active), entry(b"c", RangeState::Inactive)];
        audit(&snapshot, &[range(b"a", b"c"), range(b"f", b"h")]);
    }
}
