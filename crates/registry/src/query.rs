//! Range queries: active ranges, owning runs, and full-activity checks.
//!
//! Query results always carry the ledger's actual run boundaries. A query
//! over a sub-range of an active range returns the whole active range;
//! clipping to the request would misreport where a granule starts and ends.

use blobrange_store::Transaction;
use blobrange_types::{CutoffVersion, KeyRange, TenantId};

use crate::error::Result;
use crate::ledger;
use crate::purge;

/// Active ranges overlapping `range`, in key order, at most `limit`.
pub(crate) fn list_active_ranges(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    range: &KeyRange,
    limit: usize,
) -> Result<Vec<KeyRange>> {
    let mut active = ledger::active_ranges_overlapping(txn, tenant, range)?;
    active.truncate(limit);
    Ok(active)
}

/// Every run overlapping `range`, Active and Inactive alike, at most `limit`.
///
/// The result is contiguous and covering: the first run begins at or before
/// `range.begin` and, unless truncated by `limit`, the last run ends at or
/// after `range.end`.
pub(crate) fn get_owning_ranges(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    range: &KeyRange,
    limit: usize,
) -> Result<Vec<KeyRange>> {
    let mut runs: Vec<KeyRange> =
        ledger::read_runs(txn, tenant, range)?.into_iter().map(|(run, _)| run).collect();
    runs.truncate(limit);
    Ok(runs)
}

/// True only if a single Active run covers all of `range`.
///
/// With `as_of`, additionally false when a completed purge has reclaimed
/// versions at or above the resolved cutoff anywhere in the range.
pub(crate) fn is_range_fully_active(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    range: &KeyRange,
    as_of: Option<CutoffVersion>,
) -> Result<bool> {
    let active = ledger::active_ranges_overlapping(txn, tenant, range)?;
    let covered = matches!(active.as_slice(), [only] if only.contains_range(range));
    if !covered {
        return Ok(false);
    }
    if let Some(cutoff) = as_of {
        let resolved = cutoff.resolve(ledger::current_version(txn)?);
        if let Some(watermark) = purge::max_watermark_overlapping(txn, tenant, range)? {
            if watermark >= resolved {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use blobrange_store::Store;
    use blobrange_types::{RangeState, Version};

    fn range(b: &[u8], e: &[u8]) -> KeyRange {
        KeyRange::new(b.to_vec(), e.to_vec()).expect("valid range")
    }

    fn activate(store: &Store, r: &KeyRange) {
        let mut txn = store.begin();
        ledger::apply(&mut txn, None, r, RangeState::Active).expect("apply");
        txn.commit().expect("commit");
    }

    #[test]
    fn test_list_active_honors_limit() {
        let store = Store::new();
        activate(&store, &range(b"a", b"b"));
        activate(&store, &range(b"c", b"d"));
        activate(&store, &range(b"e", b"f"));

        let mut txn = store.begin();
        let all = list_active_ranges(&mut txn, None, &range(b"", b"z"), 10).expect("list");
        assert_eq!(all.len(), 3);
        let capped = list_active_ranges(&mut txn, None, &range(b"", b"z"), 2).expect("list");
        assert_eq!(capped, vec![range(b"a", b"b"), range(b"c", b"d")]);
    }

    #[test]
    fn test_owning_ranges_cover_and_never_clip() {
        let store = Store::new();
        activate(&store, &range(b"c", b"f"));

        let mut txn = store.begin();
        let owning = get_owning_ranges(&mut txn, None, &range(b"d", b"e"), 10).expect("owning");
        assert_eq!(owning, vec![range(b"c", b"f")]);

        let owning = get_owning_ranges(&mut txn, None, &range(b"a", b"z"), 10).expect("owning");
        assert_eq!(owning.len(), 3);
        assert!(owning[0].begin <= b"a".to_vec());
        assert!(owning[2].end >= b"z".to_vec());
        for pair in owning.windows(2) {
            assert_eq!(pair[0].end, pair[1].begin, "owning runs must be contiguous");
        }
    }

    #[test]
    fn test_fully_active_requires_single_covering_run() {
        let store = Store::new();
        activate(&store, &range(b"c", b"f"));
        activate(&store, &range(b"h", b"k"));

        let mut txn = store.begin();
        assert!(is_range_fully_active(&mut txn, None, &range(b"c", b"f"), None).expect("check"));
        assert!(is_range_fully_active(&mut txn, None, &range(b"d", b"e"), None).expect("check"));
        // A gap between the two active ranges breaks coverage.
        assert!(!is_range_fully_active(&mut txn, None, &range(b"c", b"k"), None).expect("check"));
        assert!(!is_range_fully_active(&mut txn, None, &range(b"a", b"d"), None).expect("check"));
    }

    #[test]
    fn test_fully_active_respects_purge_watermark() {
        let store = Store::new();
        activate(&store, &range(b"c", b"f"));

        // Simulate the worker having advanced the watermark to v1.
        let mut txn = store.begin();
        purge::advance_watermark(&mut txn, None, &range(b"c", b"f"), Version::new(1))
            .expect("advance");
        txn.commit().expect("commit");

        let mut txn = store.begin();
        let at = |v| Some(CutoffVersion::At(Version::new(v)));
        assert!(!is_range_fully_active(&mut txn, None, &range(b"c", b"f"), at(1)).expect("check"));
        assert!(is_range_fully_active(&mut txn, None, &range(b"c", b"f"), at(2)).expect("check"));
        assert!(is_range_fully_active(&mut txn, None, &range(b"c", b"f"), None).expect("check"));
    }
}
