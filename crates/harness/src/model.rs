//! The shadow model: the harness's own record of what should be active.

use parking_lot::Mutex;
use rand::Rng;

use blobrange_types::KeyRange;

#[derive(Default)]
struct Inner {
    /// Committed active ranges no task is currently operating on.
    free: Vec<KeyRange>,
    /// Ranges held exclusively by one in-flight operation. Still counted as
    /// modeled space so concurrent candidate generation steers clear.
    claimed: Vec<KeyRange>,
}

/// Disjoint ranges the harness believes are currently active.
///
/// Shared between concurrent client tasks and the scenario task. A task
/// claims a range before touching it in the registry and releases (or
/// discards) it afterwards, so two tasks never operate on the same range
/// and candidate generation never hands out space a peer is mid-way
/// through mutating. New candidates enter as claimed via [`Self::reserve`]
/// and become free only once their activation commits.
#[derive(Default)]
pub struct ShadowModel {
    inner: Mutex<Inner>,
}

impl ShadowModel {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a range whose activation has committed, unclaimed.
    pub fn push(&self, range: KeyRange) {
        self.inner.lock().free.push(range);
    }

    /// Marks a fresh candidate as claimed before its activation is issued.
    pub fn reserve(&self, range: KeyRange) {
        self.inner.lock().claimed.push(range);
    }

    /// Claims a uniformly random free range for exclusive use. `None` when
    /// every modeled range is already claimed, or the model is empty.
    pub fn claim_random<R: Rng>(&self, rng: &mut R) -> Option<KeyRange> {
        let mut inner = self.inner.lock();
        if inner.free.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..inner.free.len());
        let range = inner.free.swap_remove(idx);
        inner.claimed.push(range.clone());
        Some(range)
    }

    /// Returns a claimed range to the free pool; it is still active.
    ///
    /// # Panics
    ///
    /// If `range` was never claimed.
    pub fn release(&self, range: KeyRange) {
        let mut inner = self.inner.lock();
        let idx = Self::claimed_index(&inner, &range);
        inner.claimed.swap_remove(idx);
        inner.free.push(range);
    }

    /// Forgets a claimed range whose deactivation has committed.
    ///
    /// # Panics
    ///
    /// If `range` was never claimed.
    pub fn discard(&self, range: &KeyRange) {
        let mut inner = self.inner.lock();
        let idx = Self::claimed_index(&inner, range);
        inner.claimed.swap_remove(idx);
    }

    fn claimed_index(inner: &Inner, range: &KeyRange) -> usize {
        inner
            .claimed
            .iter()
            .position(|r| r == range)
            .unwrap_or_else(|| panic!("range {range} was never claimed"))
    }

    /// Number of ranges currently modeled, claimed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.free.len() + inner.claimed.len()
    }

    /// True when no range is claimable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().free.is_empty()
    }

    /// True if `candidate` overlaps any modeled range, claimed or free.
    #[must_use]
    pub fn overlaps_any(&self, candidate: &KeyRange) -> bool {
        let inner = self.inner.lock();
        inner.free.iter().chain(&inner.claimed).any(|r| r.overlaps(candidate))
    }

    /// True if `candidate` overlaps or abuts any modeled range.
    ///
    /// Candidates that abut a modeled range would coalesce with it in the
    /// ledger, breaking the model's one-range-one-run correspondence.
    #[must_use]
    pub fn touches_any(&self, candidate: &KeyRange) -> bool {
        let inner = self.inner.lock();
        inner
            .free
            .iter()
            .chain(&inner.claimed)
            .any(|r| r.overlaps(candidate) || r.adjacent_to(candidate))
    }

    /// The modeled active space as maximal disjoint ranges in key order.
    ///
    /// Adjacent modeled ranges merge into one, matching the ledger's
    /// minimal-run-length representation. Includes claimed ranges, so the
    /// result matches the ledger only at quiescent points.
    #[must_use]
    pub fn coalesced(&self) -> Vec<KeyRange> {
        let mut sorted = {
            let inner = self.inner.lock();
            let mut all = inner.free.clone();
            all.extend(inner.claimed.iter().cloned());
            all
        };
        sorted.sort_by(|a, b| a.begin.cmp(&b.begin));
        let mut merged: Vec<KeyRange> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) if last.end >= range.begin => {
                    if range.end > last.end {
                        last.end = range.end;
                    }
                },
                _ => merged.push(range),
            }
        }
        merged
    }
}
