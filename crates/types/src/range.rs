//! Keys, half-open key ranges, and range states.
//!
//! A [`Key`] is an opaque, totally ordered byte string. A [`KeyRange`] is a
//! half-open interval `[begin, end)` over keys; every range used in an
//! operation must satisfy `begin < end`. Lexicographic byte ordering is the
//! only ordering in play, so range math is plain slice comparison.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque, totally ordered byte-string key.
pub type Key = Vec<u8>;

/// First byte of the reserved system keyspace.
///
/// User-visible tenant key space is `["", 0xFF)`; everything at or above
/// `0xFF` is reserved for registry-internal records.
pub const KEYSPACE_END: u8 = 0xFF;

/// Returns the exclusive upper bound of the tenant key space.
pub fn keyspace_end() -> Key {
    vec![KEYSPACE_END]
}

/// Renders a key for logs and error messages.
///
/// Printable ASCII bytes pass through; everything else is hex-escaped as
/// `\xNN` so boundary keys are always loggable.
pub fn printable(key: &[u8]) -> String {
    let mut out = String::with_capacity(key.len());
    for &b in key {
        if (0x20..0x7F).contains(&b) && b != b'\\' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02x}"));
        }
    }
    out
}

/// State of a ledger run: blobified or not.
///
/// The boundary map stores a state per boundary key that holds for
/// `[this boundary, next boundary)`; space outside any explicit boundary
/// defaults to [`RangeState::Inactive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeState {
    /// Keys in the run are managed by blob storage.
    Active,
    /// Keys in the run live in normal transactional storage.
    Inactive,
}

impl RangeState {
    /// Returns the opposite state.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            RangeState::Active => RangeState::Inactive,
            RangeState::Inactive => RangeState::Active,
        }
    }

    /// True for [`RangeState::Active`].
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, RangeState::Active)
    }
}

impl fmt::Display for RangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeState::Active => write!(f, "active"),
            RangeState::Inactive => write!(f, "inactive"),
        }
    }
}

/// A half-open key interval `[begin, end)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    /// Inclusive lower bound.
    pub begin: Key,
    /// Exclusive upper bound.
    pub end: Key,
}

impl KeyRange {
    /// Creates a range, returning `None` unless `begin < end`.
    #[must_use]
    pub fn new(begin: impl Into<Key>, end: impl Into<Key>) -> Option<Self> {
        let begin = begin.into();
        let end = end.into();
        (begin < end).then_some(Self { begin, end })
    }

    /// True if `key` falls inside `[begin, end)`.
    #[must_use]
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.begin.as_slice() <= key && key < self.end.as_slice()
    }

    /// True if `other` is entirely inside this range.
    #[must_use]
    pub fn contains_range(&self, other: &KeyRange) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    /// True if the two ranges share at least one key.
    #[must_use]
    pub fn overlaps(&self, other: &KeyRange) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// True if the ranges touch end-to-begin without overlapping.
    #[must_use]
    pub fn adjacent_to(&self, other: &KeyRange) -> bool {
        self.end == other.begin || other.end == self.begin
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {})", printable(&self.begin), printable(&self.end))
    }
}
