//! Logical versions and purge cutoffs.
//!
//! Every committed ledger mutation bumps a monotonically increasing
//! [`Version`]. Purge requests name a [`CutoffVersion`]: either a concrete
//! version (reclaim history at or below it) or the `Latest` sentinel, which
//! resolves to the commit version at task creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A monotonically increasing logical timestamp.
///
/// Wraps a `u64` with compile-time type safety to prevent mixing with other
/// counters. Formats with a `v` prefix: `v42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// The version before any mutation has committed.
    pub const ZERO: Version = Version(0);

    /// Creates a version from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the next version.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for Version {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    #[inline]
    fn from(v: Version) -> Self {
        v.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The version bound of a purge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CutoffVersion {
    /// Every version as of task creation time.
    Latest,
    /// Versions at or below this one.
    At(Version),
}

impl CutoffVersion {
    /// Resolves the cutoff against the current commit version.
    #[must_use]
    pub fn resolve(self, current: Version) -> Version {
        match self {
            CutoffVersion::Latest => current,
            CutoffVersion::At(v) => v,
        }
    }
}

impl fmt::Display for CutoffVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutoffVersion::Latest => write!(f, "latest"),
            CutoffVersion::At(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering_and_next() {
        assert!(Version::ZERO < Version::new(1));
        assert_eq!(Version::new(7).next(), Version::new(8));
    }

    #[test]
    fn test_cutoff_resolution() {
        let current = Version::new(100);
        assert_eq!(CutoffVersion::Latest.resolve(current), current);
        assert_eq!(CutoffVersion::At(Version::new(3)).resolve(current), Version::new(3));
    }

    #[test]
    fn test_display() {
        assert_eq!(Version::new(42).to_string(), "v42");
        assert_eq!(CutoffVersion::Latest.to_string(), "latest");
        assert_eq!(CutoffVersion::At(Version::new(1)).to_string(), "v1");
    }
}
