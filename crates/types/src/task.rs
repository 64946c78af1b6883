//! Purge task records and completion tokens.
//!
//! A purge call persists a [`PurgeTaskRecord`] keyed by an opaque
//! [`PurgeToken`] and returns the token immediately. A background worker
//! drives the record from `Pending` to `Done`; callers poll the record by
//! token. Records are retained after completion so re-querying a token stays
//! idempotent (retention policy is external).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::range::{printable, KeyRange};
use crate::tenant::TenantId;
use crate::version::Version;

/// Opaque handle identifying an asynchronous purge task.
///
/// Derived from an internal counter plus random suffix; callers must not
/// interpret the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurgeToken(Vec<u8>);

impl PurgeToken {
    /// Wraps raw token bytes.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PurgeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "purge:{}", printable(&self.0))
    }
}

/// Completion state of a purge task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurgeTaskState {
    /// Reclamation has not completed yet.
    Pending,
    /// All data at or below the cutoff has been reclaimed.
    Done,
}

/// Persisted record of one purge task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeTaskRecord {
    /// Tenant whose key space the task targets, if any.
    pub tenant: Option<TenantId>,
    /// Target range (alignment-checked at creation).
    pub range: KeyRange,
    /// Resolved cutoff: reclaim versions at or below this.
    pub cutoff: Version,
    /// Whether the task deactivates the range once reclamation completes.
    pub force: bool,
    /// Completion state.
    pub state: PurgeTaskState,
}

impl PurgeTaskRecord {
    /// True once the task has reached `Done`.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.state, PurgeTaskState::Done)
    }
}
