//! Error types for the store engine.

use snafu::Snafu;

/// Result type for store operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for store operations.
///
/// Transient variants ([`Error::Conflict`], [`Error::Unavailable`]) are
/// expected under concurrent use and are consumed by the retry boundary;
/// they never escape a successful [`crate::Store::run`] call.
#[derive(Debug, Snafu)]
pub enum Error {
    /// Serializable conflict: a concurrent commit intersected this
    /// transaction's read set.
    #[snafu(display("Transaction conflict: read set invalidated by concurrent commit"))]
    Conflict,

    /// The store was transiently unavailable (injected fault or simulated
    /// outage).
    #[snafu(display("Store transiently unavailable"))]
    Unavailable,

    /// The transaction's snapshot is too old for conflict checking.
    ///
    /// Treated as transient: the unit of work is re-run against a fresh
    /// snapshot.
    #[snafu(display("Snapshot too old: committed-write history trimmed past version {version}"))]
    SnapshotTooOld {
        /// The snapshot's commit version.
        version: u64,
    },

    /// The retry budget was exhausted without a permanent outcome.
    #[snafu(display("Retry budget exhausted after {attempts} attempts: {last_error}"))]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Display of the last transient error observed.
        last_error: String,
    },
}

/// Classification consumed by the retry boundary.
///
/// Implemented by any error type flowing through [`crate::Store::run`];
/// only transient failures are retried.
pub trait TransientError {
    /// True if the operation may succeed when re-run against a fresh
    /// snapshot.
    fn is_transient(&self) -> bool;
}

impl TransientError for Error {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Conflict | Error::Unavailable | Error::SnapshotTooOld { .. }
        )
    }
}

impl Error {
    /// True if the operation may succeed when re-run against a fresh
    /// snapshot.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        TransientError::is_transient(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::Conflict.is_transient());
        assert!(Error::Unavailable.is_transient());
        assert!(Error::SnapshotTooOld { version: 3 }.is_transient());
        assert!(
            !Error::RetryExhausted { attempts: 5, last_error: "conflict".into() }.is_transient()
        );
    }
}
