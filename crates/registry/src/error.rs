//! Error types for the registry.
//!
//! Taxonomy:
//! - **Rejected** outcomes (partial-overlap blobify/unblobify) are `Ok(false)`
//!   from the mutating calls, never an error.
//! - **Unsupported** is [`RegistryError::UnsupportedPurge`]: a purge that
//!   cannot be honored without splitting a granule; surfaced as a hard error
//!   because ignoring it would mask data-loss risk.
//! - **Transient** store failures never cross this boundary; they are retried
//!   inside the store's unit-of-work loop.

use snafu::Snafu;

use blobrange_store::TransientError;
use blobrange_types::{CodecError, KeyRange, PurgeToken, TenantName};

/// Result type for registry operations.
pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

/// Error type for registry operations.
#[derive(Debug, Snafu)]
pub enum RegistryError {
    /// The request range reaches outside the tenant key space.
    #[snafu(display("Invalid range: must lie within the tenant key space"))]
    InvalidRange,

    /// The named tenant does not exist.
    #[snafu(display("Tenant not found: {name}"))]
    TenantNotFound {
        /// The tenant name that failed to resolve.
        name: TenantName,
    },

    /// Purge target partially overlaps an active range.
    ///
    /// A partial purge could leave a granule in an inconsistent internal
    /// split state, so it is refused outright rather than rejected softly.
    #[snafu(display("Unsupported purge: {range} partially overlaps an active range"))]
    UnsupportedPurge {
        /// The offending request range.
        range: KeyRange,
    },

    /// The purge token does not name a known task.
    #[snafu(display("Unknown purge token: {token}"))]
    UnknownPurgeToken {
        /// The unrecognized token.
        token: PurgeToken,
    },

    /// A purge wait exceeded its caller-imposed deadline.
    ///
    /// Distinct from task failure: the underlying task keeps running.
    #[snafu(display("Timed out waiting for purge completion: {token}"))]
    WaitTimeout {
        /// The token being waited on.
        token: PurgeToken,
    },

    /// Store operation failed.
    #[snafu(display("Store error: {source}"))]
    Store {
        /// The underlying store error.
        source: blobrange_store::Error,
    },

    /// A persisted record failed to decode.
    #[snafu(display("Codec error: {source}"))]
    Codec {
        /// The underlying codec error.
        source: CodecError,
    },

    /// The boundary ledger contains bytes that do not parse as a ledger
    /// record. Indicates a corrupted system keyspace.
    #[snafu(display("Corrupt ledger entry: {reason}"))]
    CorruptLedger {
        /// Description of the malformed record.
        reason: String,
    },
}

impl From<blobrange_store::Error> for RegistryError {
    fn from(source: blobrange_store::Error) -> Self {
        RegistryError::Store { source }
    }
}

impl From<CodecError> for RegistryError {
    fn from(source: CodecError) -> Self {
        RegistryError::Codec { source }
    }
}

impl TransientError for RegistryError {
    fn is_transient(&self) -> bool {
        match self {
            RegistryError::Store { source } => source.is_transient(),
            _ => false,
        }
    }
}
