//! Core types and codec for the blobrange registry.
//!
//! This crate provides the foundational types used throughout the workspace:
//! - Keys, half-open key ranges, and range states
//! - Logical versions and purge cutoffs
//! - Tenant identifiers
//! - Purge task records and tokens
//! - Centralized postcard codec with snafu error handling

#![deny(unsafe_code)]

pub mod codec;
pub mod range;
pub mod task;
pub mod tenant;
pub mod version;

// Re-export commonly used types at crate root
pub use codec::{decode, encode, CodecError};
pub use range::{keyspace_end, printable, Key, KeyRange, RangeState, KEYSPACE_END};
pub use task::{PurgeTaskRecord, PurgeTaskState, PurgeToken};
pub use tenant::{TenantId, TenantName};
pub use version::{CutoffVersion, Version};
