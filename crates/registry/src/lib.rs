//! Blob range registry and purge coordinator.
//!
//! This crate is the single authority over which contiguous portions of an
//! ordered key space are designated for blob storage. It provides:
//!
//! - The boundary ledger: a durable, transactionally mutated record of
//!   boundary keys and their active/inactive state
//! - Alignment classification: exact-match-or-fail mutation semantics
//! - Blobify/unblobify with idempotent no-op semantics
//! - Asynchronous, versioned, idempotent purge with completion tokens
//! - Non-clipping range and granule queries
//!
//! All mutation goes through retried serializable transactions against the
//! backing store; no in-memory state is authoritative.

#![deny(unsafe_code)]

pub mod align;
mod error;
pub mod keys;
mod ledger;
mod purge;
mod query;
mod registry;
mod tenant;

pub use align::{classify, Alignment};
pub use error::{RegistryError, Result};
pub use purge::{PurgeWorker, PurgeWorkerConfig};
pub use registry::BlobRangeRegistry;
