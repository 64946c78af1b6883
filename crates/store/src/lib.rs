//! Serializable in-memory ordered KV store for the blobrange registry.
//!
//! This crate is the transactional-store collaborator consumed by
//! `blobrange-registry`: an ordered byte-keyed map with snapshot-isolated
//! transactions, optimistic serializable conflict detection, and a single
//! retry boundary ([`Store::run`]) that re-runs a unit of work on transient
//! failure. A configurable fault injector surfaces artificial transient
//! errors so callers' retry paths stay exercised.
//!
//! The registry depends only on this API surface; a production deployment
//! would back the same contract with a real distributed transactional store.

#![deny(unsafe_code)]

mod db;
mod error;
mod transaction;

pub use db::{Store, StoreConfig};
pub use error::{Error, Result, TransientError};
pub use transaction::Transaction;
