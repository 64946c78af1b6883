//! Randomized consistency harness for the blob range registry.
//!
//! The harness drives a registry with a seeded random mix of client traffic
//! and targeted scenario units while mirroring every accepted mutation in an
//! in-memory shadow model. Client tasks and the scenario task run as
//! separate tokio tasks over one shared model, so every registry guarantee
//! is exercised under genuinely interleaved traffic; a `tenant` setting
//! scopes the whole run to one tenant's key space.
//!
//! Two rules keep the audits sound despite the concurrency. First, a task
//! claims a range in the model before touching it in the registry and
//! releases it afterwards, so tasks always operate on disjoint ranges and
//! candidate generation avoids space a peer is mid-way through mutating.
//! Second, ranges enter the model before their activation is issued and
//! leave it only after their deactivation commits, so the model never
//! claims less active space than the ledger holds. Structural ledger
//! invariants are audited after every scenario; the full ledger-versus-model
//! comparison runs at teardown, once traffic has settled. Any divergence is
//! a bug in the registry, not in the workload, and the harness panics on it.

#![deny(unsafe_code)]

mod invariants;
mod keygen;
mod model;
mod runner;
mod scenario;

pub use invariants::{audit, audit_structure};
pub use keygen::{KeyGenerator, KeyMode};
pub use model::ShadowModel;
pub use runner::{Harness, HarnessConfig, HarnessReport};
pub use scenario::Scenario;
