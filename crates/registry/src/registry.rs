//! The registry facade: the public async surface over the ledger, the
//! validator, the purge coordinator, and the query layer.
//!
//! Every operation runs as a unit of work through [`Store::run`], so
//! alignment checks and the mutation they guard always share one
//! serializable transaction, and transient store failures are retried
//! without the caller seeing them.

use std::time::Duration;

use tracing::debug;

use blobrange_store::Store;
use blobrange_types::{
    keyspace_end, CutoffVersion, Key, KeyRange, PurgeTaskRecord, PurgeToken, RangeState, TenantId,
    Version,
};

use crate::align::{classify, Alignment};
use crate::error::{RegistryError, Result};
use crate::ledger;
use crate::purge::{self, WaitConfig};
use crate::query;
use crate::tenant;

/// The single authority over blob range designation and reclamation.
///
/// Cheap to clone; clones share the backing store.
#[derive(Clone)]
pub struct BlobRangeRegistry {
    store: Store,
}

impl BlobRangeRegistry {
    /// Creates a registry over the given store.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// The backing store, for spawning a [`crate::PurgeWorker`] over it.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn validate(range: &KeyRange) -> Result<()> {
        if range.end > keyspace_end() {
            return Err(RegistryError::InvalidRange);
        }
        Ok(())
    }

    /// Creates a tenant if absent and returns its id; idempotent.
    pub async fn create_tenant(&self, name: &str) -> Result<TenantId> {
        self.store.run(|txn| tenant::create(txn, name)).await
    }

    /// Resolves a tenant name to its id.
    ///
    /// # Errors
    ///
    /// [`RegistryError::TenantNotFound`] if the name has never been created.
    pub async fn resolve_tenant(&self, name: &str) -> Result<TenantId> {
        self.store.run(|txn| tenant::resolve(txn, name)).await
    }

    /// Designates `range` for blob storage.
    ///
    /// Returns `Ok(true)` when the range is now active: either freshly
    /// registered (disjoint from every active range) or already active with
    /// exactly these boundaries. Returns `Ok(false)` when the request
    /// partially overlaps an active range; the ledger is untouched.
    pub async fn blobify(&self, tenant: Option<&str>, range: &KeyRange) -> Result<bool> {
        Self::validate(range)?;
        let accepted = self
            .store
            .run(|txn| -> Result<bool> {
                let tenant = tenant::resolve_opt(txn, tenant)?;
                let active = ledger::active_ranges_overlapping(txn, tenant, range)?;
                match classify(&active, range) {
                    Alignment::ExactMatch => Ok(true),
                    Alignment::PartialOverlap => Ok(false),
                    Alignment::DisjointFromAll => {
                        ledger::apply(txn, tenant, range, RangeState::Active)?;
                        Ok(true)
                    },
                }
            })
            .await?;
        debug!(%range, accepted, "blobify");
        Ok(accepted)
    }

    /// Removes `range` from blob storage designation.
    ///
    /// Returns `Ok(true)` when the range is now inactive: either deactivated
    /// (exact match of an active range) or already inactive throughout.
    /// Returns `Ok(false)` on partial overlap; the ledger is untouched.
    pub async fn unblobify(&self, tenant: Option<&str>, range: &KeyRange) -> Result<bool> {
        Self::validate(range)?;
        let accepted = self
            .store
            .run(|txn| -> Result<bool> {
                let tenant = tenant::resolve_opt(txn, tenant)?;
                let active = ledger::active_ranges_overlapping(txn, tenant, range)?;
                match classify(&active, range) {
                    Alignment::DisjointFromAll => Ok(true),
                    Alignment::PartialOverlap => Ok(false),
                    Alignment::ExactMatch => {
                        ledger::apply(txn, tenant, range, RangeState::Inactive)?;
                        Ok(true)
                    },
                }
            })
            .await?;
        debug!(%range, accepted, "unblobify");
        Ok(accepted)
    }

    /// Schedules reclamation of history at or below `cutoff` across `range`
    /// and returns a completion token immediately.
    ///
    /// `force` additionally deactivates the range once the task runs.
    /// Re-issuing a purge that has already completed returns a fresh token
    /// whose wait finishes immediately.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnsupportedPurge`] when `range` partially overlaps an
    /// active range. Honoring it would split a granule, so nothing is
    /// scheduled.
    pub async fn purge(
        &self,
        tenant: Option<&str>,
        range: &KeyRange,
        cutoff: CutoffVersion,
        force: bool,
    ) -> Result<PurgeToken> {
        Self::validate(range)?;
        let token = self
            .store
            .run(|txn| {
                let tenant = tenant::resolve_opt(txn, tenant)?;
                let active = ledger::active_ranges_overlapping(txn, tenant, range)?;
                let alignment = classify(&active, range);
                if alignment == Alignment::PartialOverlap {
                    return Err(RegistryError::UnsupportedPurge { range: range.clone() });
                }
                let resolved = cutoff.resolve(ledger::current_version(txn)?);
                let inactive = alignment == Alignment::DisjointFromAll;
                purge::create_task(txn, tenant, range, resolved, force, inactive)
            })
            .await?;
        debug!(%range, %cutoff, force, token = %token, "purge scheduled");
        Ok(token)
    }

    /// Blocks until the purge named by `token` has completed.
    ///
    /// Idempotent: waiting on an already-complete purge returns immediately.
    /// Dropping the returned future abandons only this wait; the purge task
    /// keeps running.
    pub async fn wait_purge_complete(&self, token: &PurgeToken) -> Result<()> {
        purge::wait_complete(&self.store, token, WaitConfig::default()).await
    }

    /// [`Self::wait_purge_complete`] with a deadline.
    ///
    /// # Errors
    ///
    /// [`RegistryError::WaitTimeout`] on expiry; the purge task keeps running.
    pub async fn wait_purge_complete_timeout(
        &self,
        token: &PurgeToken,
        timeout: Duration,
    ) -> Result<()> {
        purge::wait_complete_timeout(&self.store, token, WaitConfig::default(), timeout).await
    }

    /// Reads the task record behind a purge token, if the token is known.
    pub async fn purge_task(&self, token: &PurgeToken) -> Result<Option<PurgeTaskRecord>> {
        self.store.run(|txn| purge::read_task(txn, token)).await
    }

    /// Active ranges overlapping `range`, full boundaries, at most `limit`.
    pub async fn list_active_ranges(
        &self,
        tenant: Option<&str>,
        range: &KeyRange,
        limit: usize,
    ) -> Result<Vec<KeyRange>> {
        Self::validate(range)?;
        self.store
            .run(|txn| {
                let tenant = tenant::resolve_opt(txn, tenant)?;
                query::list_active_ranges(txn, tenant, range, limit)
            })
            .await
    }

    /// Contiguous covering runs overlapping `range`, at most `limit`.
    ///
    /// Includes inactive runs; results are never clipped to the query.
    pub async fn get_owning_ranges(
        &self,
        tenant: Option<&str>,
        range: &KeyRange,
        limit: usize,
    ) -> Result<Vec<KeyRange>> {
        Self::validate(range)?;
        self.store
            .run(|txn| {
                let tenant = tenant::resolve_opt(txn, tenant)?;
                query::get_owning_ranges(txn, tenant, range, limit)
            })
            .await
    }

    /// True only if one Active run covers the whole of `range`, and no
    /// completed purge has reclaimed the requested `as_of` version there.
    pub async fn is_range_fully_active(
        &self,
        tenant: Option<&str>,
        range: &KeyRange,
        as_of: Option<CutoffVersion>,
    ) -> Result<bool> {
        Self::validate(range)?;
        self.store
            .run(|txn| {
                let tenant = tenant::resolve_opt(txn, tenant)?;
                query::is_range_fully_active(txn, tenant, range, as_of)
            })
            .await
    }

    /// The current ledger commit version.
    pub async fn current_version(&self) -> Result<Version> {
        self.store.run(ledger::current_version).await
    }

    /// Raw boundary entries for one tenant, for invariant auditing.
    pub async fn boundary_snapshot(
        &self,
        tenant: Option<&str>,
    ) -> Result<Vec<(Key, RangeState)>> {
        self.store
            .run(|txn| {
                let tenant = tenant::resolve_opt(txn, tenant)?;
                ledger::dump_boundaries(txn, tenant)
            })
            .await
    }
}
