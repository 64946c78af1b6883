//! The Purge Coordinator: versioned, idempotent, asynchronous reclamation.
//!
//! A purge call validates alignment, persists a `Pending` task record, and
//! returns an opaque token immediately. The [`PurgeWorker`] background task
//! drives records to `Done`: it advances the per-range reclamation watermark
//! to the task cutoff and, for force purges, deactivates the target range.
//! Callers block on completion with a bounded-backoff poll of the record;
//! cancelling a wait abandons only the wait, never the task.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use blobrange_store::{Store, Transaction};
use blobrange_types::{
    decode, encode, KeyRange, PurgeTaskRecord, PurgeTaskState, PurgeToken, RangeState, TenantId,
    Version,
};
use serde::{Deserialize, Serialize};

use crate::align::{classify, Alignment};
use crate::error::{RegistryError, Result};
use crate::keys;
use crate::ledger;

/// Watermark record: versions at or below `version` have been reclaimed
/// across `range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct WatermarkRecord {
    pub(crate) range: KeyRange,
    pub(crate) version: Version,
}

/// Upper bound on system records scanned per query.
const MAX_SYSTEM_SCAN: usize = 1 << 16;

/// Highest reclaimed version across any watermark overlapping `range`.
pub(crate) fn max_watermark_overlapping(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    range: &KeyRange,
) -> Result<Option<Version>> {
    let prefix = keys::watermark_prefix(tenant);
    let (begin, end) = keys::range_of_prefix(&prefix);
    let mut max: Option<Version> = None;
    for (_, v) in txn.get_range(&begin, &end, MAX_SYSTEM_SCAN)? {
        let record: WatermarkRecord = decode(&v)?;
        if record.range.overlaps(range) && max.map_or(true, |m| record.version > m) {
            max = Some(record.version);
        }
    }
    Ok(max)
}

/// True if some single watermark already covers `range` up to `cutoff`.
fn watermark_satisfies(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    range: &KeyRange,
    cutoff: Version,
) -> Result<bool> {
    let prefix = keys::watermark_prefix(tenant);
    let (begin, end) = keys::range_of_prefix(&prefix);
    for (_, v) in txn.get_range(&begin, &end, MAX_SYSTEM_SCAN)? {
        let record: WatermarkRecord = decode(&v)?;
        if record.range.contains_range(range) && record.version >= cutoff {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Raises the watermark for `range` to at least `cutoff`.
pub(crate) fn advance_watermark(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    range: &KeyRange,
    cutoff: Version,
) -> Result<()> {
    let key = keys::watermark_key(tenant, &range.begin, &range.end);
    let version = match txn.get(&key)? {
        Some(v) => {
            let existing: WatermarkRecord = decode(&v)?;
            existing.version.max(cutoff)
        },
        None => cutoff,
    };
    let record = WatermarkRecord { range: range.clone(), version };
    txn.set(&key, &encode(&record)?);
    Ok(())
}

/// Allocates a fresh opaque purge token: sequence number plus random suffix.
pub(crate) fn new_token(txn: &mut Transaction) -> Result<PurgeToken> {
    let seq = match txn.get(&keys::purge_seq_key())? {
        Some(v) => decode::<u64>(&v)? + 1,
        None => 1,
    };
    txn.set(&keys::purge_seq_key(), &encode(&seq)?);

    let mut bytes = Vec::with_capacity(24);
    bytes.extend_from_slice(&seq.to_be_bytes());
    bytes.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
    Ok(PurgeToken::from_bytes(bytes))
}

/// Creates a purge task inside `txn` and returns its token.
///
/// Alignment must have been checked by the caller in this same transaction.
/// If an earlier purge already reclaimed `range` up to `cutoff` (and, for
/// force purges, the range is already inactive), the task is born `Done` so
/// a re-issued identical purge completes immediately.
pub(crate) fn create_task(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    range: &KeyRange,
    cutoff: Version,
    force: bool,
    range_is_inactive: bool,
) -> Result<PurgeToken> {
    let satisfied = range_is_inactive && watermark_satisfies(txn, tenant, range, cutoff)?;
    let state = if satisfied { PurgeTaskState::Done } else { PurgeTaskState::Pending };
    let token = new_token(txn)?;
    let record = PurgeTaskRecord { tenant, range: range.clone(), cutoff, force, state };
    txn.set(&keys::purge_task_key(&token), &encode(&record)?);
    Ok(token)
}

/// Reads a task record by token.
pub(crate) fn read_task(
    txn: &mut Transaction,
    token: &PurgeToken,
) -> Result<Option<PurgeTaskRecord>> {
    match txn.get(&keys::purge_task_key(token))? {
        Some(v) => Ok(Some(decode(&v)?)),
        None => Ok(None),
    }
}

/// Configuration for waiting on purge completion.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WaitConfig {
    /// Initial poll interval; doubles up to `max_poll`.
    pub(crate) min_poll: Duration,
    /// Poll interval ceiling.
    pub(crate) max_poll: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self { min_poll: Duration::from_millis(5), max_poll: Duration::from_millis(250) }
    }
}

/// Polls a task record until it reaches `Done`.
///
/// Transient store failures are retried inside each poll; the loop itself
/// has no attempt bound — callers impose deadlines with
/// [`wait_complete_timeout`].
pub(crate) async fn wait_complete(
    store: &Store,
    token: &PurgeToken,
    config: WaitConfig,
) -> Result<()> {
    let mut poll = config.min_poll;
    loop {
        let record = store.run(|txn| read_task(txn, token)).await?;
        match record {
            None => return Err(RegistryError::UnknownPurgeToken { token: token.clone() }),
            Some(r) if r.is_done() => return Ok(()),
            Some(_) => {
                tokio::time::sleep(poll).await;
                poll = (poll * 2).min(config.max_poll);
            },
        }
    }
}

/// [`wait_complete`] with a caller-imposed deadline.
///
/// On expiry the wait reports [`RegistryError::WaitTimeout`]; the underlying
/// task keeps running.
pub(crate) async fn wait_complete_timeout(
    store: &Store,
    token: &PurgeToken,
    config: WaitConfig,
    timeout: Duration,
) -> Result<()> {
    match tokio::time::timeout(timeout, wait_complete(store, token, config)).await {
        Ok(result) => result,
        Err(_) => Err(RegistryError::WaitTimeout { token: token.clone() }),
    }
}

/// Purge worker configuration.
#[derive(Debug, Clone, bon::Builder)]
pub struct PurgeWorkerConfig {
    /// Interval between scan cycles.
    #[builder(default = Duration::from_millis(20))]
    pub interval: Duration,
    /// Maximum tasks executed per cycle.
    #[builder(default = 64)]
    pub max_batch_size: usize,
}

impl Default for PurgeWorkerConfig {
    fn default() -> Self {
        PurgeWorkerConfig::builder().build()
    }
}

/// Background task driving purge records from `Pending` to `Done`.
///
/// Runs until its handle is shut down. Cycle errors are logged and retried
/// on the next tick; they never kill the worker.
pub struct PurgeWorker {
    store: Store,
    config: PurgeWorkerConfig,
}

/// Handle for stopping a spawned [`PurgeWorker`].
pub struct PurgeWorkerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl PurgeWorkerHandle {
    /// Stops the worker and waits for the current cycle to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.join.await;
    }
}

impl PurgeWorker {
    /// Creates a worker over the given store.
    #[must_use]
    pub fn new(store: Store, config: PurgeWorkerConfig) -> Self {
        Self { store, config }
    }

    /// Spawns the worker loop onto the current runtime.
    #[must_use]
    pub fn spawn(self) -> PurgeWorkerHandle {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_cycle().await {
                            warn!(error = %e, "purge cycle failed; will retry next tick");
                        }
                    },
                }
            }
        });
        PurgeWorkerHandle { cancel, join }
    }

    /// Scans for pending tasks and executes up to one batch of them.
    async fn run_cycle(&self) -> Result<()> {
        let batch = self.config.max_batch_size;
        let pending: Vec<PurgeToken> = self
            .store
            .run(|txn| -> Result<Vec<PurgeToken>> {
                let (begin, end) = keys::purge_task_range();
                let mut tokens = Vec::new();
                for (k, v) in txn.get_range(&begin, &end, MAX_SYSTEM_SCAN)? {
                    let record: PurgeTaskRecord = decode(&v)?;
                    if !record.is_done() {
                        if let Some(token) = keys::decode_purge_task_key(&k) {
                            tokens.push(token);
                        }
                        if tokens.len() >= batch {
                            break;
                        }
                    }
                }
                Ok(tokens)
            })
            .await?;

        for token in pending {
            self.execute_task(&token).await?;
        }
        Ok(())
    }

    /// Reclaims one task's range and marks it `Done`.
    async fn execute_task(&self, token: &PurgeToken) -> Result<()> {
        let completed = self
            .store
            .run(|txn| -> Result<Option<PurgeTaskRecord>> {
                let Some(record) = read_task(txn, token)? else {
                    return Ok(None);
                };
                if record.is_done() {
                    return Ok(None);
                }

                advance_watermark(txn, record.tenant, &record.range, record.cutoff)?;

                if record.force {
                    let active =
                        ledger::active_ranges_overlapping(txn, record.tenant, &record.range)?;
                    match classify(&active, &record.range) {
                        Alignment::ExactMatch => {
                            ledger::apply(txn, record.tenant, &record.range, RangeState::Inactive)?;
                        },
                        Alignment::DisjointFromAll => {},
                        Alignment::PartialOverlap => {
                            // The ledger changed under the task (unblobify +
                            // re-blobify race). History is still reclaimed,
                            // but deactivation would split a granule.
                            warn!(
                                range = %record.range,
                                "force purge target no longer exactly active; skipping deactivation"
                            );
                        },
                    }
                }

                let done = PurgeTaskRecord { state: PurgeTaskState::Done, ..record };
                txn.set(&keys::purge_task_key(token), &encode(&done)?);
                Ok(Some(done))
            })
            .await?;

        if let Some(record) = completed {
            debug!(
                token = %token,
                range = %record.range,
                cutoff = %record.cutoff,
                force = record.force,
                "purge task complete"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn range(b: &[u8], e: &[u8]) -> KeyRange {
        KeyRange::new(b.to_vec(), e.to_vec()).expect("valid range")
    }

    #[test]
    fn test_tokens_are_unique_and_ordered_by_sequence() {
        let store = Store::new();
        let mut txn = store.begin();
        let t1 = new_token(&mut txn).expect("token");
        let t2 = new_token(&mut txn).expect("token");
        assert_ne!(t1, t2);
        assert!(t1.as_bytes() < t2.as_bytes(), "sequence prefix must order tokens");
    }

    #[test]
    fn test_watermark_advances_monotonically() {
        let store = Store::new();
        let mut txn = store.begin();
        let r = range(b"a", b"c");
        advance_watermark(&mut txn, None, &r, Version::new(10)).expect("advance");
        advance_watermark(&mut txn, None, &r, Version::new(5)).expect("no regress");
        let max = max_watermark_overlapping(&mut txn, None, &r).expect("max");
        assert_eq!(max, Some(Version::new(10)));
    }

    #[test]
    fn test_watermark_overlap_scope() {
        let store = Store::new();
        let mut txn = store.begin();
        advance_watermark(&mut txn, None, &range(b"a", b"c"), Version::new(7)).expect("advance");

        let hit = max_watermark_overlapping(&mut txn, None, &range(b"b", b"z")).expect("max");
        assert_eq!(hit, Some(Version::new(7)));
        let miss = max_watermark_overlapping(&mut txn, None, &range(b"c", b"z")).expect("max");
        assert_eq!(miss, None);
    }

    #[test]
    fn test_watermarks_with_equal_concatenation_stay_separate() {
        let store = Store::new();
        let mut txn = store.begin();
        // [a, bc) and [ab, c) flatten to the same bytes; each must keep its
        // own record.
        advance_watermark(&mut txn, None, &range(b"a", b"bc"), Version::new(10)).expect("advance");
        advance_watermark(&mut txn, None, &range(b"ab", b"c"), Version::new(1)).expect("advance");

        // [a, ab) overlaps only the first range, whose watermark must survive.
        let max = max_watermark_overlapping(&mut txn, None, &range(b"a", b"ab")).expect("max");
        assert_eq!(max, Some(Version::new(10)));
    }

    #[test]
    fn test_create_task_born_done_when_satisfied() {
        let store = Store::new();
        let mut txn = store.begin();
        let r = range(b"a", b"c");
        advance_watermark(&mut txn, None, &r, Version::new(9)).expect("advance");

        let token = create_task(&mut txn, None, &r, Version::new(9), true, true).expect("create");
        let record = read_task(&mut txn, &token).expect("read").expect("present");
        assert!(record.is_done());

        // Higher cutoff than any watermark: born pending.
        let token =
            create_task(&mut txn, None, &r, Version::new(11), true, true).expect("create");
        let record = read_task(&mut txn, &token).expect("read").expect("present");
        assert!(!record.is_done());
    }
}
