//! Store handle, commit path, and the retry boundary.
//!
//! [`Store`] is a cheaply cloneable handle over shared committed state.
//! Commits are validated optimistically: the committing transaction's read
//! set is intersected with every write range committed since its snapshot.
//! [`Store::run`] is the single retry boundary for callers — it re-runs a
//! unit of work with exponential backoff while the failure is transient,
//! matching the catch-transient / re-resolve / retry convention of the
//! transactional store this crate stands in for.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use parking_lot::Mutex;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing::debug;

use blobrange_types::Key;

use crate::error::{Error, Result, TransientError};
use crate::transaction::Transaction;

/// Store configuration.
#[derive(Debug, Clone, bon::Builder)]
pub struct StoreConfig {
    /// Probability in `[0, 1]` that a read or commit fails with an injected
    /// transient error.
    #[builder(default = 0.0)]
    pub fault_probability: f64,
    /// Seed for the fault-injection RNG, for reproducible runs.
    #[builder(default = 0xB10B)]
    pub fault_seed: u64,
    /// Minimum retry backoff.
    #[builder(default = Duration::from_millis(2))]
    pub min_backoff: Duration,
    /// Maximum retry backoff.
    #[builder(default = Duration::from_millis(100))]
    pub max_backoff: Duration,
    /// Maximum attempts per unit of work; `0` means retry until a permanent
    /// outcome.
    #[builder(default = 0)]
    pub max_attempts: u32,
    /// How many committed write ranges to retain for conflict validation.
    /// Transactions older than the retained window abort as transient.
    #[builder(default = 8192)]
    pub recent_writes_cap: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::builder().build()
    }
}

/// Committed state shared by all handles.
struct Inner {
    data: BTreeMap<Key, Vec<u8>>,
    /// Bumped on every mutating commit.
    version: u64,
    /// Write ranges of recent commits: `(commit_version, begin, end)`.
    recent_writes: VecDeque<(u64, Key, Key)>,
}

/// A serializable, snapshot-isolated, in-memory ordered KV store.
///
/// Thread-safe and cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
    rng: Arc<Mutex<SmallRng>>,
    config: Arc<StoreConfig>,
}

impl Store {
    /// Creates an empty store with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates an empty store with the given configuration.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                data: BTreeMap::new(),
                version: 0,
                recent_writes: VecDeque::new(),
            })),
            rng: Arc::new(Mutex::new(SmallRng::seed_from_u64(config.fault_seed))),
            config: Arc::new(config),
        }
    }

    /// Begins a transaction against a snapshot of the current state.
    #[must_use]
    pub fn begin(&self) -> Transaction {
        let inner = self.inner.lock();
        Transaction::new(self.clone(), inner.version, inner.data.clone())
    }

    /// Current commit version.
    #[must_use]
    pub fn current_version(&self) -> u64 {
        self.inner.lock().version
    }

    /// Rolls the fault-injection dice; called on reads and commits.
    pub(crate) fn maybe_inject_fault(&self) -> Result<()> {
        if self.config.fault_probability > 0.0 {
            let roll: f64 = self.rng.lock().gen();
            if roll < self.config.fault_probability {
                return Err(Error::Unavailable);
            }
        }
        Ok(())
    }

    /// Validates and applies a transaction.
    pub(crate) fn commit(&self, txn: Transaction) -> Result<u64> {
        self.maybe_inject_fault()?;
        let mut inner = self.inner.lock();

        // Read-only transactions are serializable at snapshot time; only a
        // commit that writes needs its read set validated.
        if txn.writes.is_empty() {
            return Ok(inner.version);
        }

        if txn.snapshot_version < inner.version {
            // Conflict window must reach back to the snapshot, otherwise we
            // cannot prove serializability and must re-run.
            let oldest_tracked =
                inner.recent_writes.front().map(|(v, _, _)| *v).unwrap_or(inner.version + 1);
            if txn.snapshot_version + 1 < oldest_tracked {
                return Err(Error::SnapshotTooOld { version: txn.snapshot_version });
            }
            for (commit_version, begin, end) in &inner.recent_writes {
                if *commit_version <= txn.snapshot_version {
                    continue;
                }
                for (read_begin, read_end) in &txn.reads {
                    if begin < read_end && read_begin < end {
                        return Err(Error::Conflict);
                    }
                }
            }
        }

        inner.version += 1;
        let commit_version = inner.version;
        for op in &txn.writes {
            let (begin, end) = op.written_range();
            inner.recent_writes.push_back((commit_version, begin, end));
        }
        while inner.recent_writes.len() > self.config.recent_writes_cap {
            inner.recent_writes.pop_front();
        }

        for op in txn.writes {
            match op {
                crate::transaction::WriteOp::Set { key, value } => {
                    inner.data.insert(key, value);
                },
                crate::transaction::WriteOp::Clear { key } => {
                    inner.data.remove(&key);
                },
                crate::transaction::WriteOp::ClearRange { begin, end } => {
                    let doomed: Vec<Key> =
                        inner.data.range(begin..end).map(|(k, _)| k.clone()).collect();
                    for key in doomed {
                        inner.data.remove(&key);
                    }
                },
            }
        }

        Ok(commit_version)
    }

    /// Runs a unit of work inside a transaction, retrying transient failures.
    ///
    /// This is the retry boundary: the closure may run multiple times and
    /// must be idempotent up to its own writes (each attempt sees a fresh
    /// snapshot and a fresh write buffer). Returns the closure's value once a
    /// commit succeeds, or the first permanent error. Generic over the
    /// caller's error type so higher layers keep their own error enums while
    /// sharing one retry loop.
    pub async fn run<T, E, F>(&self, mut unit: F) -> Result<T, E>
    where
        E: TransientError + From<Error> + std::fmt::Display,
        F: FnMut(&mut Transaction) -> Result<T, E>,
    {
        let mut backoff = ExponentialBuilder::default()
            .with_min_delay(self.config.min_backoff)
            .with_max_delay(self.config.max_backoff)
            .build();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let mut attempt = || -> Result<T, E> {
                let mut txn = self.begin();
                let value = unit(&mut txn)?;
                txn.commit()?;
                Ok(value)
            };

            match attempt() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    if self.config.max_attempts != 0 && attempts >= self.config.max_attempts {
                        return Err(E::from(Error::RetryExhausted {
                            attempts,
                            last_error: e.to_string(),
                        }));
                    }
                    let delay = backoff.next().unwrap_or(self.config.max_backoff);
                    debug!(
                        attempt = attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying unit of work after transient store error"
                    );
                    tokio::time::sleep(delay).await;
                },
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
