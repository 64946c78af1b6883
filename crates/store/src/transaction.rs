//! Snapshot-isolated transactions.
//!
//! A [`Transaction`] captures an immutable snapshot of the committed state at
//! begin time, applies mutations to a private working copy (read-your-writes),
//! and records every read as a key range. At commit the store validates the
//! read set against writes committed since the snapshot; any intersection
//! aborts with [`Error::Conflict`](crate::Error::Conflict) and the enclosing
//! unit of work is re-run by [`Store::run`](crate::Store::run).

use std::collections::BTreeMap;

use blobrange_types::Key;

use crate::db::Store;
use crate::error::Result;

/// A buffered mutation, replayed onto the latest committed state at commit.
#[derive(Debug, Clone)]
pub(crate) enum WriteOp {
    /// Set `key` to `value`.
    Set { key: Key, value: Vec<u8> },
    /// Remove `key` if present.
    Clear { key: Key },
    /// Remove every key in `[begin, end)`.
    ClearRange { begin: Key, end: Key },
}

impl WriteOp {
    /// The key range this op invalidates for concurrent readers.
    pub(crate) fn written_range(&self) -> (Key, Key) {
        match self {
            WriteOp::Set { key, .. } | WriteOp::Clear { key } => (key.clone(), key_after(key)),
            WriteOp::ClearRange { begin, end } => (begin.clone(), end.clone()),
        }
    }
}

/// Returns the immediate successor of `key` in lexicographic order.
pub(crate) fn key_after(key: &[u8]) -> Key {
    let mut next = key.to_vec();
    next.push(0);
    next
}

/// A read-your-writes transaction over a snapshot of the store.
pub struct Transaction {
    store: Store,
    /// Commit version the snapshot was taken at.
    pub(crate) snapshot_version: u64,
    /// Snapshot plus buffered local mutations.
    working: BTreeMap<Key, Vec<u8>>,
    /// Key ranges read so far, for serializability validation.
    pub(crate) reads: Vec<(Key, Key)>,
    /// Buffered mutations in application order.
    pub(crate) writes: Vec<WriteOp>,
}

impl Transaction {
    pub(crate) fn new(store: Store, snapshot_version: u64, working: BTreeMap<Key, Vec<u8>>) -> Self {
        Self { store, snapshot_version, working, reads: Vec::new(), writes: Vec::new() }
    }

    /// Reads a single key.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.maybe_inject_fault()?;
        self.reads.push((key.to_vec(), key_after(key)));
        Ok(self.working.get(key).cloned())
    }

    /// Reads up to `limit` entries in `[begin, end)`, in key order.
    ///
    /// The whole requested range joins the read set even when `limit`
    /// truncates the result.
    pub fn get_range(
        &mut self,
        begin: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<(Key, Vec<u8>)>> {
        self.store.maybe_inject_fault()?;
        self.reads.push((begin.to_vec(), end.to_vec()));
        Ok(self
            .working
            .range(begin.to_vec()..end.to_vec())
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Returns the greatest entry with key strictly below `key`, if any.
    pub fn get_prev(&mut self, key: &[u8]) -> Result<Option<(Key, Vec<u8>)>> {
        self.store.maybe_inject_fault()?;
        let found = self.working.range(..key.to_vec()).next_back();
        // The gap between the found entry (or start of space) and `key` is
        // load-bearing: an insert there would change this answer.
        let low = found.map(|(k, _)| k.clone()).unwrap_or_default();
        self.reads.push((low, key.to_vec()));
        Ok(found.map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Sets `key` to `value`.
    pub fn set(&mut self, key: &[u8], value: &[u8]) {
        self.working.insert(key.to_vec(), value.to_vec());
        self.writes.push(WriteOp::Set { key: key.to_vec(), value: value.to_vec() });
    }

    /// Removes `key` if present.
    pub fn clear(&mut self, key: &[u8]) {
        self.working.remove(key);
        self.writes.push(WriteOp::Clear { key: key.to_vec() });
    }

    /// Removes every key in `[begin, end)`.
    pub fn clear_range(&mut self, begin: &[u8], end: &[u8]) {
        let doomed: Vec<Key> =
            self.working.range(begin.to_vec()..end.to_vec()).map(|(k, _)| k.clone()).collect();
        for key in doomed {
            self.working.remove(&key);
        }
        self.writes.push(WriteOp::ClearRange { begin: begin.to_vec(), end: end.to_vec() });
    }

    /// True if the transaction buffered no mutations.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Validates the read set and atomically applies buffered writes.
    ///
    /// Returns the commit version. Read-only transactions skip validation
    /// and leave the version untouched; their snapshot reads are already
    /// serializable at snapshot time.
    pub fn commit(self) -> Result<u64> {
        let store = self.store.clone();
        store.commit(self)
    }
}
