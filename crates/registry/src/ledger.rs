//! The Range Ledger: durable boundary entries and run reconstruction.
//!
//! The ledger is a per-tenant ordered map of boundary keys to
//! [`RangeState`]; a boundary's state holds for `[this boundary, next
//! boundary)` and the space outside any explicit boundary defaults to
//! Inactive. The representation is minimal-run-length: consecutive
//! boundaries never share a state, so a maximal Active run *is* an active
//! range. [`apply`] preserves that invariant by coalescing with both
//! neighbors on every rewrite.
//!
//! Everything here operates inside a caller-provided transaction so that
//! validation and mutation share one serializable snapshot.

use blobrange_store::Transaction;
use blobrange_types::{
    decode, encode, keyspace_end, Key, KeyRange, RangeState, Version,
};

use crate::error::{RegistryError, Result};
use crate::keys;
use blobrange_types::TenantId;

/// Upper bound on boundary entries touched by a single scan.
///
/// Boundary sets are small (two entries per active range); this is a guard
/// against runaway scans, not a paging mechanism.
const MAX_BOUNDARY_SCAN: usize = 1 << 20;

fn decode_state(key: &[u8], value: &[u8]) -> Result<RangeState> {
    decode::<RangeState>(value).map_err(|e| RegistryError::CorruptLedger {
        reason: format!("boundary entry {} has undecodable state: {e}", hex(key)),
    })
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Reads the state holding just before `boundary`, with the boundary key it
/// holds from. `None` means the implicit Inactive run from start-of-space.
fn state_before(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    boundary: &[u8],
) -> Result<Option<(Key, RangeState)>> {
    let prefix = keys::boundary_prefix(tenant);
    let probe = keys::boundary_key(tenant, boundary);
    match txn.get_prev(&probe)? {
        Some((k, v)) if k.starts_with(&prefix) => {
            let (_, run_begin) = keys::decode_boundary_key(&k).ok_or_else(|| {
                RegistryError::CorruptLedger {
                    reason: format!("undecodable boundary key {}", hex(&k)),
                }
            })?;
            let state = decode_state(&k, &v)?;
            Ok(Some((run_begin, state)))
        },
        _ => Ok(None),
    }
}

/// Reconstructs the full runs overlapping `range`.
///
/// Each returned run carries its *actual* boundaries, which may extend
/// beyond the queried range on either side — queries over the ledger never
/// clip. Runs are contiguous and alternate in state.
pub(crate) fn read_runs(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    range: &KeyRange,
) -> Result<Vec<(KeyRange, RangeState)>> {
    let prefix = keys::boundary_prefix(tenant);
    let (_, prefix_end) = keys::range_of_prefix(&prefix);

    // Points where a run starts: the entry at or before range.begin (or the
    // implicit Inactive start of space), then every boundary inside the range.
    let mut points: Vec<(Key, RangeState)> = Vec::new();
    match state_before(txn, tenant, &range.begin)? {
        Some((run_begin, state)) => points.push((run_begin, state)),
        None => points.push((Vec::new(), RangeState::Inactive)),
    }

    let inside = txn.get_range(
        &keys::boundary_key(tenant, &range.begin),
        &keys::boundary_key(tenant, &range.end),
        MAX_BOUNDARY_SCAN,
    )?;
    for (k, v) in inside {
        let (_, boundary) = keys::decode_boundary_key(&k).ok_or_else(|| {
            RegistryError::CorruptLedger { reason: format!("undecodable boundary key {}", hex(&k)) }
        })?;
        let state = decode_state(&k, &v)?;
        if points.len() == 1 && points[0].0 == boundary {
            // A boundary at start-of-space supersedes the implicit run.
            points[0] = (boundary, state);
        } else {
            points.push((boundary, state));
        }
    }

    // The run in progress at range.end closes at the next boundary at or
    // past it, or at the end of key space.
    let closing = txn.get_range(&keys::boundary_key(tenant, &range.end), &prefix_end, 1)?;
    let close_at = match closing.first() {
        Some((k, _)) => {
            keys::decode_boundary_key(k)
                .ok_or_else(|| RegistryError::CorruptLedger {
                    reason: format!("undecodable boundary key {}", hex(k)),
                })?
                .1
        },
        None => keyspace_end(),
    };

    let mut runs = Vec::with_capacity(points.len());
    for (i, (begin, state)) in points.iter().enumerate() {
        let end = points.get(i + 1).map(|(b, _)| b.clone()).unwrap_or_else(|| close_at.clone());
        if let Some(next) = points.get(i + 1) {
            if next.1 == *state {
                return Err(RegistryError::CorruptLedger {
                    reason: format!(
                        "consecutive runs at {} share state {state}",
                        hex(&next.0)
                    ),
                });
            }
        }
        let Some(run) = KeyRange::new(begin.clone(), end) else {
            return Err(RegistryError::CorruptLedger {
                reason: format!("empty run at boundary {}", hex(begin)),
            });
        };
        if run.overlaps(range) {
            runs.push((run, *state));
        }
    }
    Ok(runs)
}

/// The active ranges overlapping `range`, with full boundaries.
pub(crate) fn active_ranges_overlapping(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    range: &KeyRange,
) -> Result<Vec<KeyRange>> {
    Ok(read_runs(txn, tenant, range)?
        .into_iter()
        .filter(|(_, state)| state.is_active())
        .map(|(run, _)| run)
        .collect())
}

/// Rewrites the ledger so `range` holds `new_state`, coalescing with both
/// neighbors to preserve the minimal-run-length invariant.
///
/// Pre-condition: the mutation has already passed alignment validation in
/// this same transaction. Bumps the ledger commit version.
pub(crate) fn apply(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
    range: &KeyRange,
    new_state: RangeState,
) -> Result<Version> {
    let begin_key = keys::boundary_key(tenant, &range.begin);
    let end_key = keys::boundary_key(tenant, &range.end);

    let prev_state =
        state_before(txn, tenant, &range.begin)?.map(|(_, s)| s).unwrap_or(RangeState::Inactive);

    // State currently holding at range.end, before the rewrite.
    let entry_at_end = txn.get(&end_key)?;
    let state_at_end = match &entry_at_end {
        Some(v) => decode_state(&end_key, v)?,
        None => {
            let interior = txn.get_range(&begin_key, &end_key, MAX_BOUNDARY_SCAN)?;
            match interior.last() {
                Some((k, v)) => decode_state(k, v)?,
                None => prev_state,
            }
        },
    };

    // Drop every boundary inside [begin, end); the entry at end survives for
    // the coalesce decision below.
    txn.clear_range(&begin_key, &end_key);

    if prev_state != new_state {
        txn.set(&begin_key, &encode(&new_state)?);
    }

    match entry_at_end {
        // Coalesce right: the following run already has our state.
        Some(_) if state_at_end == new_state => txn.clear(&end_key),
        Some(_) => {},
        None if state_at_end != new_state => {
            txn.set(&end_key, &encode(&state_at_end)?);
        },
        None => {},
    }

    bump_version(txn)
}

/// Reads the ledger commit version.
pub(crate) fn current_version(txn: &mut Transaction) -> Result<Version> {
    match txn.get(&keys::version_key())? {
        Some(v) => Ok(Version::new(decode::<u64>(&v)?)),
        None => Ok(Version::ZERO),
    }
}

/// Bumps and returns the ledger commit version.
pub(crate) fn bump_version(txn: &mut Transaction) -> Result<Version> {
    let next = current_version(txn)?.next();
    txn.set(&keys::version_key(), &encode(&next.value())?);
    Ok(next)
}

/// Raw boundary entries for one tenant, for invariant auditing.
pub(crate) fn dump_boundaries(
    txn: &mut Transaction,
    tenant: Option<TenantId>,
) -> Result<Vec<(Key, RangeState)>> {
    let prefix = keys::boundary_prefix(tenant);
    let (begin, end) = keys::range_of_prefix(&prefix);
    let mut out = Vec::new();
    for (k, v) in txn.get_range(&begin, &end, MAX_BOUNDARY_SCAN)? {
        let (_, boundary) = keys::decode_boundary_key(&k).ok_or_else(|| {
            RegistryError::CorruptLedger { reason: format!("undecodable boundary key {}", hex(&k)) }
        })?;
        let state = decode_state(&k, &v)?;
        out.push((boundary, state));
    }
    Ok(out)
}
