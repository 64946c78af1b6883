//! Targeted scenario units, chosen by weighted random selection.

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::Rng;

use blobrange_registry::{BlobRangeRegistry, RegistryError, Result};
use blobrange_types::{CutoffVersion, KeyRange};

use crate::keygen::KeyGenerator;
use crate::model::ShadowModel;

/// One probe of a specific registry behavior.
///
/// Scenarios assert their expectations with panics: a failed expectation is
/// a registry bug, not a recoverable condition. Each scenario claims the
/// model ranges it probes, so concurrent client traffic never mutates them
/// mid-probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// A modeled active range, and any sub-range of it, verifies as fully
    /// active.
    VerifyRange,
    /// A range known to be unkeyed verifies as not fully active and lists no
    /// active ranges.
    VerifyRangeGap,
    /// Misaligned variants of an active range are rejected by every mutating
    /// call, and none of the rejections disturb the ledger.
    RangesMisaligned,
    /// Re-designating an active range is an accepted no-op.
    BlobifyIdempotent,
    /// A force-purged range can be designated again from scratch.
    ReBlobify,
}

impl Scenario {
    /// Picks a scenario by weight. `ReBlobify` participates only when
    /// enabled; its weight folds into `VerifyRange` otherwise.
    pub(crate) fn choose(rng: &mut SmallRng, enable_reblobify: bool) -> Self {
        match rng.gen_range(0..10u32) {
            0..=2 => Scenario::VerifyRange,
            3..=4 => Scenario::VerifyRangeGap,
            5..=6 => Scenario::RangesMisaligned,
            7..=8 => Scenario::BlobifyIdempotent,
            _ if enable_reblobify => Scenario::ReBlobify,
            _ => Scenario::VerifyRange,
        }
    }

    /// Runs the scenario against `registry`, keeping `model` in sync.
    pub(crate) async fn run(
        self,
        registry: &BlobRangeRegistry,
        tenant: Option<&str>,
        model: &ShadowModel,
        keygen: &Mutex<KeyGenerator>,
        rng: &mut SmallRng,
    ) -> Result<()> {
        match self {
            Scenario::VerifyRange => verify_range(registry, tenant, model, rng).await,
            Scenario::VerifyRangeGap => {
                verify_range_gap(registry, tenant, model, keygen, rng).await
            },
            Scenario::RangesMisaligned => ranges_misaligned(registry, tenant, model, rng).await,
            Scenario::BlobifyIdempotent => {
                blobify_idempotent(registry, tenant, model, rng).await
            },
            Scenario::ReBlobify => re_blobify(registry, tenant, model, rng).await,
        }
    }
}

/// A random interior sub-range of `range`, possibly `range` itself.
fn random_subrange(rng: &mut SmallRng, range: &KeyRange) -> KeyRange {
    if rng.gen_bool(0.5) {
        return range.clone();
    }
    let mut begin = range.begin.clone();
    begin.push(0x00);
    KeyRange::new(begin, range.end.clone()).unwrap_or_else(|| range.clone())
}

async fn verify_range(
    registry: &BlobRangeRegistry,
    tenant: Option<&str>,
    model: &ShadowModel,
    rng: &mut SmallRng,
) -> Result<()> {
    let Some(range) = model.claim_random(rng) else {
        return Ok(());
    };
    let probe = random_subrange(rng, &range);
    let active = registry.is_range_fully_active(tenant, &probe, None).await?;
    assert!(active, "modeled range {range} failed verification via probe {probe}");
    model.release(range);
    Ok(())
}

async fn verify_range_gap(
    registry: &BlobRangeRegistry,
    tenant: Option<&str>,
    model: &ShadowModel,
    keygen: &Mutex<KeyGenerator>,
    rng: &mut SmallRng,
) -> Result<()> {
    // Sequential mode probes the guaranteed-unkeyed gap behind the newest
    // range; random mode reserves a free candidate and probes that instead.
    let (gap, reserved) = {
        let mut keygen = keygen.lock();
        match keygen.last_gap() {
            Some(gap) => (gap, false),
            None => match keygen.next_range(rng, model) {
                Some(candidate) => {
                    model.reserve(candidate.clone());
                    (candidate, true)
                },
                None => return Ok(()),
            },
        }
    };
    let active = registry.is_range_fully_active(tenant, &gap, None).await?;
    assert!(!active, "unkeyed gap {gap} verified as fully active");
    let listed = registry.list_active_ranges(tenant, &gap, 100).await?;
    assert!(listed.is_empty(), "unkeyed gap {gap} lists active ranges {listed:?}");
    if reserved {
        model.discard(&gap);
    }
    Ok(())
}

async fn ranges_misaligned(
    registry: &BlobRangeRegistry,
    tenant: Option<&str>,
    model: &ShadowModel,
    rng: &mut SmallRng,
) -> Result<()> {
    let Some(range) = model.claim_random(rng) else {
        return Ok(());
    };

    let mut extended_end = range.end.clone();
    extended_end.push(0x00);
    let mut shifted_begin = range.begin.clone();
    shifted_begin.push(0x00);

    let probes = [
        // Strict sub-range sharing the end.
        KeyRange::new(shifted_begin.clone(), range.end.clone()),
        // Strict super-range sharing the begin.
        KeyRange::new(range.begin.clone(), extended_end.clone()),
        // Shifted on both sides.
        KeyRange::new(shifted_begin, extended_end),
    ];

    for probe in probes.into_iter().flatten() {
        assert!(
            !registry.blobify(tenant, &probe).await?,
            "misaligned blobify of {probe} over {range} was accepted"
        );
        assert!(
            !registry.unblobify(tenant, &probe).await?,
            "misaligned unblobify of {probe} over {range} was accepted"
        );
        let err = registry.purge(tenant, &probe, CutoffVersion::Latest, rng.gen_bool(0.5)).await;
        assert!(
            matches!(err, Err(RegistryError::UnsupportedPurge { .. })),
            "misaligned purge of {probe} over {range} did not fail hard: {err:?}"
        );
    }

    // None of the rejected calls may have moved a boundary.
    let listed = registry.list_active_ranges(tenant, &range, 100).await?;
    assert_eq!(listed, vec![range.clone()], "rejections disturbed the ledger around {range}");
    model.release(range);
    Ok(())
}

async fn blobify_idempotent(
    registry: &BlobRangeRegistry,
    tenant: Option<&str>,
    model: &ShadowModel,
    rng: &mut SmallRng,
) -> Result<()> {
    let Some(range) = model.claim_random(rng) else {
        return Ok(());
    };
    assert!(
        registry.blobify(tenant, &range).await?,
        "re-designating active range {range} was rejected"
    );
    let listed = registry.list_active_ranges(tenant, &range, 100).await?;
    assert_eq!(listed, vec![range.clone()], "idempotent blobify split {range}");
    model.release(range);
    Ok(())
}

async fn re_blobify(
    registry: &BlobRangeRegistry,
    tenant: Option<&str>,
    model: &ShadowModel,
    rng: &mut SmallRng,
) -> Result<()> {
    // The claim blocks candidate generation over this space for the whole
    // purge-then-redesignate window.
    let Some(range) = model.claim_random(rng) else {
        return Ok(());
    };
    let token = registry.purge(tenant, &range, CutoffVersion::Latest, true).await?;
    registry.wait_purge_complete(&token).await?;
    assert!(
        !registry.is_range_fully_active(tenant, &range, None).await?,
        "force-purged range {range} still fully active"
    );
    assert!(
        registry.blobify(tenant, &range).await?,
        "re-designation after force purge of {range} was rejected"
    );
    model.release(range);
    Ok(())
}
