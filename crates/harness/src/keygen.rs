//! Candidate range generation for harness traffic.

use rand::Rng;

use blobrange_types::KeyRange;

use crate::model::ShadowModel;

/// Attempts before giving up on finding a free random range.
const RANDOM_ATTEMPTS: usize = 32;

/// Size of the numeric space random keys are drawn from. Small on purpose:
/// collisions with existing ranges are part of the workload.
const RANDOM_SPACE: u64 = 1 << 20;

/// How fresh candidate ranges are placed in the key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    /// Monotonically advancing ranges separated by a fixed gap. Gaps stay
    /// unkeyed forever, so gap probes have a guaranteed target.
    Sequential,
    /// Ranges drawn uniformly from a bounded space, retried until disjoint
    /// from the model.
    Random,
}

/// Produces fresh candidate ranges disjoint from the shadow model.
pub struct KeyGenerator {
    mode: KeyMode,
    gap: u64,
    max_span: u64,
    cursor: u64,
    last_begin: Option<u64>,
}

impl KeyGenerator {
    /// Creates a generator. `gap` is the unkeyed space left between
    /// consecutive sequential ranges; `max_span` bounds range width.
    #[must_use]
    pub fn new(mode: KeyMode, gap: u64, max_span: u64) -> Self {
        Self { mode, gap, max_span: max_span.max(1), cursor: 0, last_begin: None }
    }

    fn key(n: u64) -> Vec<u8> {
        // Fixed-width decimal so lexicographic order equals numeric order.
        format!("{n:012}").into_bytes()
    }

    fn range_at(begin: u64, span: u64) -> KeyRange {
        KeyRange::new(Self::key(begin), Self::key(begin + span))
            .unwrap_or_else(|| unreachable!("span is nonzero"))
    }

    /// The last gap left behind by sequential generation, if any ranges have
    /// been generated. Guaranteed to never become active.
    #[must_use]
    pub fn last_gap(&self) -> Option<KeyRange> {
        if self.mode != KeyMode::Sequential || self.gap == 0 {
            return None;
        }
        let begin = self.last_begin?;
        KeyRange::new(Self::key(begin - self.gap), Self::key(begin))
    }

    /// Produces the next candidate range, disjoint from `model`.
    ///
    /// Returns `None` only in random mode when the space is too crowded.
    pub fn next_range<R: Rng>(&mut self, rng: &mut R, model: &ShadowModel) -> Option<KeyRange> {
        match self.mode {
            KeyMode::Sequential => {
                let span = rng.gen_range(1..=self.max_span);
                let begin = self.cursor + self.gap;
                self.cursor = begin + span;
                self.last_begin = Some(begin);
                Some(Self::range_at(begin, span))
            },
            KeyMode::Random => {
                for _ in 0..RANDOM_ATTEMPTS {
                    let span = rng.gen_range(1..=self.max_span);
                    let begin = rng.gen_range(0..RANDOM_SPACE - span);
                    let candidate = Self::range_at(begin, span);
                    if !model.touches_any(&candidate) {
                        return Some(candidate);
                    }
                }
                None
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_sequential_ranges_never_touch() {
        let model = ShadowModel::new();
        let mut generator = KeyGenerator::new(KeyMode::Sequential, 4, 8);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut previous: Option<KeyRange> = None;
        for _ in 0..50 {
            let range = generator.next_range(&mut rng, &model).expect("sequential");
            if let Some(prev) = &previous {
                assert!(prev.end < range.begin, "gap required between {prev} and {range}");
            }
            previous = Some(range);
        }
    }

    #[test]
    fn test_sequential_gap_is_known() {
        let model = ShadowModel::new();
        let mut generator = KeyGenerator::new(KeyMode::Sequential, 4, 8);
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(generator.last_gap().is_none());
        let range = generator.next_range(&mut rng, &model).expect("sequential");
        let gap = generator.last_gap().expect("gap exists");
        assert_eq!(gap.end, range.begin);
    }

    #[test]
    fn test_random_ranges_avoid_model() {
        let model = ShadowModel::new();
        let mut generator = KeyGenerator::new(KeyMode::Random, 0, 64);
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..50 {
            let range = generator.next_range(&mut rng, &model).expect("room available");
            assert!(!model.touches_any(&range));
            model.push(range);
        }
    }
}
