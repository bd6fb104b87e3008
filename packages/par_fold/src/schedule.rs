//! Chunk-claim schedules deciding how much of the range a worker takes at once.

use std::num::NonZero;
use std::ops::Range;

use crate::cursor::RangeCursor;

/// Fixed-size chunk claims: every claim takes exactly the configured chunk
/// (less at the very end of the range), using fetch-and-add on the cursor.
#[derive(Debug)]
pub(crate) struct StaticChunks {
    chunk: NonZero<usize>,
}

impl StaticChunks {
    pub(crate) fn new(chunk: NonZero<usize>) -> Self {
        Self { chunk }
    }

    /// The next chunk for the calling worker, or `None` once the range is
    /// exhausted.
    pub(crate) fn next_claim(&self, cursor: &RangeCursor) -> Option<Range<usize>> {
        cursor.claim(self.chunk)
    }
}

/// Adaptive chunk claims: while plenty of work remains, each claim takes a
/// fixed fraction of it, so early claims are large (few coordination points)
/// and later claims shrink; once remaining work falls to the threshold, the
/// schedule switches to fixed chunks for fine-grained tail balance.
#[derive(Debug)]
pub(crate) struct GuidedChunks {
    chunk: NonZero<usize>,
    workers: NonZero<usize>,

    /// Remaining-work level at or below which claims switch to the fixed
    /// fine-phase size: `2 * workers * (chunk + 1)`.
    threshold: usize,
}

impl GuidedChunks {
    pub(crate) fn new(chunk: NonZero<usize>, workers: NonZero<usize>) -> Self {
        let threshold = workers
            .get()
            .checked_mul(2)
            .and_then(|doubled| doubled.checked_mul(chunk.get().checked_add(1)?))
            .expect("threshold overflows usize only for absurd worker or chunk counts");

        Self {
            chunk,
            workers,
            threshold,
        }
    }

    /// Size of a coarse-phase claim: one `2 * workers`-th of the remaining
    /// work, but never less than the configured chunk size.
    fn coarse_claim_size(&self, remaining: usize) -> usize {
        #[expect(
            clippy::integer_division,
            reason = "floor division is the intended claim fraction"
        )]
        let share = remaining / self.workers.get().saturating_mul(2);

        share.max(self.chunk.get())
    }

    /// The next chunk for the calling worker, or `None` once the range is
    /// exhausted.
    ///
    /// Coarse-phase claims go through compare-and-swap because their size
    /// was derived from a plain read of the cursor; fine-phase claims are
    /// fixed-size and can use the cheaper fetch-and-add.
    #[cfg_attr(test, mutants::skip)] // Tampering with the claim loop spins forever.
    pub(crate) fn next_claim(&self, cursor: &RangeCursor) -> Option<Range<usize>> {
        loop {
            let start = cursor.position();

            if start >= cursor.len() {
                return None;
            }

            let remaining = cursor.len().saturating_sub(start);

            if remaining <= self.threshold {
                // Fine phase: fixed claims rebalance the tail.
                return cursor.claim(self.chunk);
            }

            let end = cursor
                .len()
                .min(start.saturating_add(self.coarse_claim_size(remaining)));

            if cursor.try_claim(start, end) {
                return Some(start..end);
            }

            // Lost the race to another worker; re-observe and try again.
        }
    }
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn static_chunks_walk_the_range_in_fixed_steps() {
        let schedule = StaticChunks::new(nz!(3));
        let cursor = RangeCursor::new(8);

        assert_eq!(schedule.next_claim(&cursor), Some(0..3));
        assert_eq!(schedule.next_claim(&cursor), Some(3..6));
        assert_eq!(schedule.next_claim(&cursor), Some(6..8));
        assert_eq!(schedule.next_claim(&cursor), None);
    }

    #[test]
    fn guided_threshold_is_twice_workers_times_chunk_plus_one() {
        let schedule = GuidedChunks::new(nz!(4), nz!(2));
        assert_eq!(schedule.threshold, 20);

        let schedule = GuidedChunks::new(nz!(1), nz!(8));
        assert_eq!(schedule.threshold, 32);
    }

    #[test]
    fn coarse_claim_size_never_drops_below_the_chunk() {
        let schedule = GuidedChunks::new(nz!(8), nz!(4));

        // One eighth of the remaining work would be tiny here; the chunk
        // size acts as the floor.
        assert_eq!(schedule.coarse_claim_size(10), 8);

        // With plenty remaining, the fractional share wins.
        assert_eq!(schedule.coarse_claim_size(800), 100);
    }

    #[test]
    fn guided_claims_cover_the_range_without_gaps_or_overlap() {
        let schedule = GuidedChunks::new(nz!(4), nz!(2));
        let cursor = RangeCursor::new(10_000);

        let mut next_expected = 0;
        while let Some(claim) = schedule.next_claim(&cursor) {
            assert_eq!(claim.start, next_expected);
            assert!(claim.end > claim.start);
            next_expected = claim.end;
        }

        assert_eq!(next_expected, 10_000);
    }

    #[test]
    fn guided_claims_shrink_then_fix_at_the_chunk_size() {
        let chunk = nz!(4);
        let schedule = GuidedChunks::new(chunk, nz!(2));
        let cursor = RangeCursor::new(10_000);

        let mut claims = Vec::new();
        while let Some(claim) = schedule.next_claim(&cursor) {
            claims.push(claim);
        }

        let mut previous_coarse_len = usize::MAX;
        for claim in &claims {
            let remaining_before = 10_000 - claim.start;

            if remaining_before > schedule.threshold {
                // Coarse phase: claim sizes never grow as work shrinks.
                assert!(claim.len() <= previous_coarse_len);
                assert!(claim.len() >= chunk.get());
                previous_coarse_len = claim.len();
            } else {
                // Fine phase: exactly one chunk, except a clamped final claim.
                assert!(claim.len() <= chunk.get());
            }
        }
    }
}
