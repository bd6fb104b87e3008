//! The shared atomic claim cursor over a linear range.

use std::num::NonZero;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared offset marking the next unclaimed position of a range being folded.
///
/// The cursor is monotonically non-decreasing and may overshoot the end of
/// the range by at most one claim per worker; claimed sub-ranges are always
/// clamped to the range. All accesses use relaxed ordering: callers rely
/// only on the atomicity of each claim, never on the cursor ordering
/// unrelated memory, because every claimed sub-range is read by exactly the
/// one worker that claimed it.
#[derive(Debug)]
pub(crate) struct RangeCursor {
    next: AtomicUsize,
    len: usize,
}

impl RangeCursor {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            len,
        }
    }

    /// Length of the underlying range.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// The next unclaimed offset at the time of the load.
    ///
    /// Only a snapshot: another worker may claim past it at any moment, so
    /// the value may only be acted on through [`try_claim`][Self::try_claim].
    pub(crate) fn position(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }

    /// Claims the next `count` positions via fetch-and-add.
    ///
    /// Returns the claimed sub-range clamped to the end, or `None` if the
    /// range was already exhausted. Only safe for claim sizes that do not
    /// depend on a previously loaded cursor value; see
    /// [`try_claim`][Self::try_claim] for why.
    pub(crate) fn claim(&self, count: NonZero<usize>) -> Option<Range<usize>> {
        let start = self.next.fetch_add(count.get(), Ordering::Relaxed);

        if start >= self.len {
            return None;
        }

        Some(start..self.len.min(start.saturating_add(count.get())))
    }

    /// Claims exactly `start..end` via compare-and-swap, failing if another
    /// worker moved the cursor first.
    ///
    /// This is the claim primitive for variable-size chunks. A variable size
    /// is computed from a plain load of the cursor, so two workers can
    /// compute overlapping claims from the same observation; fetch-and-add
    /// would let both succeed and fold elements twice. Compare-and-swap lets
    /// exactly one through and sends the loser back to re-observe.
    pub(crate) fn try_claim(&self, start: usize, end: usize) -> bool {
        self.next
            .compare_exchange(start, end, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }
}
