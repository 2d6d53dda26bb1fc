//! Per-owner busy timeline: merge overlapping meetings, answer "is this window free".

use chrono::NaiveDateTime;

use super::entities::BusyInterval;
use super::errors::DomainError;

/// Merged busy intervals of one owner: sorted by start, pairwise disjoint.
///
/// Touching intervals (`a.end == b.start`) are merged into one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    intervals: Vec<BusyInterval>,
}

impl IntervalSet {
    /// Build a merged set. Fails on `end <= start` or when owners are mixed.
    pub fn from_intervals(
        intervals: impl IntoIterator<Item = BusyInterval>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            intervals: merge(intervals.into_iter().collect())?,
        })
    }

    pub fn is_free(&self, window_start: NaiveDateTime, window_end: NaiveDateTime) -> bool {
        is_free(&self.intervals, window_start, window_end)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

/// Sort by start and fold overlapping or touching intervals together.
///
/// Input order is irrelevant. All intervals must belong to the same owner.
pub fn merge(mut intervals: Vec<BusyInterval>) -> Result<Vec<BusyInterval>, DomainError> {
    if let Some(bad) = intervals.iter().find(|i| i.end <= i.start) {
        return Err(DomainError::InvalidInterval {
            owner: bad.owner.clone(),
            start: bad.start,
            end: bad.end,
        });
    }
    if let Some(first) = intervals.first() {
        if let Some(other) = intervals.iter().find(|i| i.owner != first.owner) {
            return Err(DomainError::MixedOwners {
                first: first.owner.clone(),
                other: other.owner.clone(),
            });
        }
    }

    intervals.sort_by_key(|i| (i.start, i.end));

    let mut merged: Vec<BusyInterval> = Vec::with_capacity(intervals.len());
    for next in intervals {
        match merged.last_mut() {
            Some(last) if next.start <= last.end => {
                last.end = last.end.max(next.end);
            }
            _ => merged.push(next),
        }
    }
    Ok(merged)
}

/// True iff no interval of `merged` intersects `[window_start, window_end)`.
///
/// `merged` must be the output of [`merge`]; lookup is a binary search.
pub fn is_free(
    merged: &[BusyInterval],
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> bool {
    // First interval that ends after the window opens is the only candidate.
    let idx = merged.partition_point(|i| i.end <= window_start);
    merged
        .get(idx)
        .is_none_or(|i| !i.intersects(window_start, window_end))
}
