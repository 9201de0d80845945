use laneview_protocol::{ItemId, TimeRange, Timestamp};

use crate::scale::TimeScale;

/// One indexed item: its id and extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    pub id: ItemId,
    pub span: TimeRange,
}

/// Per-lane index over item spans.
///
/// Entries are sorted by `span.start` (stable, so equal starts keep
/// insertion order). `max_end[i]` is the largest end among entries
/// `0..=i`; since it never decreases, the first entry that can still reach
/// a window is found by binary search, which keeps arbitrarily long spans
/// correct without a second end-keyed structure.
///
/// Built once per item set and shared behind an `Arc`; viewport changes
/// only query it.
#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    entries: Vec<IndexEntry>,
    max_end: Vec<Timestamp>,
}

impl IntervalIndex {
    pub fn build(items: impl IntoIterator<Item = (ItemId, TimeRange)>) -> Self {
        let mut entries: Vec<IndexEntry> = items
            .into_iter()
            .map(|(id, span)| IndexEntry { id, span })
            .collect();
        entries.sort_by(|a, b| a.span.start.total_cmp(&b.span.start));

        let mut running = f64::NEG_INFINITY;
        let max_end = entries
            .iter()
            .map(|e| {
                running = running.max(e.span.end);
                running
            })
            .collect();

        Self { entries, max_end }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in start order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Hull of all spans, `None` when empty.
    pub fn extent(&self) -> Option<TimeRange> {
        let first = self.entries.first()?;
        let end = *self.max_end.last()?;
        Some(TimeRange::new(first.span.start, end))
    }

    /// Entries whose span intersects `window`, in start order.
    pub fn overlapping(&self, window: TimeRange) -> impl Iterator<Item = &IndexEntry> + '_ {
        let lo = self.max_end.partition_point(|&end| end < window.start);
        let hi = self
            .entries
            .partition_point(|e| e.span.start <= window.end);
        let slice = if lo < hi { &self.entries[lo..hi] } else { &[][..] };
        slice.iter().filter(move |e| e.span.end >= window.start)
    }

    pub fn query_overlapping(&self, window: TimeRange) -> Vec<ItemId> {
        self.overlapping(window).map(|e| e.id).collect()
    }

    /// Item closest to `t` in screen pixels under `scale`, within
    /// `max_distance_px`. Ties go to the earliest start.
    pub fn nearest(&self, t: Timestamp, max_distance_px: f64, scale: &TimeScale) -> Option<ItemId> {
        self.nearest_matching(t, max_distance_px, scale, |_| true)
    }

    /// [`nearest`](Self::nearest) restricted to entries accepted by
    /// `accept`.
    pub fn nearest_matching(
        &self,
        t: Timestamp,
        max_distance_px: f64,
        scale: &TimeScale,
        mut accept: impl FnMut(&IndexEntry) -> bool,
    ) -> Option<ItemId> {
        if !t.is_finite() || !max_distance_px.is_finite() || max_distance_px < 0.0 {
            return None;
        }
        let x = scale.to_pixel(t);
        let window = TimeRange::new(
            scale.to_time(x - max_distance_px),
            scale.to_time(x + max_distance_px),
        );

        let mut best: Option<(f64, ItemId)> = None;
        for entry in self.overlapping(window) {
            if !accept(entry) {
                continue;
            }
            let dist = pixel_distance(entry.span, t, x, scale);
            if dist > max_distance_px {
                continue;
            }
            // Strict `<` keeps the earlier start on ties.
            if best.is_none_or(|(d, _)| dist < d) {
                best = Some((dist, entry.id));
            }
        }
        best.map(|(_, id)| id)
    }
}

fn pixel_distance(span: TimeRange, t: Timestamp, x: f64, scale: &TimeScale) -> f64 {
    if span.contains(t) {
        0.0
    } else if t < span.start {
        scale.to_pixel(span.start) - x
    } else {
        x - scale.to_pixel(span.end)
    }
}
