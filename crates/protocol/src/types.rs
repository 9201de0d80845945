use serde::{Deserialize, Serialize};

/// A point on the time axis. The unit is chosen by the data collaborator
/// (µs and ms since epoch are both common); the engine only needs a total
/// order, which it gets from [`f64::total_cmp`].
pub type Timestamp = f64;

/// A closed span of time, `start <= end`.
///
/// Used both for item extents and for windows (data bounds, visible
/// window, overscanned query window). Values are replaced, never edited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    /// Build a range from two endpoints in either order.
    pub fn new(a: Timestamp, b: Timestamp) -> Self {
        if b < a {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }

    /// A zero-width range at `t`.
    pub fn instant(t: Timestamp) -> Self {
        Self { start: t, end: t }
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }

    pub fn center(&self) -> Timestamp {
        self.start + self.span() / 2.0
    }

    pub fn contains(&self, t: Timestamp) -> bool {
        self.start <= t && t <= self.end
    }

    /// Closed-interval intersection: ranges that merely touch intersect.
    pub fn intersects(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Open-interval overlap: touching ranges and instants at an edge do
    /// not overlap. This is the relation sub-row stacking cares about.
    pub fn overlaps_interior(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Horizontal pixel extent a time scale maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRange {
    pub start: f64,
    pub end: f64,
}

impl PixelRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// `[0, width]`, the usual range for a surface `width` pixels wide.
    pub fn from_width(width: f64) -> Self {
        Self {
            start: 0.0,
            end: width,
        }
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn center(&self) -> f64 {
        self.start + self.width() / 2.0
    }
}
