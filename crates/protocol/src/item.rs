use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared_str::SharedStr;
use crate::types::{TimeRange, Timestamp};

/// Stable identifier of an item, unique within a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a lane (a horizontal track).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneId(pub SharedStr);

impl LaneId {
    pub fn new(id: impl Into<SharedStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for LaneId {
    fn from(s: &str) -> Self {
        Self(SharedStr::from(s))
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Collaborator-supplied lane definition. `order` sets the vertical
/// stacking order; lanes with equal order keep their input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneDef {
    pub id: LaneId,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub label: Option<SharedStr>,
}

impl LaneDef {
    pub fn new(id: impl Into<SharedStr>, order: i32) -> Self {
        Self {
            id: LaneId::new(id),
            order,
            label: None,
        }
    }
}

/// One `(t, value)` point of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: Timestamp,
    pub value: f64,
}

/// A sampled series drawn as a line across its span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveItem {
    pub id: ItemId,
    pub lane_id: LaneId,
    pub span: TimeRange,
    /// Ordered by `t`.
    pub samples: Vec<Sample>,
}

impl CurveItem {
    /// Build a curve whose span runs from its first to its last sample.
    /// Samples are sorted by time first.
    pub fn new(id: ItemId, lane_id: LaneId, mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| a.t.total_cmp(&b.t));
        let span = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => TimeRange::new(first.t, last.t),
            _ => TimeRange::instant(0.0),
        };
        Self {
            id,
            lane_id,
            span,
            samples,
        }
    }

    /// The contiguous run of samples needed to draw the curve across
    /// `window`, including one sample on each side so segments crossing
    /// the window edge are kept.
    pub fn visible_samples(&self, window: &TimeRange) -> &[Sample] {
        let lo = self.samples.partition_point(|s| s.t < window.start);
        let hi = self.samples.partition_point(|s| s.t <= window.end);
        let lo = lo.saturating_sub(1);
        let hi = (hi + 1).min(self.samples.len());
        if lo >= hi {
            return &[];
        }
        &self.samples[lo..hi]
    }
}

/// A discrete occurrence at a single instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventItem {
    pub id: ItemId,
    pub lane_id: LaneId,
    pub at: Timestamp,
    #[serde(default)]
    pub label: Option<SharedStr>,
}

/// A labelled block occupying its span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRangeItem {
    pub id: ItemId,
    pub lane_id: LaneId,
    pub span: TimeRange,
    pub label: SharedStr,
}

/// Anything placed on a lane.
///
/// The engine only ever reads [`Item::id`], [`Item::lane_id`] and
/// [`Item::span`]; variant payloads are for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Curve(CurveItem),
    Event(EventItem),
    TimeRange(TimeRangeItem),
}

impl Item {
    pub fn id(&self) -> ItemId {
        match self {
            Item::Curve(c) => c.id,
            Item::Event(e) => e.id,
            Item::TimeRange(r) => r.id,
        }
    }

    pub fn lane_id(&self) -> &LaneId {
        match self {
            Item::Curve(c) => &c.lane_id,
            Item::Event(e) => &e.lane_id,
            Item::TimeRange(r) => &r.lane_id,
        }
    }

    /// Extent on the time axis. Events are instants.
    pub fn span(&self) -> TimeRange {
        match self {
            Item::Curve(c) => c.span,
            Item::Event(e) => TimeRange::instant(e.at),
            Item::TimeRange(r) => r.span,
        }
    }

    pub fn label(&self) -> Option<&SharedStr> {
        match self {
            Item::Curve(_) => None,
            Item::Event(e) => e.label.as_ref(),
            Item::TimeRange(r) => Some(&r.label),
        }
    }
}

/// A complete timeline as handed over by a data-loading collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineDocument {
    /// Clamping envelope for panning and zooming. Derived from the items
    /// when absent.
    #[serde(default)]
    pub bounds: Option<TimeRange>,
    pub lanes: Vec<LaneDef>,
    pub items: Vec<Item>,
}

impl TimelineDocument {
    /// `bounds` if set, otherwise the hull of all finite item spans.
    pub fn effective_bounds(&self) -> Option<TimeRange> {
        if self.bounds.is_some() {
            return self.bounds;
        }
        self.items
            .iter()
            .map(Item::span)
            .filter(TimeRange::is_finite)
            .reduce(|a, b| TimeRange::new(a.start.min(b.start), a.end.max(b.end)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> CurveItem {
        let samples = (0..10)
            .map(|i| Sample {
                t: f64::from(i) * 10.0,
                value: f64::from(i),
            })
            .rev()
            .collect();
        CurveItem::new(ItemId(1), LaneId::from("cpu"), samples)
    }

    #[test]
    fn curve_span_follows_samples() {
        let c = curve();
        assert_eq!(c.span, TimeRange::new(0.0, 90.0));
        assert_eq!(c.samples[0].t, 0.0);
    }

    #[test]
    fn visible_samples_pad_one_each_side() {
        let c = curve();
        let visible = c.visible_samples(&TimeRange::new(25.0, 45.0));
        let ts: Vec<f64> = visible.iter().map(|s| s.t).collect();
        assert_eq!(ts, vec![20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn visible_samples_outside_curve() {
        let c = curve();
        assert_eq!(c.visible_samples(&TimeRange::new(200.0, 300.0)).len(), 1);
        let empty = CurveItem::new(ItemId(2), LaneId::from("cpu"), Vec::new());
        assert!(empty.visible_samples(&TimeRange::new(0.0, 1.0)).is_empty());
    }

    #[test]
    fn event_span_is_instant() {
        let item = Item::Event(EventItem {
            id: ItemId(3),
            lane_id: LaneId::from("log"),
            at: 42.0,
            label: None,
        });
        assert!(item.span().is_instant());
        assert_eq!(item.lane_id().as_str(), "log");
    }

    #[test]
    fn document_from_json() {
        let json = r#"{
            "lanes": [{ "id": "tasks", "order": 1, "label": "Tasks" }],
            "items": [
                { "kind": "time_range", "id": 1, "lane_id": "tasks",
                  "span": { "start": 0.0, "end": 10.0 }, "label": "build" },
                { "kind": "event", "id": 2, "lane_id": "tasks", "at": 12.0 }
            ]
        }"#;
        let doc: TimelineDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.lanes.len(), 1);
        assert_eq!(doc.items[1].id(), ItemId(2));
        assert_eq!(doc.effective_bounds(), Some(TimeRange::new(0.0, 12.0)));
    }
}
