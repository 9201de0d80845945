use std::collections::HashMap;
use std::sync::Arc;

use laneview_protocol::{Diagnostic, Item, ItemId, LaneDef, LaneId, TimeRange};

use crate::error::EngineError;
use crate::index::IntervalIndex;

/// A lane definition together with the index over its items.
///
/// The index sits behind an `Arc`: publishing new data means building a
/// new `Lane`, never editing one that queries may still be reading.
#[derive(Debug, Clone)]
pub struct Lane {
    def: LaneDef,
    index: Arc<IntervalIndex>,
}

impl Lane {
    pub fn new(def: LaneDef, spans: impl IntoIterator<Item = (ItemId, TimeRange)>) -> Self {
        Self {
            def,
            index: Arc::new(IntervalIndex::build(spans)),
        }
    }

    pub fn id(&self) -> &LaneId {
        &self.def.id
    }

    pub fn order(&self) -> i32 {
        self.def.order
    }

    pub fn def(&self) -> &LaneDef {
        &self.def
    }

    pub fn index(&self) -> &IntervalIndex {
        &self.index
    }

    /// Item ids in start order.
    pub fn items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.index.entries().iter().map(|e| e.id)
    }
}

/// An immutable snapshot of every lane, sorted by `order`.
#[derive(Debug, Clone, Default)]
pub struct LaneSet {
    lanes: Vec<Lane>,
    diagnostics: Vec<Diagnostic>,
}

impl LaneSet {
    /// Group `items` into the lanes named by `defs`.
    ///
    /// Items pointing at a lane that is not defined, or with a non-finite
    /// span, are left out and reported as diagnostics. A lane id defined
    /// twice keeps its first definition. Only ids, lane ids and spans are
    /// read.
    pub fn build<'a>(defs: &[LaneDef], items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut spans: HashMap<&LaneId, Vec<(ItemId, TimeRange)>> = HashMap::new();
        let mut unique = Vec::with_capacity(defs.len());
        let mut diagnostics = Vec::new();
        for def in defs {
            if spans.insert(&def.id, Vec::new()).is_some() {
                tracing::warn!(lane = %def.id, "duplicate lane definition; keeping the first");
                diagnostics.push(Diagnostic::DuplicateLane {
                    lane: def.id.clone(),
                });
                continue;
            }
            unique.push(def);
        }

        for item in items {
            let span = item.span();
            if !span.is_finite() {
                tracing::warn!(item = %item.id(), "dropping item with non-finite span");
                diagnostics.push(Diagnostic::NonFiniteSpan { item: item.id() });
                continue;
            }
            match spans.get_mut(item.lane_id()) {
                Some(lane) => lane.push((item.id(), span)),
                None => {
                    let err = EngineError::UnknownItemReference {
                        item: item.id(),
                        lane: item.lane_id().clone(),
                    };
                    tracing::warn!("{err}; dropping item");
                    diagnostics.push(Diagnostic::UnknownItemReference {
                        item: item.id(),
                        lane: item.lane_id().clone(),
                    });
                }
            }
        }

        let mut lanes: Vec<Lane> = unique
            .into_iter()
            .map(|def| {
                let lane_spans = spans.remove(&def.id).unwrap_or_default();
                Lane::new(def.clone(), lane_spans)
            })
            .collect();
        lanes.sort_by_key(Lane::order);

        tracing::debug!(
            lanes = lanes.len(),
            dropped = diagnostics.len(),
            "built lane set"
        );
        Self { lanes, diagnostics }
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, id: &LaneId) -> Option<&Lane> {
        self.lanes.iter().find(|l| l.id() == id)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Hull of every lane's extent.
    pub fn extent(&self) -> Option<TimeRange> {
        self.lanes
            .iter()
            .filter_map(|l| l.index().extent())
            .reduce(|a, b| TimeRange::new(a.start.min(b.start), a.end.max(b.end)))
    }
}

#[cfg(test)]
mod tests {
    use laneview_protocol::{EventItem, SharedStr, TimeRangeItem};

    use super::*;

    fn block(id: u64, lane: &str, start: f64, end: f64) -> Item {
        Item::TimeRange(TimeRangeItem {
            id: ItemId(id),
            lane_id: LaneId::from(lane),
            span: TimeRange::new(start, end),
            label: SharedStr::from("block"),
        })
    }

    #[test]
    fn groups_items_and_sorts_lanes() {
        let defs = vec![LaneDef::new("b", 2), LaneDef::new("a", 1), LaneDef::new("c", 1)];
        let items = vec![
            block(1, "b", 0.0, 5.0),
            block(2, "a", 3.0, 4.0),
            block(3, "a", 1.0, 2.0),
        ];
        let set = LaneSet::build(&defs, &items);
        let order: Vec<&str> = set.lanes().iter().map(|l| l.id().as_str()).collect();
        assert_eq!(order, vec!["a", "c", "b"]);
        let a = set.lane(&LaneId::from("a"));
        let ids: Vec<ItemId> = a.unwrap().items().collect();
        assert_eq!(ids, vec![ItemId(3), ItemId(2)]);
        assert!(set.diagnostics().is_empty());
        assert_eq!(set.extent(), Some(TimeRange::new(0.0, 5.0)));
    }

    #[test]
    fn unknown_lane_and_nan_spans_are_reported() {
        let defs = vec![LaneDef::new("a", 0)];
        let items = vec![
            block(1, "a", 0.0, 5.0),
            block(2, "ghost", 0.0, 5.0),
            Item::Event(EventItem {
                id: ItemId(3),
                lane_id: LaneId::from("a"),
                at: f64::NAN,
                label: None,
            }),
        ];
        let set = LaneSet::build(&defs, &items);
        assert_eq!(set.lanes()[0].index().len(), 1);
        assert_eq!(
            set.diagnostics(),
            &[
                Diagnostic::UnknownItemReference {
                    item: ItemId(2),
                    lane: LaneId::from("ghost"),
                },
                Diagnostic::NonFiniteSpan { item: ItemId(3) },
            ]
        );
    }

    #[test]
    fn duplicate_lane_keeps_first_definition() {
        let defs = vec![
            LaneDef::new("a", 5),
            LaneDef::new("b", 1),
            LaneDef::new("a", 0),
        ];
        let items = vec![block(1, "a", 0.0, 5.0), block(2, "a", 6.0, 7.0)];
        let set = LaneSet::build(&defs, &items);
        assert_eq!(set.len(), 2);
        let order: Vec<&str> = set.lanes().iter().map(|l| l.id().as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
        let a = set.lane(&LaneId::from("a")).unwrap();
        assert_eq!(a.order(), 5);
        assert_eq!(a.index().len(), 2);
        assert_eq!(
            set.diagnostics(),
            &[Diagnostic::DuplicateLane {
                lane: LaneId::from("a"),
            }]
        );
    }
}
