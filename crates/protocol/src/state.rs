use serde::{Deserialize, Serialize};

use crate::item::{ItemId, LaneId};
use crate::types::TimeRange;

/// Read-only view of the current transform, for axes and rulers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSnapshot {
    /// The time window currently visible.
    pub domain: TimeRange,
    pub zoom: f64,
}

/// An item placed on a sub-row of its lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub item: ItemId,
    pub row: u32,
}

/// What to draw for one lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneState {
    pub lane_id: LaneId,
    /// Top edge in content coordinates (before vertical scroll).
    pub y_offset: f64,
    pub height: f64,
    /// Sub-rows in use by the items below. Zero for an empty window.
    pub row_count: u32,
    /// Visible items in start order.
    pub items: Vec<Placement>,
}

impl LaneState {
    pub fn row_of(&self, item: ItemId) -> Option<u32> {
        self.items.iter().find(|p| p.item == item).map(|p| p.row)
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().map(|p| p.item)
    }
}

/// Non-fatal problems found in the data handed to the engine. The
/// offending item is left out; everything else is laid out normally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Diagnostic {
    UnknownItemReference { item: ItemId, lane: LaneId },
    NonFiniteSpan { item: ItemId },
    DuplicateLane { lane: LaneId },
}

/// Everything the rendering layer needs for one frame.
///
/// Fully derived from a viewport and a lane set; never edited by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualizationState {
    /// Revision of the viewport this state was computed from.
    pub revision: u64,
    pub visible_window: TimeRange,
    /// `visible_window` widened by the overscan margin.
    pub query_window: TimeRange,
    /// Vertically visible lanes, in lane order.
    pub lanes: Vec<LaneState>,
    /// Stacked height of all lanes, visible or not.
    pub content_height: f64,
    pub diagnostics: Vec<Diagnostic>,
}

impl VirtualizationState {
    pub fn lane(&self, id: &LaneId) -> Option<&LaneState> {
        self.lanes.iter().find(|l| &l.lane_id == id)
    }

    pub fn visible_item_count(&self) -> usize {
        self.lanes.iter().map(|l| l.items.len()).sum()
    }
}
