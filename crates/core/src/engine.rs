use laneview_protocol::{ItemId, LaneId, LaneState, TimeRange, VirtualizationState};

use crate::config::EngineConfig;
use crate::lane::LaneSet;
use crate::layout::LaneLayout;
use crate::viewport::Viewport;

/// Result of a pointer hit test.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub lane_id: LaneId,
    pub item: ItemId,
    pub row: u32,
}

/// Turns a viewport and a lane set into the list of things to draw.
///
/// Holds configuration only, so recomputing with the same inputs always
/// gives the same state.
#[derive(Debug, Clone, Default)]
pub struct VirtualizationEngine {
    config: EngineConfig,
}

impl VirtualizationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn recompute_default(&self, viewport: &Viewport, lanes: &LaneSet) -> VirtualizationState {
        self.recompute(viewport, lanes, self.config.overscan_px)
    }

    /// Lay out every lane for the window `viewport` shows, widened by
    /// `overscan_px` on each side, and keep the lanes that are vertically
    /// on screen.
    pub fn recompute(
        &self,
        viewport: &Viewport,
        lanes: &LaneSet,
        overscan_px: f64,
    ) -> VirtualizationState {
        let overscan = if overscan_px.is_finite() {
            overscan_px.max(0.0)
        } else {
            0.0
        };
        let scale = viewport.scale();
        let range = scale.range();
        let visible_window = scale.visible_window();
        let query_window = TimeRange::new(
            scale.to_time(range.start - overscan),
            scale.to_time(range.end + overscan),
        );

        let top = viewport.scroll_y() - self.config.vertical_overscan_px;
        let bottom = viewport.scroll_y() + viewport.height_px() + self.config.vertical_overscan_px;

        let mut y = 0.0;
        let mut states = Vec::new();
        for lane in lanes.lanes() {
            let layout = LaneLayout::assign(
                lane.index()
                    .overlapping(query_window)
                    .map(|e| (e.id, e.span)),
            );
            let height = self.config.lane_height(layout.row_count());
            let y_offset = y;
            y += height;

            if y_offset + height < top || y_offset > bottom {
                continue;
            }
            states.push(LaneState {
                lane_id: lane.id().clone(),
                y_offset,
                height,
                row_count: layout.row_count(),
                items: layout.into_placements(),
            });
        }

        tracing::trace!(
            revision = viewport.revision(),
            lanes = states.len(),
            items = states.iter().map(|l| l.items.len()).sum::<usize>(),
            "recomputed"
        );

        VirtualizationState {
            revision: viewport.revision(),
            visible_window,
            query_window,
            lanes: states,
            content_height: y,
            diagnostics: lanes.diagnostics().to_vec(),
        }
    }

    /// The item under surface pixel `(x, y)`, where `y` is relative to the
    /// top of the surface (vertical scroll is applied here).
    ///
    /// Picks the lane and sub-row from `state`, then the nearest item on
    /// that row within the configured tolerance.
    pub fn hit_test(
        &self,
        viewport: &Viewport,
        lanes: &LaneSet,
        state: &VirtualizationState,
        x: f64,
        y: f64,
    ) -> Option<Hit> {
        let content_y = y + viewport.scroll_y();
        let lane_state = state
            .lanes
            .iter()
            .find(|l| l.y_offset <= content_y && content_y < l.y_offset + l.height)?;
        let row_y = content_y - lane_state.y_offset - self.config.lane_header_px;
        if row_y < 0.0 {
            return None;
        }
        let row = (row_y / self.config.row_height_px).floor() as u32;
        if row >= lane_state.row_count {
            return None;
        }

        let lane = lanes.lane(&lane_state.lane_id)?;
        let scale = viewport.scale();
        let t = scale.to_time(x);
        let item = lane.index().nearest_matching(
            t,
            self.config.hit_tolerance_px,
            scale,
            |entry| lane_state.row_of(entry.id) == Some(row),
        )?;
        Some(Hit {
            lane_id: lane_state.lane_id.clone(),
            item,
            row,
        })
    }
}
