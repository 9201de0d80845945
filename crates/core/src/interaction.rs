use laneview_protocol::{InputEvent, KeyAction, PixelRange, VirtualizationState};

use crate::config::EngineConfig;
use crate::engine::VirtualizationEngine;
use crate::error::Result;
use crate::lane::LaneSet;
use crate::viewport::{InteractionMode, PendingTransform, Viewport};

/// Turns raw input into viewport transitions, at most one per tick.
///
/// Input between ticks is folded into a single pending target: each event
/// starts from the previous target (or the committed state when there is
/// none) and overwrites the slot. [`tick`](Self::tick) drains the slot,
/// commits it and recomputes once.
#[derive(Debug)]
pub struct InteractionController {
    viewport: Viewport,
    config: EngineConfig,
    pending: Option<PendingTransform>,
    /// Pointer x of the last drag step while a drag is active.
    drag_x: Option<f64>,
    /// The pending slot minus this tick's drag motion; restored when the
    /// drag is cancelled.
    drag_base: Option<PendingTransform>,
    drag_ended: bool,
    zoomed_since_tick: bool,
    dirty: bool,
    /// Content height of the last state, bounding vertical scroll.
    content_height: f64,
}

impl InteractionController {
    pub fn new(viewport: Viewport, config: EngineConfig) -> Self {
        let viewport = viewport.with_min_visible_span(config.min_visible_span);
        Self {
            viewport,
            config,
            pending: None,
            drag_x: None,
            drag_base: None,
            drag_ended: false,
            zoomed_since_tick: false,
            // The first tick always produces a state.
            dirty: true,
            content_height: 0.0,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_x.is_some()
    }

    /// Lane data changed; recompute on the next tick.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Whether `state` was computed from the viewport as it is now.
    pub fn is_current(&self, state: &VirtualizationState) -> bool {
        state.revision == self.viewport.revision()
    }

    /// What the viewport would look like if the pending slot were
    /// committed now.
    pub fn preview(&self) -> PendingTransform {
        self.pending.unwrap_or_else(|| self.committed())
    }

    fn committed(&self) -> PendingTransform {
        PendingTransform {
            scale: *self.viewport.scale(),
            width_px: self.viewport.width_px(),
            height_px: self.viewport.height_px(),
            scroll_y: self.viewport.scroll_y(),
            mode: self.viewport.mode(),
        }
    }

    /// Fold one input event into the pending slot.
    ///
    /// An event whose target cannot be computed (a degenerate zoom factor
    /// or surface size) is rejected and leaves the slot as it was.
    pub fn handle(&mut self, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::PointerDown { x } => {
                self.drag_x = Some(x);
                self.drag_ended = false;
                self.drag_base = self.pending;
                if let Some(pending) = &mut self.pending {
                    pending.mode = InteractionMode::Panning;
                }
                self.viewport.begin_pan();
            }
            InputEvent::PointerMove { x } | InputEvent::PointerUp { x } => {
                let Some(last) = self.drag_x else {
                    return Ok(());
                };
                let mut target = self.preview();
                target.scale = self.viewport.clamp(target.scale.pan_by(x - last))?;
                target.mode = InteractionMode::Panning;
                self.pending = Some(target);
                if matches!(event, InputEvent::PointerUp { .. }) {
                    self.drag_x = None;
                    self.drag_base = None;
                    self.drag_ended = true;
                } else {
                    self.drag_x = Some(x);
                }
            }
            InputEvent::PointerCancel | InputEvent::PointerLeave => {
                if self.drag_x.take().is_some() {
                    tracing::debug!("drag cancelled; dropping its uncommitted motion");
                    self.pending = self.drag_base.take().map(|base| PendingTransform {
                        mode: InteractionMode::Idle,
                        ..base
                    });
                    self.drag_ended = false;
                    self.viewport.cancel();
                }
            }
            _ => {
                let target = self.transform(event, self.preview())?;
                if self.drag_x.is_some() {
                    let base = self.drag_base.unwrap_or_else(|| self.committed());
                    self.drag_base = Some(self.transform(event, base)?);
                }
                self.pending = Some(target);
            }
        }
        Ok(())
    }

    /// Apply a zoom, resize or key event to `target`, clamped.
    fn transform(&mut self, event: InputEvent, mut target: PendingTransform) -> Result<PendingTransform> {
        match event {
            InputEvent::Wheel {
                x,
                delta_x,
                delta_y,
            } => {
                if delta_y != 0.0 {
                    let factor = (delta_y * self.config.wheel_zoom_sensitivity).exp2();
                    target.scale = target.scale.zoom_at(factor, x)?;
                    self.zoomed_since_tick = true;
                }
                target.scale = target.scale.pan_by(-delta_x);
                target.mode = self.gesture_mode(delta_y != 0.0, target.mode);
            }
            InputEvent::Pinch { x, scale } => {
                target.scale = target.scale.zoom_at(scale, x)?;
                self.zoomed_since_tick = true;
                target.mode = self.gesture_mode(true, target.mode);
            }
            InputEvent::Resize { width, height } => {
                target.scale = target.scale.with_range(PixelRange::from_width(width))?;
                target.width_px = width;
                target.height_px = height;
                target.mode = InteractionMode::Resizing;
            }
            InputEvent::Key(action) => self.key(action, &mut target)?,
            _ => return Ok(target),
        }
        target.scale = self.viewport.clamp(target.scale)?;
        Ok(target)
    }

    fn key(&mut self, action: KeyAction, target: &mut PendingTransform) -> Result<()> {
        let step = target.width_px * self.config.keyboard_pan_fraction;
        let center = target.scale.range().center();
        match action {
            KeyAction::PanLeft => target.scale = target.scale.pan_by(step),
            KeyAction::PanRight => target.scale = target.scale.pan_by(-step),
            KeyAction::ZoomIn | KeyAction::ZoomOut => {
                let factor = if action == KeyAction::ZoomIn {
                    self.config.keyboard_zoom_factor
                } else {
                    1.0 / self.config.keyboard_zoom_factor
                };
                target.scale = target.scale.zoom_at(factor, center)?;
                self.zoomed_since_tick = true;
                target.mode = self.gesture_mode(true, target.mode);
            }
            KeyAction::Reset => target.scale = self.viewport.fit_bounds(target.scale)?,
            KeyAction::ScrollUp => {
                target.scroll_y = (target.scroll_y - self.config.row_height_px).max(0.0);
            }
            KeyAction::ScrollDown => {
                let max = (self.content_height - target.height_px).max(0.0);
                target.scroll_y = (target.scroll_y + self.config.row_height_px).min(max);
            }
        }
        Ok(())
    }

    fn gesture_mode(&self, zooming: bool, current: InteractionMode) -> InteractionMode {
        if self.drag_x.is_some() {
            InteractionMode::Panning
        } else if zooming {
            InteractionMode::Zooming
        } else {
            current
        }
    }

    /// Commit the pending target, settle finished gestures, and recompute
    /// if anything changed since the last tick.
    ///
    /// A rejected target is dropped and returned as the error; the
    /// viewport keeps its last committed state.
    pub fn tick(
        &mut self,
        engine: &VirtualizationEngine,
        lanes: &LaneSet,
    ) -> Result<Option<VirtualizationState>> {
        let revision = self.viewport.revision();
        // Motion committed now can no longer be cancelled.
        self.drag_base = None;
        let committed = match self.pending.take() {
            Some(pending) => self.viewport.apply(pending),
            None => Ok(()),
        };

        if self.drag_ended {
            self.drag_ended = false;
            self.viewport.end_pan();
        }
        match self.viewport.mode() {
            InteractionMode::Resizing => self.viewport.settle(),
            InteractionMode::Zooming if !self.zoomed_since_tick => self.viewport.settle(),
            _ => {}
        }
        self.zoomed_since_tick = false;

        if let Err(e) = committed {
            tracing::debug!(error = %e, "pending transform rejected");
            return Err(e);
        }
        self.viewport.clamp_scroll(self.content_height);
        if self.viewport.revision() == revision && !self.dirty {
            return Ok(None);
        }
        self.dirty = false;

        let state = engine.recompute_default(&self.viewport, lanes);
        self.content_height = state.content_height;
        Ok(Some(state))
    }
}


#[cfg(test)]
mod tests {
    use laneview_protocol::{LaneDef, TimeRange};

    use super::*;
    use crate::error::EngineError;

    const EPS: f64 = 1e-9;

    fn controller() -> InteractionController {
        let v = Viewport::new(TimeRange::new(0.0, 1000.0), 500.0, 200.0).unwrap();
        InteractionController::new(v, EngineConfig::default())
    }

    fn empty_lanes() -> LaneSet {
        LaneSet::build(&[LaneDef::new("a", 0)], &[])
    }

    fn zoomed(c: &mut InteractionController, engine: &VirtualizationEngine) {
        c.handle(InputEvent::Key(KeyAction::ZoomIn)).unwrap();
        c.handle(InputEvent::Key(KeyAction::ZoomIn)).unwrap();
        c.tick(engine, &empty_lanes()).unwrap().unwrap();
    }

    fn wheel(delta_y: f64) -> InputEvent {
        InputEvent::Wheel {
            x: 250.0,
            delta_x: 0.0,
            delta_y,
        }
    }

    #[test]
    fn first_tick_produces_state_then_idles() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        assert!(c.tick(&engine, &empty_lanes()).unwrap().is_some());
        assert!(c.tick(&engine, &empty_lanes()).unwrap().is_none());
        c.invalidate();
        assert!(c.tick(&engine, &empty_lanes()).unwrap().is_some());
    }

    #[test]
    fn moves_within_a_tick_coalesce() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        zoomed(&mut c, &engine);
        let start = c.viewport().visible_window().start;
        let revision = c.viewport().revision();

        c.handle(InputEvent::PointerDown { x: 100.0 }).unwrap();
        for x in [110.0, 125.0, 140.0, 150.0] {
            c.handle(InputEvent::PointerMove { x }).unwrap();
        }
        assert!(c.has_pending());
        assert_eq!(c.viewport().revision(), revision);

        let state = c.tick(&engine, &empty_lanes()).unwrap().unwrap();
        assert_eq!(c.viewport().revision(), revision + 1);
        assert!(c.is_current(&state));
        // 50 px right at 2 px per unit shows 25 units earlier.
        let moved = c.viewport().visible_window().start;
        assert!((start - moved - 25.0).abs() < EPS);
        assert_eq!(c.viewport().mode(), InteractionMode::Panning);

        c.handle(InputEvent::PointerUp { x: 150.0 }).unwrap();
        c.tick(&engine, &empty_lanes()).unwrap();
        assert_eq!(c.viewport().mode(), InteractionMode::Idle);
    }

    #[test]
    fn cancel_keeps_committed_steps_only() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        zoomed(&mut c, &engine);

        c.handle(InputEvent::PointerDown { x: 200.0 }).unwrap();
        c.handle(InputEvent::PointerMove { x: 220.0 }).unwrap();
        c.tick(&engine, &empty_lanes()).unwrap();
        let committed = c.viewport().visible_window();

        c.handle(InputEvent::PointerMove { x: 300.0 }).unwrap();
        c.handle(InputEvent::PointerCancel).unwrap();
        assert!(!c.has_pending());
        assert_eq!(c.viewport().mode(), InteractionMode::Idle);
        assert!(c.tick(&engine, &empty_lanes()).unwrap().is_none());
        assert_eq!(c.viewport().visible_window(), committed);
    }

    #[test]
    fn cancelled_drag_keeps_resize_from_same_tick() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        c.tick(&engine, &empty_lanes()).unwrap();

        c.handle(InputEvent::PointerDown { x: 100.0 }).unwrap();
        c.handle(InputEvent::Resize {
            width: 1000.0,
            height: 400.0,
        })
        .unwrap();
        c.handle(InputEvent::PointerMove { x: 120.0 }).unwrap();
        c.handle(InputEvent::PointerCancel).unwrap();
        c.tick(&engine, &empty_lanes()).unwrap().unwrap();

        assert_eq!(c.viewport().width_px(), 1000.0);
        assert_eq!(c.viewport().height_px(), 400.0);
        assert_eq!(c.viewport().mode(), InteractionMode::Idle);
        let w = c.viewport().visible_window();
        assert!(w.start.abs() < EPS && (w.end - 1000.0).abs() < EPS);
    }

    #[test]
    fn cancelled_drag_keeps_zooms_before_and_during_it() {
        let engine = VirtualizationEngine::default();

        // Zoom folded in while dragging.
        let mut c = controller();
        c.handle(InputEvent::PointerDown { x: 100.0 }).unwrap();
        c.handle(wheel(100.0)).unwrap();
        c.handle(InputEvent::PointerMove { x: 160.0 }).unwrap();
        c.handle(InputEvent::PointerLeave).unwrap();
        c.tick(&engine, &empty_lanes()).unwrap().unwrap();
        let w = c.viewport().visible_window();
        assert!((w.start - 250.0).abs() < EPS && (w.end - 750.0).abs() < EPS);
        assert_eq!(c.viewport().mode(), InteractionMode::Idle);

        // Zoom folded in before the drag started.
        let mut c = controller();
        c.handle(wheel(100.0)).unwrap();
        c.handle(InputEvent::PointerDown { x: 100.0 }).unwrap();
        c.handle(InputEvent::PointerMove { x: 160.0 }).unwrap();
        c.handle(InputEvent::PointerCancel).unwrap();
        c.tick(&engine, &empty_lanes()).unwrap().unwrap();
        let w = c.viewport().visible_window();
        assert!((w.start - 250.0).abs() < EPS && (w.end - 750.0).abs() < EPS);
    }

    #[test]
    fn drag_after_wheel_in_same_tick_is_panning() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        c.handle(wheel(100.0)).unwrap();
        c.handle(InputEvent::PointerDown { x: 100.0 }).unwrap();
        c.tick(&engine, &empty_lanes()).unwrap().unwrap();
        assert_eq!(c.viewport().mode(), InteractionMode::Panning);

        c.handle(InputEvent::PointerUp { x: 100.0 }).unwrap();
        c.tick(&engine, &empty_lanes()).unwrap();
        assert_eq!(c.viewport().mode(), InteractionMode::Idle);
    }

    #[test]
    fn stale_state_is_detected() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        let old = c.tick(&engine, &empty_lanes()).unwrap().unwrap();
        c.handle(wheel(100.0)).unwrap();
        assert!(c.is_current(&old));
        assert!(c.tick(&engine, &empty_lanes()).unwrap().is_some());
        assert!(!c.is_current(&old));
    }

    #[test]
    fn wheel_zoom_settles_after_quiet_tick() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        c.handle(wheel(100.0)).unwrap();
        c.tick(&engine, &empty_lanes()).unwrap();
        assert_eq!(c.viewport().mode(), InteractionMode::Zooming);
        // 2^(100 * 0.01) = 2x around the centre.
        let w = c.viewport().visible_window();
        assert!((w.start - 250.0).abs() < EPS && (w.end - 750.0).abs() < EPS);

        c.tick(&engine, &empty_lanes()).unwrap();
        assert_eq!(c.viewport().mode(), InteractionMode::Idle);
    }

    #[test]
    fn coalesced_zoom_out_matches_bounds() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        zoomed(&mut c, &engine);
        for _ in 0..5 {
            c.handle(InputEvent::Pinch { x: 10.0, scale: 0.5 }).unwrap();
        }
        c.tick(&engine, &empty_lanes()).unwrap();
        let w = c.viewport().visible_window();
        assert!(w.start.abs() < EPS && (w.end - 1000.0).abs() < EPS);
    }

    #[test]
    fn resize_then_settles() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        c.handle(InputEvent::Resize {
            width: 1000.0,
            height: 400.0,
        })
        .unwrap();
        assert!(c.tick(&engine, &empty_lanes()).unwrap().is_some());
        assert_eq!(c.viewport().mode(), InteractionMode::Idle);
        assert_eq!(c.viewport().width_px(), 1000.0);
        let w = c.viewport().visible_window();
        assert!(w.start.abs() < EPS && (w.end - 1000.0).abs() < EPS);
    }

    #[test]
    fn bad_events_are_rejected_without_side_effects() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        c.tick(&engine, &empty_lanes()).unwrap();
        let before = c.viewport().clone();

        let err = c.handle(InputEvent::Resize {
            width: 0.0,
            height: 10.0,
        });
        assert!(matches!(err, Err(EngineError::DegenerateScale { .. })));
        assert!(c.handle(InputEvent::Pinch { x: 0.0, scale: -1.0 }).is_err());
        assert!(!c.has_pending());

        // A negative height only fails at commit time.
        c.handle(InputEvent::Resize {
            width: 100.0,
            height: -5.0,
        })
        .unwrap();
        assert!(c.tick(&engine, &empty_lanes()).is_err());
        assert_eq!(c.viewport(), &before);
    }

    #[test]
    fn keys_pan_and_reset() {
        let engine = VirtualizationEngine::default();
        let mut c = controller();
        zoomed(&mut c, &engine);
        let before = c.viewport().visible_window();
        c.handle(InputEvent::Key(KeyAction::PanRight)).unwrap();
        c.tick(&engine, &empty_lanes()).unwrap();
        let after = c.viewport().visible_window();
        // 10% of 500 px at 2 px per unit.
        assert!((after.start - before.start - 25.0).abs() < EPS);

        c.handle(InputEvent::Key(KeyAction::Reset)).unwrap();
        c.tick(&engine, &empty_lanes()).unwrap();
        assert_eq!(c.viewport().current().domain, TimeRange::new(0.0, 1000.0));
    }
}
