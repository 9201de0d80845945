use laneview_protocol::{PixelRange, TimeRange, ViewportSnapshot};

use crate::error::{EngineError, Result};
use crate::scale::TimeScale;

/// What the user is doing to the viewport right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InteractionMode {
    #[default]
    Idle,
    Panning,
    Zooming,
    Resizing,
}

/// A fully computed viewport target, committed in one step by
/// [`Viewport::apply`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingTransform {
    pub scale: TimeScale,
    pub width_px: f64,
    pub height_px: f64,
    pub scroll_y: f64,
    pub mode: InteractionMode,
}

/// The visible part of the timeline: a time scale over the surface width,
/// the surface height and vertical scroll, and the envelope the visible
/// window is clamped to.
///
/// Every transition builds a candidate scale, clamps it, and only then
/// replaces the current state, so a rejected transition changes nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    scale: TimeScale,
    width_px: f64,
    height_px: f64,
    scroll_y: f64,
    bounds: TimeRange,
    bounded: bool,
    min_visible_span: f64,
    mode: InteractionMode,
    revision: u64,
}

impl Viewport {
    /// A viewport showing all of `bounds` and clamped to it.
    pub fn new(bounds: TimeRange, width_px: f64, height_px: f64) -> Result<Self> {
        check_bounds(&bounds)?;
        Self::build(bounds, width_px, height_px, true)
    }

    /// A viewport over `domain` that may pan and zoom freely.
    pub fn unbounded(domain: TimeRange, width_px: f64, height_px: f64) -> Result<Self> {
        Self::build(domain, width_px, height_px, false)
    }

    fn build(domain: TimeRange, width_px: f64, height_px: f64, bounded: bool) -> Result<Self> {
        check_height(height_px)?;
        let scale = TimeScale::new(domain, PixelRange::from_width(width_px))?;
        Ok(Self {
            scale,
            width_px,
            height_px,
            scroll_y: 0.0,
            bounds: domain,
            bounded,
            min_visible_span: 0.0,
            mode: InteractionMode::Idle,
            revision: 0,
        })
    }

    /// Narrowest window zooming in may reach.
    pub fn with_min_visible_span(mut self, span: f64) -> Self {
        if span.is_finite() && span >= 0.0 {
            self.min_visible_span = span;
        }
        self
    }

    pub fn scale(&self) -> &TimeScale {
        &self.scale
    }

    pub fn width_px(&self) -> f64 {
        self.width_px
    }

    pub fn height_px(&self) -> f64 {
        self.height_px
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn bounds(&self) -> TimeRange {
        self.bounds
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Bumped by every committed change to scale, size or scroll.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn visible_window(&self) -> TimeRange {
        self.scale.visible_window()
    }

    pub fn current(&self) -> ViewportSnapshot {
        ViewportSnapshot {
            domain: self.visible_window(),
            zoom: self.scale.zoom(),
        }
    }

    pub fn begin_pan(&mut self) {
        if self.mode != InteractionMode::Resizing {
            self.mode = InteractionMode::Panning;
        }
    }

    pub fn end_pan(&mut self) {
        if self.mode == InteractionMode::Panning {
            self.mode = InteractionMode::Idle;
        }
    }

    pub fn pan_by(&mut self, delta_px: f64) -> Result<()> {
        let target = self.scale.pan_by(delta_px);
        self.commit_scale(target, self.mode)
    }

    pub fn zoom_at(&mut self, factor: f64, anchor_px: f64) -> Result<()> {
        let target = self.scale.zoom_at(factor, anchor_px)?;
        let mode = match self.mode {
            InteractionMode::Idle => InteractionMode::Zooming,
            other => other,
        };
        self.commit_scale(target, mode)
    }

    /// Zoom gesture finished.
    pub fn settle(&mut self) {
        if matches!(
            self.mode,
            InteractionMode::Zooming | InteractionMode::Resizing
        ) {
            self.mode = InteractionMode::Idle;
        }
    }

    /// Drop back to idle, keeping whatever was already committed.
    pub fn cancel(&mut self) {
        self.mode = InteractionMode::Idle;
    }

    /// New surface size. The visible window is kept (then clamped).
    pub fn resize(&mut self, width_px: f64, height_px: f64) -> Result<()> {
        let scale = self.scale.with_range(PixelRange::from_width(width_px))?;
        self.apply(PendingTransform {
            scale,
            width_px,
            height_px,
            scroll_y: self.scroll_y,
            mode: InteractionMode::Resizing,
        })?;
        self.mode = InteractionMode::Idle;
        Ok(())
    }

    /// `scale` refitted to show the whole envelope.
    pub fn fit_bounds(&self, scale: TimeScale) -> Result<TimeScale> {
        scale.with_visible(self.bounds)
    }

    /// Show the whole envelope.
    pub fn reset(&mut self) -> Result<()> {
        let target = self.fit_bounds(self.scale)?;
        self.commit_scale(target, self.mode)
    }

    pub fn scroll_by(&mut self, delta_px: f64) {
        if !delta_px.is_finite() {
            return;
        }
        let scroll_y = (self.scroll_y + delta_px).max(0.0);
        if scroll_y != self.scroll_y {
            self.scroll_y = scroll_y;
            self.revision += 1;
        }
    }

    /// Keep the vertical scroll within `content_height`.
    pub fn clamp_scroll(&mut self, content_height: f64) {
        let max = (content_height - self.height_px).max(0.0);
        if self.scroll_y > max {
            self.scroll_y = max;
            self.revision += 1;
        }
    }

    /// Commit a prepared target: size, scroll, scale and mode together.
    pub fn apply(&mut self, pending: PendingTransform) -> Result<()> {
        check_height(pending.height_px)?;
        if !(pending.width_px.is_finite() && pending.width_px > 0.0) {
            return Err(EngineError::degenerate("pixel range has zero width"));
        }
        let scale = self.clamp(pending.scale)?;

        self.scale = scale;
        self.width_px = pending.width_px;
        self.height_px = pending.height_px;
        self.scroll_y = if pending.scroll_y.is_finite() {
            pending.scroll_y.max(0.0)
        } else {
            self.scroll_y
        };
        self.mode = pending.mode;
        self.revision += 1;
        tracing::debug!(
            revision = self.revision,
            mode = ?self.mode,
            start = scale.visible_window().start,
            end = scale.visible_window().end,
            "viewport committed"
        );
        Ok(())
    }

    fn commit_scale(&mut self, target: TimeScale, mode: InteractionMode) -> Result<()> {
        self.apply(PendingTransform {
            scale: target,
            width_px: self.width_px,
            height_px: self.height_px,
            scroll_y: self.scroll_y,
            mode,
        })
    }

    /// Fit `scale` into the envelope.
    ///
    /// A window wider than `bounds` becomes exactly `bounds`. Otherwise the
    /// zoom is kept and the pan clipped so the window lies inside. Windows
    /// narrower than the minimum span are widened around their centre.
    pub fn clamp(&self, scale: TimeScale) -> Result<TimeScale> {
        let mut scale = scale;
        let window = scale.visible_window();
        if window.span() < self.min_visible_span {
            let half = self.min_visible_span / 2.0;
            let c = window.center();
            scale = scale.with_visible(TimeRange::new(c - half, c + half))?;
        }
        if !self.bounded {
            return Ok(scale);
        }

        let bounds = self.bounds;
        check_bounds(&bounds)?;
        let window = scale.visible_window();
        if window.span() >= bounds.span() {
            return scale.with_visible(bounds);
        }
        if window.start < bounds.start {
            let range = scale.range();
            scale = scale.pan_by(range.start - scale.to_pixel(bounds.start));
        } else if window.end > bounds.end {
            let range = scale.range();
            scale = scale.pan_by(range.end - scale.to_pixel(bounds.end));
        }
        Ok(scale)
    }
}

fn check_bounds(bounds: &TimeRange) -> Result<()> {
    if !bounds.is_finite() || bounds.span() <= 0.0 {
        return Err(EngineError::InvalidBounds {
            start: bounds.start,
            end: bounds.end,
        });
    }
    Ok(())
}

fn check_height(height_px: f64) -> Result<()> {
    if !height_px.is_finite() || height_px < 0.0 {
        return Err(EngineError::degenerate("viewport height must be finite and >= 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn viewport() -> Viewport {
        Viewport::new(TimeRange::new(0.0, 100.0), 500.0, 300.0).unwrap()
    }

    fn assert_inside(v: &Viewport) {
        let w = v.visible_window();
        let b = v.bounds();
        assert!(w.span() <= b.span() + EPS, "{w:?} wider than {b:?}");
        assert!(w.start >= b.start - EPS && w.end <= b.end + EPS, "{w:?} outside {b:?}");
    }

    #[test]
    fn zoom_out_past_bounds_shows_exactly_bounds() {
        let mut v = viewport();
        v.zoom_at(2.0, 100.0).unwrap();
        v.zoom_at(0.1, 400.0).unwrap();
        let w = v.visible_window();
        assert!((w.start).abs() < EPS);
        assert!((w.end - 100.0).abs() < EPS);
        assert!((v.current().zoom - 1.0).abs() < EPS);
    }

    #[test]
    fn pan_clips_but_keeps_zoom() {
        let mut v = viewport();
        v.zoom_at(4.0, 250.0).unwrap();
        let zoom = v.current().zoom;
        v.pan_by(10_000.0).unwrap();
        let w = v.visible_window();
        assert!((w.start).abs() < EPS);
        assert!((w.span() - 25.0).abs() < EPS);
        assert!((v.current().zoom - zoom).abs() < EPS);

        v.pan_by(-10_000.0).unwrap();
        let w = v.visible_window();
        assert!((w.end - 100.0).abs() < EPS);
        assert_inside(&v);
    }

    #[test]
    fn mode_transitions() {
        let mut v = viewport();
        assert_eq!(v.mode(), InteractionMode::Idle);
        v.begin_pan();
        assert_eq!(v.mode(), InteractionMode::Panning);
        v.end_pan();
        assert_eq!(v.mode(), InteractionMode::Idle);

        v.zoom_at(2.0, 0.0).unwrap();
        assert_eq!(v.mode(), InteractionMode::Zooming);
        v.settle();
        assert_eq!(v.mode(), InteractionMode::Idle);

        v.begin_pan();
        v.resize(800.0, 300.0).unwrap();
        assert_eq!(v.mode(), InteractionMode::Idle);
    }

    #[test]
    fn resize_keeps_window() {
        let mut v = viewport();
        v.zoom_at(2.0, 250.0).unwrap();
        let before = v.visible_window();
        v.resize(1000.0, 200.0).unwrap();
        let after = v.visible_window();
        assert!((before.start - after.start).abs() < EPS);
        assert!((before.end - after.end).abs() < EPS);
        assert_eq!(v.width_px(), 1000.0);
        assert_eq!(v.height_px(), 200.0);
    }

    #[test]
    fn reset_shows_the_envelope() {
        let mut v = viewport();
        v.zoom_at(8.0, 300.0).unwrap();
        v.pan_by(40.0).unwrap();
        let fitted = v.fit_bounds(*v.scale()).unwrap();
        assert_eq!(fitted.visible_window(), TimeRange::new(0.0, 100.0));
        v.reset().unwrap();
        assert_eq!(v.visible_window(), TimeRange::new(0.0, 100.0));
        assert!((v.current().zoom - 1.0).abs() < EPS);
    }

    #[test]
    fn rejected_transition_leaves_state() {
        let mut v = viewport();
        v.zoom_at(2.0, 120.0).unwrap();
        let before = v.clone();
        assert!(matches!(
            v.zoom_at(0.0, 10.0),
            Err(EngineError::DegenerateScale { .. })
        ));
        assert!(v.resize(0.0, 100.0).is_err());
        assert!(v.resize(100.0, f64::NAN).is_err());
        assert_eq!(v, before);
    }

    #[test]
    fn invalid_bounds() {
        let err = Viewport::new(TimeRange::instant(3.0), 100.0, 100.0);
        assert!(matches!(err, Err(EngineError::InvalidBounds { .. })));
        let err = Viewport::new(TimeRange::new(0.0, f64::INFINITY), 100.0, 100.0);
        assert!(matches!(err, Err(EngineError::InvalidBounds { .. })));
    }

    #[test]
    fn min_span_limits_zoom_in() {
        let mut v = viewport().with_min_visible_span(1.0);
        v.zoom_at(1000.0, 250.0).unwrap();
        assert!((v.visible_window().span() - 1.0).abs() < EPS);
        assert_inside(&v);
    }

    #[test]
    fn unbounded_viewport_pans_freely() {
        let mut v = Viewport::unbounded(TimeRange::new(0.0, 100.0), 500.0, 100.0).unwrap();
        v.pan_by(500.0).unwrap();
        assert!((v.visible_window().start + 100.0).abs() < EPS);
        v.zoom_at(0.5, 0.0).unwrap();
        assert!((v.visible_window().span() - 200.0).abs() < EPS);
    }

    #[test]
    fn revision_tracks_commits() {
        let mut v = viewport();
        assert_eq!(v.revision(), 0);
        v.begin_pan();
        assert_eq!(v.revision(), 0);
        v.pan_by(-5.0).unwrap();
        assert_eq!(v.revision(), 1);
        v.scroll_by(-10.0);
        assert_eq!(v.revision(), 1);
        v.scroll_by(30.0);
        assert_eq!(v.scroll_y(), 30.0);
        v.clamp_scroll(310.0);
        assert_eq!(v.scroll_y(), 10.0);
        assert_eq!(v.revision(), 3);
    }

    #[test]
    fn random_gestures_stay_inside_bounds() {
        let mut seed: u64 = 7;
        let mut next = move || {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            (seed >> 33) as f64 / f64::from(1u32 << 31)
        };
        let mut v = viewport().with_min_visible_span(1e-3);
        for _ in 0..2000 {
            let r = next();
            let result = if r < 0.5 {
                v.pan_by((next() - 0.5) * 2000.0)
            } else {
                v.zoom_at(0.25 + next() * 4.0, next() * 500.0)
            };
            result.unwrap();
            assert_inside(&v);
        }
    }
}
