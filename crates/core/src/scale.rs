use laneview_protocol::{PixelRange, TimeRange, Timestamp};

use crate::error::{EngineError, Result};

/// Invertible affine map between a time domain and a pixel range under a
/// zoom/pan transform:
///
/// ```text
///   x = range.start + (t - domain.start) * k * zoom + pan
///   k = range.width / domain.span
/// ```
///
/// At `zoom == 1, pan == 0` the whole domain fills the range. Every
/// operation returns a new scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    domain: TimeRange,
    range: PixelRange,
    zoom: f64,
    pan: f64,
}

impl TimeScale {
    pub fn new(domain: TimeRange, range: PixelRange) -> Result<Self> {
        validate(&domain, &range)?;
        Ok(Self {
            domain,
            range,
            zoom: 1.0,
            pan: 0.0,
        })
    }

    pub fn domain(&self) -> TimeRange {
        self.domain
    }

    pub fn range(&self) -> PixelRange {
        self.range
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> f64 {
        self.pan
    }

    pub fn pixels_per_unit(&self) -> f64 {
        self.range.width() / self.domain.span() * self.zoom
    }

    pub fn to_pixel(&self, t: Timestamp) -> f64 {
        self.range.start + (t - self.domain.start) * self.pixels_per_unit() + self.pan
    }

    pub fn to_time(&self, x: f64) -> Timestamp {
        self.domain.start + (x - self.range.start - self.pan) / self.pixels_per_unit()
    }

    /// Time window currently mapped onto the pixel range.
    pub fn visible_window(&self) -> TimeRange {
        TimeRange::new(self.to_time(self.range.start), self.to_time(self.range.end))
    }

    /// Multiply the zoom by `factor` keeping the time under `anchor_px`
    /// fixed on screen. `factor > 1` zooms in.
    pub fn zoom_at(&self, factor: f64, anchor_px: f64) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(EngineError::degenerate("zoom factor must be finite and > 0"));
        }
        if !anchor_px.is_finite() {
            return Err(EngineError::degenerate("zoom anchor is not finite"));
        }
        let zoom = self.zoom * factor;
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(EngineError::degenerate("zoom out of representable range"));
        }
        // Pixel offset of the anchored time from the unpanned origin.
        let rel = anchor_px - self.range.start - self.pan;
        Ok(Self {
            zoom,
            pan: anchor_px - self.range.start - rel * factor,
            ..*self
        })
    }

    /// Shift the content by `delta_px` without changing zoom. Positive
    /// deltas move content right, bringing earlier times into view.
    /// Non-finite deltas leave the scale as is.
    pub fn pan_by(&self, delta_px: f64) -> Self {
        if !delta_px.is_finite() {
            return *self;
        }
        Self {
            pan: self.pan + delta_px,
            ..*self
        }
    }

    /// The scale over the same domain and range that shows exactly
    /// `window`.
    pub fn with_visible(&self, window: TimeRange) -> Result<Self> {
        if !window.is_finite() || window.span() <= 0.0 {
            return Err(EngineError::degenerate("visible window has zero span"));
        }
        let zoom = self.domain.span() / window.span();
        let k = self.range.width() / self.domain.span();
        Ok(Self {
            zoom,
            pan: -(window.start - self.domain.start) * k * zoom,
            ..*self
        })
    }

    /// Map onto a new pixel range, keeping the visible window.
    pub fn with_range(&self, range: PixelRange) -> Result<Self> {
        validate(&self.domain, &range)?;
        let window = self.visible_window();
        Self {
            range,
            zoom: 1.0,
            pan: 0.0,
            ..*self
        }
        .with_visible(window)
    }
}

fn validate(domain: &TimeRange, range: &PixelRange) -> Result<()> {
    if !domain.is_finite() || domain.span() <= 0.0 {
        return Err(EngineError::degenerate("time domain has zero span"));
    }
    if !(range.start.is_finite() && range.end.is_finite()) || range.width() <= 0.0 {
        return Err(EngineError::degenerate("pixel range has zero width"));
    }
    Ok(())
}
