use serde::{Deserialize, Serialize};

/// Raw input from the rendering surface, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    PointerDown { x: f64 },
    PointerMove { x: f64 },
    PointerUp { x: f64 },
    /// Drag aborted by the platform.
    PointerCancel,
    /// Pointer left the surface.
    PointerLeave,
    /// `delta_y > 0` zooms in around `x`; `delta_x` pans.
    Wheel { x: f64, delta_x: f64, delta_y: f64 },
    /// Pinch gesture; `scale > 1` zooms in.
    Pinch { x: f64, scale: f64 },
    Resize { width: f64, height: f64 },
    Key(KeyAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAction {
    PanLeft,
    PanRight,
    ZoomIn,
    ZoomOut,
    /// Show the full bounds.
    Reset,
    ScrollUp,
    ScrollDown,
}
