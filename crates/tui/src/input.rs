use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use laneview_protocol::{InputEvent, KeyAction};

/// Columns reserved on the left for lane labels.
pub const GUTTER: u16 = 14;
/// First terminal row of the timeline surface (below the title bar).
pub const TOP: u16 = 1;
/// Title bar plus status line.
pub const CHROME_ROWS: u16 = 2;

/// Wheel notch in zoom units: `2^(25 * 0.01)` is about 1.19x.
const WHEEL_ZOOM: f64 = 25.0;
/// Horizontal wheel notch in columns.
const WHEEL_PAN: f64 = 4.0;

/// What the viewer should do with one terminal event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    Input(InputEvent),
    /// Pointer moved without a button; `None` once it leaves the surface.
    Hover(Option<(f64, f64)>),
    None,
}

/// Surface size in cells for a terminal of `cols` x `rows`.
pub fn surface_size(cols: u16, rows: u16) -> (f64, f64) {
    (
        f64::from(cols.saturating_sub(GUTTER).max(1)),
        f64::from(rows.saturating_sub(CHROME_ROWS)),
    )
}

pub fn map_event(event: &Event) -> Action {
    match event {
        Event::Key(key) => map_key(key),
        Event::Mouse(mouse) => map_mouse(mouse),
        Event::Resize(cols, rows) => {
            let (width, height) = surface_size(*cols, *rows);
            Action::Input(InputEvent::Resize { width, height })
        }
        Event::FocusLost => Action::Input(InputEvent::PointerLeave),
        _ => Action::None,
    }
}

fn map_key(key: &KeyEvent) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }
    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return Action::Quit;
        }
        KeyCode::Left | KeyCode::Char('h') => KeyAction::PanLeft,
        KeyCode::Right | KeyCode::Char('l') => KeyAction::PanRight,
        KeyCode::Char('+' | '=') => KeyAction::ZoomIn,
        KeyCode::Char('-') => KeyAction::ZoomOut,
        KeyCode::Char('0' | 'r') => KeyAction::Reset,
        KeyCode::Up | KeyCode::Char('k') => KeyAction::ScrollUp,
        KeyCode::Down | KeyCode::Char('j') => KeyAction::ScrollDown,
        _ => return Action::None,
    };
    Action::Input(InputEvent::Key(action))
}

fn map_mouse(mouse: &MouseEvent) -> Action {
    let x = f64::from(mouse.column) - f64::from(GUTTER);
    let y = f64::from(mouse.row) - f64::from(TOP);
    let event = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => InputEvent::PointerDown { x },
        MouseEventKind::Drag(MouseButton::Left) => InputEvent::PointerMove { x },
        MouseEventKind::Up(MouseButton::Left) => InputEvent::PointerUp { x },
        MouseEventKind::ScrollUp => InputEvent::Wheel {
            x,
            delta_x: 0.0,
            delta_y: WHEEL_ZOOM,
        },
        MouseEventKind::ScrollDown => InputEvent::Wheel {
            x,
            delta_x: 0.0,
            delta_y: -WHEEL_ZOOM,
        },
        MouseEventKind::ScrollLeft => InputEvent::Wheel {
            x,
            delta_x: -WHEEL_PAN,
            delta_y: 0.0,
        },
        MouseEventKind::ScrollRight => InputEvent::Wheel {
            x,
            delta_x: WHEEL_PAN,
            delta_y: 0.0,
        },
        MouseEventKind::Moved => {
            let inside = x >= 0.0 && y >= 0.0;
            return Action::Hover(inside.then_some((x, y)));
        }
        _ => return Action::None,
    };
    Action::Input(event)
}
