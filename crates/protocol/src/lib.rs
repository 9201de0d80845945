pub mod input;
pub mod item;
pub mod shared_str;
pub mod state;
pub mod types;

pub use input::{InputEvent, KeyAction};
pub use item::{
    CurveItem, EventItem, Item, ItemId, LaneDef, LaneId, Sample, TimeRangeItem, TimelineDocument,
};
pub use shared_str::SharedStr;
pub use state::{Diagnostic, LaneState, Placement, ViewportSnapshot, VirtualizationState};
pub use types::{PixelRange, TimeRange, Timestamp};
