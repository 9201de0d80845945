pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod interaction;
pub mod lane;
pub mod layout;
pub mod scale;
pub mod viewport;

pub use config::{ConfigError, EngineConfig};
pub use engine::{Hit, VirtualizationEngine};
pub use error::{EngineError, Result};
pub use index::{IndexEntry, IntervalIndex};
pub use interaction::InteractionController;
pub use lane::{Lane, LaneSet};
pub use layout::LaneLayout;
pub use scale::TimeScale;
pub use viewport::{InteractionMode, PendingTransform, Viewport};
