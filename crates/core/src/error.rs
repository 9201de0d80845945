use laneview_protocol::{ItemId, LaneId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Zero-width (or non-finite) time domain or pixel range, or a zoom
    /// that would leave `zoom <= 0`.
    #[error("degenerate time scale: {reason}")]
    DegenerateScale { reason: &'static str },
    #[error("invalid clamping bounds [{start}, {end}]")]
    InvalidBounds { start: f64, end: f64 },
    #[error("item {item} references unknown lane '{lane}'")]
    UnknownItemReference { item: ItemId, lane: LaneId },
}

impl EngineError {
    pub(crate) fn degenerate(reason: &'static str) -> Self {
        EngineError::DegenerateScale { reason }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
