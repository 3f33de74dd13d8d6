//! Magnetic multi-track timeline: clip arrangement, snapping, ripple edits and
//! gap closing, with snapshot-based undo.
use thiserror::Error;

mod model;
pub use model::*;
mod config;
pub use config::*;
mod zones;
pub use zones::*;
pub mod snap;
pub mod ripple;
pub use ripple::{ClipShift, RippleReport};
mod history;
pub use history::*;
mod document;
pub use document::*;
mod store;
pub use store::*;

/// Time on the timeline axis, in seconds.
pub type Seconds = f64;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("placement on track {track_id} blocked by clip {blocking}")]
    PlacementConflict { track_id: TrackId, blocking: ClipId },
    #[error("clip not found: {0}")]
    ClipNotFound(ClipId),
    #[error("track not found: {0}")]
    TrackNotFound(TrackId),
    #[error("magnetic zone not found: {0}")]
    ZoneNotFound(ZoneId),
    #[error("locked: {0}")]
    Locked(String),
    #[error("invalid operation: {0}")]
    InvalidOp(String),
    #[error("invalid timeline document: {0}")]
    InvalidDocument(String),
    #[error("history empty: {0}")]
    HistoryEmpty(&'static str),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
