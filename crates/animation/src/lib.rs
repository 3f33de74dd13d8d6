//! Per-property keyframe animation: typed keyframe tracks, easing, and the
//! per-frame sampler the renderer queries with the playhead time.
use thiserror::Error;

mod easing;
pub use easing::*;
mod value;
pub use value::*;
mod track;
pub use track::*;
mod engine;
pub use engine::*;
mod document;
pub use document::*;
mod sampler;
pub use sampler::*;

#[derive(Debug, Error)]
pub enum AnimationError {
    #[error("animation track not found: {0}")]
    TrackNotFound(AnimationTrackId),
    #[error("keyframe not found: {0}")]
    KeyframeNotFound(KeyframeId),
    #[error("value does not fit {property} ({expected})")]
    TypeMismatch {
        property: String,
        expected: PropertyType,
    },
    #[error("invalid animation data: {0}")]
    Validation(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnimationError>;
