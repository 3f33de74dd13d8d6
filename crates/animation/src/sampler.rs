use std::collections::BTreeMap;

use crate::{AnimationTrack, KeyframeValue};

/// Read-only view answering "what is every animated property at time t".
///
/// Borrowing the tracks keeps per-frame sampling free of copies and locks.
#[derive(Debug, Clone, Copy)]
pub struct AnimationSampler<'a> {
    tracks: &'a [AnimationTrack],
}

impl<'a> AnimationSampler<'a> {
    pub fn new(tracks: &'a [AnimationTrack]) -> Self {
        Self { tracks }
    }

    /// Values of all enabled tracks, keyed by property. When two enabled
    /// tracks animate the same property, the later track wins.
    pub fn values_at(&self, time: f64) -> BTreeMap<String, KeyframeValue> {
        self.tracks
            .iter()
            .filter(|track| track.enabled)
            .map(|track| (track.property.clone(), track.value_at(time)))
            .collect()
    }

    pub fn value_at(&self, property: &str, time: f64) -> Option<KeyframeValue> {
        self.tracks
            .iter()
            .rev()
            .find(|track| track.enabled && track.property == property)
            .map(|track| track.value_at(time))
    }
}
