use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::Seconds;

/// Two times closer than this are the same instant for overlap and snapping.
pub const TIME_EPSILON: Seconds = 1e-9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ClipId(pub Uuid);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TrackId(pub Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
    Text,
    Image,
    Effects,
}

impl TrackKind {
    /// Row height the editor uses when a track of this kind is created.
    pub fn default_height(&self) -> f32 {
        match self {
            Self::Video => 80.0,
            Self::Audio => 60.0,
            Self::Text | Self::Image => 50.0,
            Self::Effects => 40.0,
        }
    }
}

impl Default for TrackKind {
    fn default() -> Self {
        Self::Video
    }
}

fn default_volume() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

/// A time-bounded reference to host-owned content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: ClipId,
    pub start_time: Seconds,
    pub duration: Seconds,
    pub track_id: TrackId,
    /// Opaque to the engine; the host resolves it to media.
    pub content_ref: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Clip {
    pub fn new(
        track_id: TrackId,
        start_time: Seconds,
        duration: Seconds,
        content_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: ClipId::new(),
            start_time,
            duration,
            track_id,
            content_ref: content_ref.into(),
            locked: false,
            volume: default_volume(),
        }
    }

    pub fn end_time(&self) -> Seconds {
        self.start_time + self.duration
    }

    /// Half-open interval test: touching edges do not overlap.
    pub fn overlaps(&self, start: Seconds, end: Seconds) -> bool {
        self.start_time < end - TIME_EPSILON && start < self.end_time() - TIME_EPSILON
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    #[serde(default)]
    pub clips: Vec<Clip>,
    pub height: f32,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Track {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            id: TrackId::new(),
            kind,
            clips: Vec::new(),
            height: kind.default_height(),
            visible: true,
            locked: false,
            muted: false,
            volume: default_volume(),
        }
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|clip| clip.id == id)
    }

    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|clip| clip.id == id)
    }

    pub fn contains(&self, id: ClipId) -> bool {
        self.clips.iter().any(|clip| clip.id == id)
    }

    /// Insert keeping clips ordered by start time.
    pub fn insert_clip(&mut self, mut clip: Clip) {
        clip.track_id = self.id;
        self.clips.push(clip);
        self.sort_clips();
    }

    pub fn take_clip(&mut self, id: ClipId) -> Option<Clip> {
        let index = self.clips.iter().position(|clip| clip.id == id)?;
        Some(self.clips.remove(index))
    }

    pub fn sort_clips(&mut self) {
        self.clips
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    }

    /// Clips intersecting `[start, end)`, optionally ignoring one clip.
    pub fn overlapping(&self, start: Seconds, end: Seconds, exclude: Option<ClipId>) -> Vec<&Clip> {
        self.clips
            .iter()
            .filter(|clip| Some(clip.id) != exclude && clip.overlaps(start, end))
            .collect()
    }

    pub fn end_time(&self) -> Seconds {
        self.clips
            .iter()
            .map(Clip::end_time)
            .fold(0.0, Seconds::max)
    }

    /// True when no two clips share any part of their intervals.
    pub fn is_non_overlapping(&self) -> bool {
        self.clips
            .windows(2)
            .all(|pair| pair[1].start_time >= pair[0].end_time() - TIME_EPSILON)
    }
}

/// Empty span between two consecutive clips of a track. Derived, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    pub track_id: TrackId,
    pub start: Seconds,
    pub end: Seconds,
    pub duration: Seconds,
}

impl Gap {
    pub fn new(track_id: TrackId, start: Seconds, end: Seconds) -> Self {
        Self {
            track_id,
            start,
            end,
            duration: end - start,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeline {
    pub duration: Seconds,
    pub zoom: f32,
    pub playhead: Seconds,
    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn new(duration: Seconds) -> Self {
        Self {
            duration: duration.max(0.0),
            zoom: 1.0,
            playhead: 0.0,
            tracks: Vec::new(),
        }
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|track| track.id == id)
    }

    pub fn track_index(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|track| track.id == id)
    }

    /// Index of the track holding `clip`.
    pub fn locate_clip(&self, clip: ClipId) -> Option<usize> {
        self.tracks.iter().position(|track| track.contains(clip))
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.tracks.iter().find_map(|track| track.clip(id))
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.tracks.iter().flat_map(|track| track.clips.iter())
    }

    pub fn content_end(&self) -> Seconds {
        self.tracks
            .iter()
            .map(Track::end_time)
            .fold(0.0, Seconds::max)
    }

    /// Grow the duration to cover every clip and keep the playhead inside it.
    pub fn fit_to_content(&mut self) {
        self.duration = self.duration.max(self.content_end());
        self.playhead = self.playhead.clamp(0.0, self.duration);
    }
}
