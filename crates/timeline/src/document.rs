//! Timeline document exchanged with the host for persistence.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{MagneticZone, RippleConfig, Seconds, TimelineError, Track, TIME_EPSILON};

pub const DOCUMENT_VERSION: u16 = 1;

fn default_version() -> u16 {
    DOCUMENT_VERSION
}

fn default_zoom() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDocument {
    #[serde(default = "default_version")]
    pub version: u16,
    #[serde(default)]
    pub duration: Seconds,
    #[serde(default = "default_zoom")]
    pub zoom: f32,
    #[serde(default)]
    pub playhead: Seconds,
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub magnetic_zones: Vec<MagneticZone>,
    #[serde(default)]
    pub config: RippleConfig,
}

impl TimelineDocument {
    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TimelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the clip invariants a loaded document must satisfy.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(invalid(format!("duration {} is not valid", self.duration)));
        }
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(invalid(format!("zoom {} must be positive", self.zoom)));
        }

        let mut track_ids = HashSet::new();
        let mut clip_ids = HashSet::new();
        for track in &self.tracks {
            if !track_ids.insert(track.id) {
                return Err(invalid(format!("duplicate track id {}", track.id)));
            }

            let mut clips: Vec<_> = track.clips.iter().collect();
            clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
            for clip in &clips {
                if !clip_ids.insert(clip.id) {
                    return Err(invalid(format!("duplicate clip id {}", clip.id)));
                }
                if clip.track_id != track.id {
                    return Err(invalid(format!(
                        "clip {} claims track {} but sits on {}",
                        clip.id, clip.track_id, track.id
                    )));
                }
                if !clip.start_time.is_finite() || clip.start_time < 0.0 {
                    return Err(invalid(format!("clip {} has an invalid start", clip.id)));
                }
                if !clip.duration.is_finite() || clip.duration <= 0.0 {
                    return Err(invalid(format!("clip {} must have a positive duration", clip.id)));
                }
            }
            for pair in clips.windows(2) {
                if pair[1].start_time < pair[0].end_time() - TIME_EPSILON {
                    return Err(invalid(format!(
                        "clips {} and {} overlap on track {}",
                        pair[0].id, pair[1].id, track.id
                    )));
                }
            }
        }

        for zone in &self.magnetic_zones {
            if !zone.start.is_finite() || !zone.end.is_finite() || zone.end < zone.start {
                return Err(invalid(format!("magnetic zone {} has an invalid range", zone.id)));
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> TimelineError {
    TimelineError::InvalidDocument(message)
}
