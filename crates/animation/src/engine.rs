use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    export_animation, import_animation, try_import_animation, AnimationError, AnimationSampler,
    AnimationTrack, AnimationTrackId, Easing, Interpolation, Keyframe, KeyframeId, KeyframeValue,
    PropertyType, Result,
};

/// Tolerances of the keyframe engine.
///
/// Deserialization goes through [`KeyframeConfig::new`], so a loaded config
/// always holds usable tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawKeyframeConfig")]
pub struct KeyframeConfig {
    /// Keyframes closer than this in time are the same keyframe on insert.
    /// Must be finite and positive.
    pub time_tolerance: f64,
    /// Largest deviation from the neighbour lerp that `optimize_track` still
    /// treats as redundant. Must be finite and not negative.
    pub redundancy_tolerance: f64,
}

impl Default for KeyframeConfig {
    fn default() -> Self {
        Self {
            time_tolerance: 0.01,
            redundancy_tolerance: 0.001,
        }
    }
}

impl KeyframeConfig {
    pub fn new(time_tolerance: f64, redundancy_tolerance: f64) -> Result<Self> {
        let config = Self {
            time_tolerance,
            redundancy_tolerance,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.time_tolerance.is_finite() || self.time_tolerance <= 0.0 {
            return Err(AnimationError::Validation(format!(
                "time tolerance {} must be finite and positive",
                self.time_tolerance
            )));
        }
        if !self.redundancy_tolerance.is_finite() || self.redundancy_tolerance < 0.0 {
            return Err(AnimationError::Validation(format!(
                "redundancy tolerance {} must be finite and not negative",
                self.redundancy_tolerance
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawKeyframeConfig {
    time_tolerance: f64,
    redundancy_tolerance: f64,
}

impl Default for RawKeyframeConfig {
    fn default() -> Self {
        let config = KeyframeConfig::default();
        Self {
            time_tolerance: config.time_tolerance,
            redundancy_tolerance: config.redundancy_tolerance,
        }
    }
}

impl TryFrom<RawKeyframeConfig> for KeyframeConfig {
    type Error = AnimationError;

    fn try_from(raw: RawKeyframeConfig) -> Result<Self> {
        Self::new(raw.time_tolerance, raw.redundancy_tolerance)
    }
}

/// Partial update of a keyframe; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframePatch {
    pub time: Option<f64>,
    pub value: Option<KeyframeValue>,
    pub easing: Option<Easing>,
    pub interpolation: Option<Interpolation>,
    pub selected: Option<bool>,
    pub locked: Option<bool>,
}

/// Owns the animation tracks of one element plus the keyframe clipboard.
#[derive(Debug, Clone, Default)]
pub struct KeyframeEngine {
    config: KeyframeConfig,
    tracks: Vec<AnimationTrack>,
    clipboard: Vec<Keyframe>,
}

impl KeyframeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with custom tolerances; fails when `config` does not validate.
    pub fn with_config(config: KeyframeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &KeyframeConfig {
        &self.config
    }

    pub fn tracks(&self) -> &[AnimationTrack] {
        &self.tracks
    }

    pub fn track(&self, id: AnimationTrackId) -> Option<&AnimationTrack> {
        self.tracks.iter().find(|track| track.id == id)
    }

    pub fn sampler(&self) -> AnimationSampler<'_> {
        AnimationSampler::new(&self.tracks)
    }

    pub fn create_track(
        &mut self,
        property: impl Into<String>,
        property_type: PropertyType,
        default_value: KeyframeValue,
        color: Option<&str>,
    ) -> Result<AnimationTrackId> {
        let mut track = AnimationTrack::new(property, property_type, default_value)?;
        if let Some(color) = color {
            track = track.with_color(color);
        }
        let id = track.id;
        debug!(track = %id, property = %track.property, "animation track created");
        self.tracks.push(track);
        Ok(id)
    }

    pub fn add_track(&mut self, track: AnimationTrack) -> AnimationTrackId {
        let id = track.id;
        self.tracks.push(track);
        id
    }

    pub fn remove_track(&mut self, id: AnimationTrackId) -> Result<AnimationTrack> {
        let index = self
            .tracks
            .iter()
            .position(|track| track.id == id)
            .ok_or(AnimationError::TrackNotFound(id))?;
        Ok(self.tracks.remove(index))
    }

    pub fn set_track_enabled(&mut self, id: AnimationTrackId, enabled: bool) -> Result<()> {
        self.track_mut(id)?.enabled = enabled;
        Ok(())
    }

    pub fn interpolate_value(&self, track_id: AnimationTrackId, time: f64) -> Result<KeyframeValue> {
        self.track(track_id)
            .map(|track| track.value_at(time))
            .ok_or(AnimationError::TrackNotFound(track_id))
    }

    /// Insert a keyframe, or update the one already within the time tolerance.
    ///
    /// An updated keyframe takes the given easing and, when supplied, the
    /// value. A new keyframe without a value captures the track's current
    /// value at `time` and interpolates as bezier.
    pub fn add_keyframe(
        &mut self,
        track_id: AnimationTrackId,
        time: f64,
        value: Option<KeyframeValue>,
        easing: Option<Easing>,
    ) -> Result<KeyframeId> {
        if !time.is_finite() {
            return Err(AnimationError::Validation(format!("keyframe time {time} is not finite")));
        }
        let tolerance = self.config.time_tolerance;
        let easing = easing.unwrap_or_default();

        let track = self.track_mut(track_id)?;
        if let Some(value) = &value {
            track.ensure_value(value)?;
        }

        if let Some(index) = track.position_near(time, tolerance) {
            let existing = &mut track.keyframes[index];
            if let Some(value) = value {
                existing.value = value;
            }
            existing.easing = easing;
            debug!(keyframe = %existing.id, time, "keyframe updated in place");
            return Ok(existing.id);
        }

        let value = value.unwrap_or_else(|| track.value_at(time));
        let keyframe = Keyframe::new(time, value).with_easing(easing);
        let id = keyframe.id;
        track.keyframes.push(keyframe);
        track.sort_keyframes();
        debug!(keyframe = %id, time, "keyframe added");
        Ok(id)
    }

    pub fn remove_keyframe(
        &mut self,
        track_id: AnimationTrackId,
        keyframe_id: KeyframeId,
    ) -> Result<Keyframe> {
        let track = self.track_mut(track_id)?;
        let index = track
            .keyframes
            .iter()
            .position(|keyframe| keyframe.id == keyframe_id)
            .ok_or(AnimationError::KeyframeNotFound(keyframe_id))?;
        Ok(track.keyframes.remove(index))
    }

    /// Apply `patch` to one keyframe.
    ///
    /// A new time re-sorts the track; other keyframes that end up within the
    /// time tolerance of it are replaced by the patched one.
    pub fn update_keyframe(
        &mut self,
        track_id: AnimationTrackId,
        keyframe_id: KeyframeId,
        patch: KeyframePatch,
    ) -> Result<()> {
        let tolerance = self.config.time_tolerance;
        let track = self.track_mut(track_id)?;
        if track.keyframe(keyframe_id).is_none() {
            return Err(AnimationError::KeyframeNotFound(keyframe_id));
        }
        if let Some(value) = &patch.value {
            track.ensure_value(value)?;
        }
        if let Some(time) = patch.time {
            if !time.is_finite() {
                return Err(AnimationError::Validation(format!(
                    "keyframe time {time} is not finite"
                )));
            }
        }

        let Some(keyframe) = track.keyframe_mut(keyframe_id) else {
            return Err(AnimationError::KeyframeNotFound(keyframe_id));
        };
        if let Some(value) = patch.value {
            keyframe.value = value;
        }
        if let Some(easing) = patch.easing {
            keyframe.easing = easing;
        }
        if let Some(interpolation) = patch.interpolation {
            keyframe.interpolation = interpolation;
        }
        if let Some(selected) = patch.selected {
            keyframe.selected = selected;
        }
        if let Some(locked) = patch.locked {
            keyframe.locked = locked;
        }
        if let Some(time) = patch.time {
            keyframe.time = time;
            track.keyframes.retain(|other| {
                other.id == keyframe_id || (other.time - time).abs() >= tolerance
            });
            track.sort_keyframes();
        }
        Ok(())
    }

    /// Snapshot the given keyframes, from any track, into the clipboard.
    /// Returns how many were found.
    pub fn copy_keyframes(&mut self, ids: &[KeyframeId]) -> usize {
        self.clipboard = self
            .tracks
            .iter()
            .flat_map(|track| track.keyframes.iter())
            .filter(|keyframe| ids.contains(&keyframe.id))
            .cloned()
            .collect();
        self.clipboard.len()
    }

    pub fn clipboard(&self) -> &[Keyframe] {
        &self.clipboard
    }

    /// Paste the clipboard so the earliest copied keyframe lands on
    /// `target_time`, keeping relative spacing. Each keyframe goes through
    /// the [`add_keyframe`](Self::add_keyframe) upsert.
    pub fn paste_keyframes(
        &mut self,
        track_id: AnimationTrackId,
        target_time: f64,
    ) -> Result<Vec<KeyframeId>> {
        if !target_time.is_finite() {
            return Err(AnimationError::Validation(format!(
                "paste time {target_time} is not finite"
            )));
        }
        let track = self.track(track_id).ok_or(AnimationError::TrackNotFound(track_id))?;
        let Some(earliest) = self
            .clipboard
            .iter()
            .map(|keyframe| keyframe.time)
            .reduce(f64::min)
        else {
            return Ok(Vec::new());
        };
        for keyframe in &self.clipboard {
            track.ensure_value(&keyframe.value)?;
        }

        let offset = target_time - earliest;
        let copied = self.clipboard.clone();
        let mut pasted = Vec::with_capacity(copied.len());
        for keyframe in copied {
            let id = self.add_keyframe(
                track_id,
                keyframe.time + offset,
                Some(keyframe.value),
                Some(keyframe.easing),
            )?;
            if !pasted.contains(&id) {
                pasted.push(id);
            }
        }
        debug!(track = %track_id, count = pasted.len(), "keyframes pasted");
        Ok(pasted)
    }

    /// Drop interior numeric keyframes that sit on the straight line between
    /// their neighbours. Returns the number removed.
    pub fn optimize_track(&mut self, track_id: AnimationTrackId) -> Result<usize> {
        let tolerance = self.config.redundancy_tolerance;
        let track = self.track_mut(track_id)?;
        if !track.property_type.is_numeric() || track.keyframes.len() < 3 {
            return Ok(0);
        }

        let keyframes = &track.keyframes;
        let last = keyframes.len() - 1;
        let keep: Vec<bool> = (0..keyframes.len())
            .map(|index| {
                if index == 0 || index == last {
                    return true;
                }
                let (prev, current, next) =
                    (&keyframes[index - 1], &keyframes[index], &keyframes[index + 1]);
                let span = next.time - prev.time;
                let progress = if span == 0.0 {
                    0.0
                } else {
                    (current.time - prev.time) / span
                };
                let expected = KeyframeValue::blend(
                    track.property_type,
                    &prev.value,
                    &next.value,
                    progress,
                    Interpolation::Linear,
                );
                match (expected.as_number(), current.value.as_number()) {
                    (Some(expected), Some(actual)) => (expected - actual).abs() > tolerance,
                    _ => true,
                }
            })
            .collect();

        let before = track.keyframes.len();
        let mut flags = keep.into_iter();
        track.keyframes.retain(|_| flags.next().unwrap_or(true));
        let removed = before - track.keyframes.len();
        debug!(track = %track_id, removed, "track optimized");
        Ok(removed)
    }

    /// Mark keyframes as selected. Without `additive` the previous selection
    /// is cleared first. Unknown ids are ignored.
    pub fn select_keyframes(&mut self, ids: &[KeyframeId], additive: bool) {
        for keyframe in self.tracks.iter_mut().flat_map(|track| track.keyframes.iter_mut()) {
            if ids.contains(&keyframe.id) {
                keyframe.selected = true;
            } else if !additive {
                keyframe.selected = false;
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.select_keyframes(&[], false);
    }

    pub fn selected_keyframes(&self) -> Vec<KeyframeId> {
        self.tracks
            .iter()
            .flat_map(|track| track.keyframes.iter())
            .filter(|keyframe| keyframe.selected)
            .map(|keyframe| keyframe.id)
            .collect()
    }

    pub fn export(&self) -> Result<String> {
        export_animation(&self.tracks)
    }

    /// Replace all tracks with the ones in `json`. Malformed input leaves the
    /// engine with no tracks; the cause is logged.
    pub fn import(&mut self, json: &str) -> usize {
        self.tracks = import_animation(json);
        self.tracks.len()
    }

    /// Like [`import`](Self::import) but reports the failure and keeps the
    /// current tracks on error.
    pub fn try_import(&mut self, json: &str) -> Result<usize> {
        self.tracks = try_import_animation(json)?;
        Ok(self.tracks.len())
    }

    fn track_mut(&mut self, id: AnimationTrackId) -> Result<&mut AnimationTrack> {
        self.tracks
            .iter_mut()
            .find(|track| track.id == id)
            .ok_or(AnimationError::TrackNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    fn engine_with_number_track() -> (KeyframeEngine, AnimationTrackId) {
        let mut engine = KeyframeEngine::new();
        let track = engine
            .create_track("opacity", PropertyType::Opacity, KeyframeValue::Number(1.0), None)
            .unwrap();
        (engine, track)
    }

    fn times(engine: &KeyframeEngine, track: AnimationTrackId) -> Vec<f64> {
        engine
            .track(track)
            .unwrap()
            .keyframes
            .iter()
            .map(|keyframe| keyframe.time)
            .collect()
    }

    #[test]
    fn test_add_twice_at_same_time_upserts() {
        let (mut engine, track) = engine_with_number_track();
        let first = engine
            .add_keyframe(track, 1.0, Some(KeyframeValue::Number(0.5)), None)
            .unwrap();
        let second = engine
            .add_keyframe(track, 1.005, Some(KeyframeValue::Number(0.5)), None)
            .unwrap();

        assert_eq!(first, second);
        let keyframes = &engine.track(track).unwrap().keyframes;
        assert_eq!(keyframes.len(), 1);
        assert_eq!(keyframes[0].time, 1.0);
        assert_eq!(keyframes[0].value, KeyframeValue::Number(0.5));
        assert_eq!(keyframes[0].easing, Easing::EaseOut);
        assert_eq!(keyframes[0].interpolation, Interpolation::Bezier);
    }

    #[test]
    fn test_inserts_stay_strictly_sorted() {
        let (mut engine, track) = engine_with_number_track();
        for time in [3.0, 1.0, 2.0, 1.001, 0.5, 2.999] {
            engine
                .add_keyframe(track, time, Some(KeyframeValue::Number(time)), None)
                .unwrap();
        }
        assert_eq!(times(&engine, track), vec![0.5, 1.0, 2.0, 3.0]);
        assert!(engine.track(track).unwrap().is_strictly_sorted());
    }

    #[test]
    fn test_new_keyframe_captures_current_value() {
        let (mut engine, track) = engine_with_number_track();
        engine
            .add_keyframe(track, 0.0, Some(KeyframeValue::Number(0.0)), Some(Easing::Linear))
            .unwrap();
        engine
            .add_keyframe(track, 2.0, Some(KeyframeValue::Number(1.0)), None)
            .unwrap();
        let middle = engine.add_keyframe(track, 1.0, None, None).unwrap();

        let track = engine.track(track).unwrap();
        assert_eq!(track.keyframe(middle).unwrap().value, KeyframeValue::Number(0.5));
    }

    #[test]
    fn test_mismatched_value_is_rejected() {
        let (mut engine, track) = engine_with_number_track();
        let result = engine.add_keyframe(track, 1.0, Some(KeyframeValue::Text("x".into())), None);
        assert!(matches!(result, Err(AnimationError::TypeMismatch { .. })));
        assert!(engine.track(track).unwrap().keyframes.is_empty());
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let (mut engine, track) = engine_with_number_track();
        assert!(matches!(
            engine.remove_keyframe(track, KeyframeId::new()),
            Err(AnimationError::KeyframeNotFound(_))
        ));
        assert!(matches!(
            engine.add_keyframe(AnimationTrackId::new(), 0.0, None, None),
            Err(AnimationError::TrackNotFound(_))
        ));
    }

    #[test]
    fn test_update_moves_and_resorts() {
        let (mut engine, track) = engine_with_number_track();
        let a = engine.add_keyframe(track, 1.0, Some(KeyframeValue::Number(0.1)), None).unwrap();
        engine.add_keyframe(track, 2.0, Some(KeyframeValue::Number(0.2)), None).unwrap();
        let c = engine.add_keyframe(track, 3.0, Some(KeyframeValue::Number(0.3)), None).unwrap();

        engine
            .update_keyframe(
                track,
                a,
                KeyframePatch {
                    time: Some(4.0),
                    interpolation: Some(Interpolation::Discrete),
                    ..KeyframePatch::default()
                },
            )
            .unwrap();
        assert_eq!(times(&engine, track), vec![2.0, 3.0, 4.0]);

        // Landing on another keyframe replaces it.
        engine
            .update_keyframe(track, a, KeyframePatch { time: Some(3.0), ..KeyframePatch::default() })
            .unwrap();
        assert_eq!(times(&engine, track), vec![2.0, 3.0]);
        assert!(engine.track(track).unwrap().keyframe(c).is_none());

        let mismatch = engine.update_keyframe(
            track,
            a,
            KeyframePatch {
                value: Some(KeyframeValue::Position(Position::default())),
                ..KeyframePatch::default()
            },
        );
        assert!(matches!(mismatch, Err(AnimationError::TypeMismatch { .. })));
    }

    #[test]
    fn test_paste_offsets_from_earliest_copied() {
        let (mut engine, source) = engine_with_number_track();
        let a = engine.add_keyframe(source, 1.0, Some(KeyframeValue::Number(0.0)), None).unwrap();
        let b = engine
            .add_keyframe(source, 1.5, Some(KeyframeValue::Number(1.0)), Some(Easing::Bounce))
            .unwrap();
        let target = engine
            .create_track("scale", PropertyType::Scale, KeyframeValue::Number(1.0), None)
            .unwrap();

        assert_eq!(engine.copy_keyframes(&[b, a]), 2);
        let pasted = engine.paste_keyframes(target, 10.0).unwrap();
        assert_eq!(pasted.len(), 2);

        let track = engine.track(target).unwrap();
        assert_eq!(times(&engine, target), vec![10.0, 10.5]);
        assert_eq!(track.keyframes[1].easing, Easing::Bounce);
        assert_ne!(track.keyframes[0].id, a);
    }

    #[test]
    fn test_paste_into_wrong_type_fails_without_changes() {
        let (mut engine, source) = engine_with_number_track();
        let a = engine.add_keyframe(source, 1.0, Some(KeyframeValue::Number(0.0)), None).unwrap();
        let text = engine
            .create_track("caption", PropertyType::Text, KeyframeValue::Text(String::new()), None)
            .unwrap();
        engine.copy_keyframes(&[a]);

        assert!(engine.paste_keyframes(text, 0.0).is_err());
        assert!(engine.track(text).unwrap().keyframes.is_empty());
    }

    #[test]
    fn test_optimize_prunes_collinear_numbers() {
        let (mut engine, track) = engine_with_number_track();
        for (time, value) in [(0.0, 0.0), (1.0, 0.5), (2.0, 1.0), (3.0, 0.2), (4.0, 0.2005)] {
            engine
                .add_keyframe(track, time, Some(KeyframeValue::Number(value)), None)
                .unwrap();
        }
        // 1.0 lies on the line 0..2; 3.0 is not redundant between 2.0 and 4.0.
        assert_eq!(engine.optimize_track(track).unwrap(), 1);
        assert_eq!(times(&engine, track), vec![0.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_optimize_leaves_non_numeric_tracks() {
        let mut engine = KeyframeEngine::new();
        let track = engine
            .create_track("label", PropertyType::Text, KeyframeValue::Text(String::new()), None)
            .unwrap();
        for time in [0.0, 1.0, 2.0] {
            engine
                .add_keyframe(track, time, Some(KeyframeValue::Text("same".into())), None)
                .unwrap();
        }
        assert_eq!(engine.optimize_track(track).unwrap(), 0);
        assert_eq!(engine.track(track).unwrap().keyframes.len(), 3);
    }

    #[test]
    fn test_custom_tolerances() {
        let mut engine = KeyframeEngine::with_config(KeyframeConfig {
            time_tolerance: 0.5,
            redundancy_tolerance: 0.1,
        })
        .unwrap();
        let track = engine
            .create_track("x", PropertyType::Number, KeyframeValue::Number(0.0), None)
            .unwrap();
        engine.add_keyframe(track, 1.0, Some(KeyframeValue::Number(1.0)), None).unwrap();
        engine.add_keyframe(track, 1.4, Some(KeyframeValue::Number(2.0)), None).unwrap();
        assert_eq!(times(&engine, track), vec![1.0]);
    }

    #[test]
    fn test_selection_is_tracked_on_keyframes() {
        let (mut engine, track) = engine_with_number_track();
        let a = engine.add_keyframe(track, 1.0, Some(KeyframeValue::Number(0.0)), None).unwrap();
        let b = engine.add_keyframe(track, 2.0, Some(KeyframeValue::Number(1.0)), None).unwrap();

        engine.select_keyframes(&[a], false);
        engine.select_keyframes(&[b], true);
        assert_eq!(engine.selected_keyframes(), vec![a, b]);

        engine.select_keyframes(&[b], false);
        assert_eq!(engine.selected_keyframes(), vec![b]);

        engine.clear_selection();
        assert!(engine.selected_keyframes().is_empty());
    }

    #[test]
    fn test_failed_import_leaves_no_tracks() {
        let (mut engine, _) = engine_with_number_track();
        assert_eq!(engine.import(r#"{"tracks": "nope"}"#), 0);
        assert!(engine.tracks().is_empty());
    }

    #[test]
    fn test_disabled_tracks_are_not_sampled() {
        let (mut engine, track) = engine_with_number_track();
        engine.add_keyframe(track, 0.0, Some(KeyframeValue::Number(0.3)), None).unwrap();
        assert_eq!(engine.sampler().value_at("opacity", 1.0), Some(KeyframeValue::Number(0.3)));

        engine.set_track_enabled(track, false).unwrap();
        assert!(engine.sampler().values_at(1.0).is_empty());
    }

    #[test]
    fn test_captured_color_keyframe_keeps_gradient() {
        let mut engine = KeyframeEngine::new();
        let track = engine
            .create_track(
                "fill",
                PropertyType::Color,
                KeyframeValue::Color("#000000".into()),
                None,
            )
            .unwrap();
        engine
            .add_keyframe(track, 0.0, Some(KeyframeValue::Color("#000000".into())), Some(Easing::Linear))
            .unwrap();
        engine
            .add_keyframe(track, 2.0, Some(KeyframeValue::Color("#ffffff".into())), Some(Easing::Linear))
            .unwrap();

        let sample = |engine: &KeyframeEngine, time: f64| {
            let value = engine.interpolate_value(track, time).unwrap();
            crate::Rgb::parse(value.as_str().unwrap()).unwrap()
        };
        let before: Vec<_> = [0.5, 1.5].iter().map(|&t| sample(&engine, t)).collect();

        engine.add_keyframe(track, 1.0, None, Some(Easing::Linear)).unwrap();
        assert_eq!(
            engine.interpolate_value(track, 1.0).unwrap(),
            KeyframeValue::Color("rgb(128, 128, 128)".into())
        );

        for (&time, expected) in [0.5, 1.5].iter().zip(&before) {
            let actual = sample(&engine, time);
            for (a, b) in [(actual.r, expected.r), (actual.g, expected.g), (actual.b, expected.b)] {
                assert!(a.abs_diff(b) <= 1, "t={time}: {actual:?} vs {expected:?}");
            }
        }
    }

    #[test]
    fn test_rejects_unusable_tolerances() {
        for (time, redundancy) in [
            (0.0, 0.001),
            (-0.01, 0.001),
            (f64::NAN, 0.001),
            (f64::INFINITY, 0.001),
            (0.01, -0.1),
            (0.01, f64::NAN),
        ] {
            let config = KeyframeConfig {
                time_tolerance: time,
                redundancy_tolerance: redundancy,
            };
            assert!(matches!(
                KeyframeEngine::with_config(config),
                Err(AnimationError::Validation(_))
            ));
            assert!(KeyframeConfig::new(time, redundancy).is_err());
        }
        assert!(KeyframeConfig::new(0.01, 0.0).is_ok());
    }

    #[test]
    fn test_config_deserialization_validates() {
        let parsed: KeyframeConfig = serde_json::from_str(r#"{"timeTolerance": 0.05}"#).unwrap();
        assert_eq!(parsed.time_tolerance, 0.05);
        assert_eq!(parsed.redundancy_tolerance, 0.001);

        assert!(serde_json::from_str::<KeyframeConfig>(r#"{"timeTolerance": 0.0}"#).is_err());
        assert!(serde_json::from_str::<KeyframeConfig>(r#"{"redundancyTolerance": -1.0}"#).is_err());
    }

    #[test]
    fn test_repeated_add_never_duplicates() {
        let mut engine = KeyframeEngine::with_config(KeyframeConfig::new(1e-6, 0.001).unwrap()).unwrap();
        let track = engine
            .create_track("x", PropertyType::Number, KeyframeValue::Number(0.0), None)
            .unwrap();
        let first = engine.add_keyframe(track, 1.0, Some(KeyframeValue::Number(2.0)), None).unwrap();
        let second = engine.add_keyframe(track, 1.0, Some(KeyframeValue::Number(2.0)), None).unwrap();
        assert_eq!(first, second);
        assert_eq!(times(&engine, track), vec![1.0]);
        assert!(engine.track(track).unwrap().is_strictly_sorted());
    }
}
