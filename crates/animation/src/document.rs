/// Animation document: the host-persisted form of a set of animation tracks.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
    AnimationError, AnimationTrack, AnimationTrackId, Easing, Interpolation, Keyframe,
    KeyframeValue, PropertyType, Result, DEFAULT_TRACK_COLOR,
};

pub const ANIMATION_DOCUMENT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub tracks: Vec<TrackDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDocument {
    pub property: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub keyframes: Vec<KeyframeDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeDocument {
    pub time: f64,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<Easing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpolation: Option<Interpolation>,
}

impl AnimationDocument {
    pub fn from_tracks(tracks: &[AnimationTrack]) -> Self {
        Self {
            version: Some(ANIMATION_DOCUMENT_VERSION.to_string()),
            tracks: tracks.iter().map(TrackDocument::from_track).collect(),
        }
    }

    /// Build runtime tracks with fresh ids. Any keyframe or default whose
    /// value does not fit the declared type fails the whole document.
    pub fn into_tracks(self) -> Result<Vec<AnimationTrack>> {
        self.tracks.into_iter().map(TrackDocument::into_track).collect()
    }
}

impl TrackDocument {
    fn from_track(track: &AnimationTrack) -> Self {
        Self {
            property: track.property.clone(),
            property_type: track.property_type,
            keyframes: track
                .keyframes
                .iter()
                .map(|keyframe| KeyframeDocument {
                    time: keyframe.time,
                    value: keyframe.value.to_json(),
                    easing: Some(keyframe.easing),
                    interpolation: Some(keyframe.interpolation),
                })
                .collect(),
            default_value: Some(track.default_value.to_json()),
            enabled: Some(track.enabled),
            color: Some(track.color.clone()),
        }
    }

    fn into_track(self) -> Result<AnimationTrack> {
        let property_type = self.property_type;
        let property = self.property;
        let read = |value: &Value, what: &str| {
            KeyframeValue::from_json(property_type, value).ok_or_else(|| {
                AnimationError::Validation(format!(
                    "{what} of {property} is not a {property_type} value"
                ))
            })
        };

        let mut keyframes = self
            .keyframes
            .iter()
            .map(|keyframe| -> Result<Keyframe> {
                let value = read(&keyframe.value, &format!("keyframe at {}s", keyframe.time))?;
                Ok(Keyframe::new(keyframe.time, value)
                    .with_easing(keyframe.easing.unwrap_or_default())
                    .with_interpolation(keyframe.interpolation.unwrap_or_default()))
            })
            .collect::<Result<Vec<_>>>()?;
        let default_value = match &self.default_value {
            Some(value) => read(value, "default value")?,
            None => keyframes
                .first()
                .map(|keyframe| keyframe.value.clone())
                .unwrap_or_else(|| property_type.default_value()),
        };
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));

        Ok(AnimationTrack {
            id: AnimationTrackId::new(),
            property,
            property_type,
            keyframes,
            default_value,
            enabled: self.enabled.unwrap_or(true),
            color: self
                .color
                .unwrap_or_else(|| DEFAULT_TRACK_COLOR.to_string()),
        })
    }
}

pub fn export_animation(tracks: &[AnimationTrack]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&AnimationDocument::from_tracks(tracks))?)
}

pub fn try_import_animation(json: &str) -> Result<Vec<AnimationTrack>> {
    let document: AnimationDocument = serde_json::from_str(json)
        .map_err(|err| AnimationError::Validation(err.to_string()))?;
    document.into_tracks()
}

/// Import that never fails: malformed input yields no tracks at all.
pub fn import_animation(json: &str) -> Vec<AnimationTrack> {
    try_import_animation(json).unwrap_or_else(|err| {
        warn!("Failed to import animation: {}", err);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn test_export_then_import_keeps_keyframes() {
        let mut opacity =
            AnimationTrack::new("opacity", PropertyType::Opacity, KeyframeValue::Number(1.0)).unwrap();
        opacity.keyframes = vec![
            Keyframe::new(0.0, KeyframeValue::Number(0.0)).with_easing(Easing::Linear),
            Keyframe::new(1.25, KeyframeValue::Number(1.0))
                .with_interpolation(Interpolation::Discrete),
        ];
        let mut position = AnimationTrack::new(
            "position",
            PropertyType::Position,
            KeyframeValue::Position(Position::default()),
        )
        .unwrap()
        .with_color("#ff0000");
        position.keyframes = vec![Keyframe::new(
            2.0,
            KeyframeValue::Position(Position::new(10.0, -4.5)),
        )
        .with_easing(Easing::Spring)];
        position.enabled = false;

        let json = export_animation(&[opacity.clone(), position.clone()]).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["tracks"][0]["type"], "opacity");
        assert_eq!(value["tracks"][1]["keyframes"][0]["easing"], "spring");

        let imported = try_import_animation(&json).unwrap();
        assert_eq!(imported.len(), 2);
        for (original, restored) in [opacity, position].iter().zip(&imported) {
            assert_eq!(restored.property, original.property);
            assert_eq!(restored.property_type, original.property_type);
            assert_eq!(restored.enabled, original.enabled);
            assert_eq!(restored.color, original.color);
            assert_eq!(restored.keyframes.len(), original.keyframes.len());
            for (a, b) in original.keyframes.iter().zip(&restored.keyframes) {
                assert_eq!((a.time, &a.value, a.easing, a.interpolation), (b.time, &b.value, b.easing, b.interpolation));
            }
        }
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let json = r##"{
            "tracks": [{
                "property": "fill",
                "type": "color",
                "keyframes": [{"time": 0.5, "value": "#00ff00"}, {"time": 0.1, "value": "#000000"}]
            }]
        }"##;
        let tracks = try_import_animation(json).unwrap();
        let track = &tracks[0];

        assert_eq!(track.keyframes[0].time, 0.1);
        assert_eq!(track.keyframes[1].easing, Easing::EaseOut);
        assert_eq!(track.keyframes[1].interpolation, Interpolation::Bezier);
        // Falls back to the first keyframe as written, not the earliest.
        assert_eq!(track.default_value, KeyframeValue::Color("#00ff00".into()));
        assert!(track.enabled);
        assert_eq!(track.color, DEFAULT_TRACK_COLOR);
    }

    #[test]
    fn test_empty_track_defaults_by_type() {
        let json = r#"{"tracks": [{"property": "s", "type": "scale", "keyframes": []}]}"#;
        let tracks = try_import_animation(json).unwrap();
        assert_eq!(tracks[0].default_value, KeyframeValue::Number(1.0));
    }

    #[test]
    fn test_malformed_documents_import_as_empty() {
        let cases = [
            "not json",
            r#"{"tracks": {}}"#,
            r#"{"tracks": [{"property": 3, "type": "number", "keyframes": []}]}"#,
            r#"{"tracks": [{"property": "x", "type": "number"}]}"#,
            r#"{"tracks": [{"property": "x", "type": "number", "keyframes": [{"time": "0"}]}]}"#,
            r#"{"tracks": [{"property": "x", "type": "number", "keyframes": [{"time": 0, "value": "red"}]}]}"#,
            r#"{"tracks": [{"property": "x", "type": "wobble", "keyframes": []}]}"#,
        ];
        for json in cases {
            assert!(
                matches!(try_import_animation(json), Err(AnimationError::Validation(_))),
                "{json}"
            );
            assert!(import_animation(json).is_empty(), "{json}");
        }
    }

    #[test]
    fn test_one_bad_track_discards_all() {
        let json = r#"{"tracks": [
            {"property": "a", "type": "number", "keyframes": [{"time": 0, "value": 1}]},
            {"property": "b", "type": "position", "keyframes": [{"time": 0, "value": 1}]}
        ]}"#;
        assert!(import_animation(json).is_empty());
    }
}
