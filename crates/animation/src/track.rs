use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{AnimationError, Easing, Interpolation, KeyframeValue, PropertyType, Result};

pub const DEFAULT_TRACK_COLOR: &str = "#3b82f6";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AnimationTrackId(pub Uuid);

impl AnimationTrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnimationTrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnimationTrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct KeyframeId(pub Uuid);

impl KeyframeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KeyframeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KeyframeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub id: KeyframeId,
    /// Seconds on the animation's time axis.
    pub time: f64,
    pub value: KeyframeValue,
    /// Curve applied on the way to the next keyframe.
    pub easing: Easing,
    pub interpolation: Interpolation,
    pub selected: bool,
    pub locked: bool,
}

impl Keyframe {
    pub fn new(time: f64, value: KeyframeValue) -> Self {
        Self {
            id: KeyframeId::new(),
            time,
            value,
            easing: Easing::default(),
            interpolation: Interpolation::default(),
            selected: false,
            locked: false,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}

/// Keyframes of one animated property, kept sorted by time.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTrack {
    pub id: AnimationTrackId,
    pub property: String,
    pub property_type: PropertyType,
    pub keyframes: Vec<Keyframe>,
    pub default_value: KeyframeValue,
    pub enabled: bool,
    /// Display color in the editor's keyframe lane.
    pub color: String,
}

impl AnimationTrack {
    pub fn new(
        property: impl Into<String>,
        property_type: PropertyType,
        default_value: KeyframeValue,
    ) -> Result<Self> {
        let property = property.into();
        if !default_value.matches(property_type) {
            return Err(AnimationError::TypeMismatch {
                property,
                expected: property_type,
            });
        }
        Ok(Self {
            id: AnimationTrackId::new(),
            property,
            property_type,
            keyframes: Vec::new(),
            default_value,
            enabled: true,
            color: DEFAULT_TRACK_COLOR.to_string(),
        })
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn keyframe(&self, id: KeyframeId) -> Option<&Keyframe> {
        self.keyframes.iter().find(|keyframe| keyframe.id == id)
    }

    pub fn keyframe_mut(&mut self, id: KeyframeId) -> Option<&mut Keyframe> {
        self.keyframes.iter_mut().find(|keyframe| keyframe.id == id)
    }

    /// Index of the first keyframe within `tolerance` of `time`.
    pub fn position_near(&self, time: f64, tolerance: f64) -> Option<usize> {
        self.keyframes
            .iter()
            .position(|keyframe| (keyframe.time - time).abs() < tolerance)
    }

    pub fn sort_keyframes(&mut self) {
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    pub fn ensure_value(&self, value: &KeyframeValue) -> Result<()> {
        if value.matches(self.property_type) {
            Ok(())
        } else {
            Err(AnimationError::TypeMismatch {
                property: self.property.clone(),
                expected: self.property_type,
            })
        }
    }

    /// Value of the property at `time`.
    ///
    /// Before the first keyframe the first value holds, after the last the
    /// last value holds. Between two keyframes the earlier one's easing
    /// reshapes the progress and its interpolation decides how the values
    /// combine.
    pub fn value_at(&self, time: f64) -> KeyframeValue {
        let (first, last) = match (self.keyframes.first(), self.keyframes.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return self.default_value.clone(),
        };

        if time <= first.time {
            return first.value.clone();
        }
        if time >= last.time {
            return last.value.clone();
        }

        let Some(pair) = self
            .keyframes
            .windows(2)
            .find(|pair| pair[0].time <= time && time <= pair[1].time)
        else {
            return last.value.clone();
        };
        let (before, after) = (&pair[0], &pair[1]);

        let span = after.time - before.time;
        let progress = if span == 0.0 {
            0.0
        } else {
            (time - before.time) / span
        };
        let eased = before.easing.apply(progress);

        KeyframeValue::blend(
            self.property_type,
            &before.value,
            &after.value,
            eased,
            before.interpolation,
        )
    }

    /// True when keyframe times strictly increase.
    pub fn is_strictly_sorted(&self) -> bool {
        self.keyframes
            .windows(2)
            .all(|pair| pair[0].time < pair[1].time)
    }
}
