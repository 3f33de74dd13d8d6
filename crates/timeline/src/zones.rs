/// Magnetic zones: editor-placed ranges whose edges attract dragged clips.
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Seconds, TimelineError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ZoneId(pub Uuid);

impl ZoneId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagneticZone {
    pub id: ZoneId,
    pub start: Seconds,
    pub end: Seconds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MagneticZone {
    pub fn new(start: Seconds, end: Seconds) -> Result<Self, TimelineError> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end < start {
            return Err(TimelineError::InvalidOp(format!(
                "magnetic zone range {start}..{end} is not valid"
            )));
        }
        Ok(Self {
            id: ZoneId::new(),
            start,
            end,
            label: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn duration(&self) -> Seconds {
        self.end - self.start
    }

    pub fn contains(&self, time: Seconds) -> bool {
        time >= self.start && time <= self.end
    }
}

/// Zones of one timeline, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneCollection {
    zones: Vec<MagneticZone>,
}

impl ZoneCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_zones(zones: Vec<MagneticZone>) -> Self {
        Self { zones }
    }

    pub fn add(&mut self, zone: MagneticZone) -> ZoneId {
        let id = zone.id;
        self.zones.push(zone);
        id
    }

    pub fn remove(&mut self, id: ZoneId) -> Option<MagneticZone> {
        let index = self.zones.iter().position(|zone| zone.id == id)?;
        Some(self.zones.remove(index))
    }

    pub fn get(&self, id: ZoneId) -> Option<&MagneticZone> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MagneticZone> {
        self.zones.iter()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Both edges of every zone, unsorted.
    pub fn boundaries(&self) -> impl Iterator<Item = Seconds> + '_ {
        self.zones.iter().flat_map(|zone| [zone.start, zone.end])
    }

    pub fn zones_at(&self, time: Seconds) -> Vec<&MagneticZone> {
        self.zones.iter().filter(|zone| zone.contains(time)).collect()
    }

    pub fn to_vec(&self) -> Vec<MagneticZone> {
        self.zones.clone()
    }
}
