use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Seconds;

/// Magnetic editing behaviour for one editing session.
///
/// The engine never changes these values on its own; they only move through
/// the toggles and [`ConfigUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RippleConfig {
    /// Push following clips instead of rejecting an overlapping placement.
    pub auto_ripple: bool,
    /// Pull following clips left into the space a clip leaves behind.
    pub gap_closing: bool,
    /// Offer detected beats as snap targets.
    pub snap_to_beat: bool,
    /// Snap distance in milliseconds.
    pub snap_threshold: u32,
    /// Stagger between animated shifts in milliseconds. Presentation only.
    pub ripple_delay: u32,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            auto_ripple: true,
            gap_closing: false,
            snap_to_beat: false,
            snap_threshold: 50,
            ripple_delay: 100,
        }
    }
}

impl RippleConfig {
    pub fn snap_threshold_seconds(&self) -> Seconds {
        self.snap_threshold as Seconds / 1000.0
    }

    pub fn ripple_delay_duration(&self) -> Duration {
        Duration::from_millis(self.ripple_delay as u64)
    }
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    pub auto_ripple: Option<bool>,
    pub gap_closing: Option<bool>,
    pub snap_to_beat: Option<bool>,
    pub snap_threshold: Option<u32>,
    pub ripple_delay: Option<u32>,
}

impl ConfigUpdate {
    pub fn apply(&self, config: &mut RippleConfig) {
        if let Some(value) = self.auto_ripple {
            config.auto_ripple = value;
        }
        if let Some(value) = self.gap_closing {
            config.gap_closing = value;
        }
        if let Some(value) = self.snap_to_beat {
            config.snap_to_beat = value;
        }
        if let Some(value) = self.snap_threshold {
            config.snap_threshold = value;
        }
        if let Some(value) = self.ripple_delay {
            config.ripple_delay = value;
        }
    }
}
