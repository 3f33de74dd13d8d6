/// Offline beat detection for magnetic beat snapping.
///
/// Decoded audio is handed in by the host as an [`AudioBuffer`]; the
/// [`BeatAnalyzer`] runs onset analysis on a blocking worker and keeps the
/// most recent successful [`BeatAnalysis`] around for the timeline.
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod onset;
pub use onset::*;

mod analyzer;
pub use analyzer::*;

#[derive(Debug, Error)]
pub enum BeatError {
    #[error("beat analysis already in progress")]
    Busy,
    #[error("beat analysis failed: {0}")]
    AnalysisFailure(String),
}

pub type Result<T> = std::result::Result<T, BeatError>;

/// Loudness class of a detected onset, relative to the other onsets of the
/// same run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatIntensity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    /// Seconds from the start of the analysed source.
    pub time: f64,
    pub intensity: BeatIntensity,
    /// Onset strength normalised against the strongest onset, in `[0, 1]`.
    pub confidence: f32,
}

/// Raw decoded samples supplied by the host. Multi-channel audio is
/// interleaved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_channels() -> u16 {
    1
}

impl AudioBuffer {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        let frames = self.samples.len() / self.channels as usize;
        frames as f64 / self.sample_rate as f64
    }
}

/// What the analyzer does with a request that arrives while another run is
/// still active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Fail the second request with [`BeatError::Busy`].
    #[default]
    Reject,
    /// Wait for the active run to finish, then analyse.
    Queue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatAnalyzerConfig {
    /// FFT window length in samples.
    pub frame_size: usize,
    /// Distance between consecutive windows in samples.
    pub hop_size: usize,
    /// Number of envelope frames on each side used for the adaptive threshold.
    pub threshold_window: usize,
    pub threshold_multiplier: f32,
    /// Added to the adaptive threshold, in normalised onset-strength units.
    pub threshold_offset: f32,
    /// Onsets closer than this collapse into the stronger one.
    pub min_beat_interval: f64,
    pub policy: ConcurrencyPolicy,
}

impl Default for BeatAnalyzerConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            hop_size: 512,
            threshold_window: 8,
            threshold_multiplier: 1.5,
            threshold_offset: 0.05,
            min_beat_interval: 0.2,
            policy: ConcurrencyPolicy::Reject,
        }
    }
}

/// Result of one detection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatAnalysis {
    pub beats: Vec<Beat>,
    pub tempo_bpm: Option<f32>,
    pub duration_seconds: f64,
}

impl BeatAnalysis {
    pub fn beat_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.beats.iter().map(|beat| beat.time)
    }
}
