use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{analyze, AudioBuffer, Beat, BeatAnalysis, BeatAnalyzerConfig, BeatError, ConcurrencyPolicy, Result};

/// Single-flight beat detector.
///
/// Cloning is cheap and every clone shares the in-progress flag and the last
/// successful result, so a host can hand a clone to a background task while
/// the editor keeps querying [`BeatAnalyzer::beats`].
#[derive(Debug, Clone)]
pub struct BeatAnalyzer {
    config: BeatAnalyzerConfig,
    in_progress: Arc<AtomicBool>,
    gate: Arc<Mutex<()>>,
    latest: Arc<RwLock<Option<BeatAnalysis>>>,
}

impl Default for BeatAnalyzer {
    fn default() -> Self {
        Self::new(BeatAnalyzerConfig::default())
    }
}

impl BeatAnalyzer {
    pub fn new(config: BeatAnalyzerConfig) -> Self {
        Self {
            config,
            in_progress: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(Mutex::new(())),
            latest: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config(&self) -> &BeatAnalyzerConfig {
        &self.config
    }

    pub fn is_analyzing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Beats from the most recent successful run, empty if none succeeded yet.
    pub fn beats(&self) -> Vec<Beat> {
        self.latest
            .read()
            .as_ref()
            .map(|analysis| analysis.beats.clone())
            .unwrap_or_default()
    }

    pub fn latest(&self) -> Option<BeatAnalysis> {
        self.latest.read().clone()
    }

    /// Analyse `audio` on a blocking worker and replace the stored beat set.
    ///
    /// With [`ConcurrencyPolicy::Reject`] a call made while another run is
    /// active fails with [`BeatError::Busy`]; with [`ConcurrencyPolicy::Queue`]
    /// it waits for the active run. A failed run leaves the previous beat set
    /// in place.
    ///
    /// The worker owns the in-progress flag, so dropping this future before it
    /// resolves keeps the analyzer busy until the worker actually stops.
    pub async fn detect_beats(&self, audio: AudioBuffer) -> Result<BeatAnalysis> {
        let queued = match self.config.policy {
            ConcurrencyPolicy::Reject => None,
            ConcurrencyPolicy::Queue => Some(self.gate.clone().lock_owned().await),
        };
        let flight = InFlight::acquire(&self.in_progress).ok_or(BeatError::Busy)?;

        debug!(
            samples = audio.samples.len(),
            sample_rate = audio.sample_rate,
            channels = audio.channels,
            "starting beat analysis"
        );

        let config = self.config.clone();
        let latest = self.latest.clone();
        let outcome = tokio::task::spawn_blocking(move || -> Result<BeatAnalysis> {
            let _held = (queued, flight);
            let analysis = analyze(&audio, &config)?;
            *latest.write() = Some(analysis.clone());
            Ok(analysis)
        })
        .await
        .map_err(|err| BeatError::AnalysisFailure(format!("analysis worker stopped: {err}")))
        .and_then(|result| result);

        match &outcome {
            Ok(analysis) => info!(
                beats = analysis.beats.len(),
                tempo_bpm = ?analysis.tempo_bpm,
                "beat analysis finished"
            ),
            Err(err) => warn!("beat analysis failed: {err}"),
        }
        outcome
    }
}

/// Holds the in-progress flag for one run and clears it on every exit path.
struct InFlight {
    flag: Arc<AtomicBool>,
}

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
