use std::{cmp::Ordering, f32::consts::PI, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{AudioBuffer, Beat, BeatAnalysis, BeatAnalyzerConfig, BeatError, BeatIntensity, Result};

/// Runs spectral-flux onset detection over the whole buffer.
///
/// This is the synchronous core of [`crate::BeatAnalyzer::detect_beats`]; it
/// is CPU bound and should not run on an interactive thread.
pub fn analyze(buffer: &AudioBuffer, config: &BeatAnalyzerConfig) -> Result<BeatAnalysis> {
    validate(buffer, config)?;

    let sample_rate = buffer.sample_rate as f64;
    let mut mono = downmix(&buffer.samples, buffer.channels as usize);
    let duration_seconds = mono.len() as f64 / sample_rate;
    if mono.len() < config.frame_size {
        mono.resize(config.frame_size, 0.0);
    }

    let envelope = onset_envelope(&mono, config)?;
    let peak = envelope
        .iter()
        .map(|frame| frame.flux)
        .fold(0.0_f32, f32::max);

    if peak <= f32::EPSILON {
        return Ok(BeatAnalysis {
            beats: Vec::new(),
            tempo_bpm: None,
            duration_seconds,
        });
    }

    let strength: Vec<f32> = envelope.iter().map(|frame| frame.flux / peak).collect();
    let onsets = pick_peaks(&strength, config, config.hop_size as f64 / sample_rate);

    let energies: Vec<f32> = onsets.iter().map(|&index| envelope[index].energy).collect();
    let intensities = classify_intensity(&energies);

    let beats: Vec<Beat> = onsets
        .iter()
        .zip(intensities)
        .map(|(&index, intensity)| Beat {
            time: (index * config.hop_size) as f64 / sample_rate,
            intensity,
            confidence: strength[index].clamp(0.0, 1.0),
        })
        .collect();

    let tempo_bpm = estimate_tempo(&beats);

    Ok(BeatAnalysis {
        beats,
        tempo_bpm,
        duration_seconds,
    })
}

fn validate(buffer: &AudioBuffer, config: &BeatAnalyzerConfig) -> Result<()> {
    if buffer.sample_rate == 0 {
        return Err(BeatError::AnalysisFailure("sample rate must be positive".into()));
    }
    if buffer.channels == 0 {
        return Err(BeatError::AnalysisFailure("buffer has no channels".into()));
    }
    if buffer.samples.is_empty() {
        return Err(BeatError::AnalysisFailure("buffer contains no samples".into()));
    }
    if buffer.samples.iter().any(|sample| !sample.is_finite()) {
        return Err(BeatError::AnalysisFailure(
            "buffer contains non-finite samples".into(),
        ));
    }
    if config.frame_size < 2 || config.hop_size == 0 {
        return Err(BeatError::AnalysisFailure(format!(
            "invalid analysis window {}/{}",
            config.frame_size, config.hop_size
        )));
    }
    Ok(())
}

fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct EnvelopeFrame {
    flux: f32,
    energy: f32,
}

fn onset_envelope(mono: &[f32], config: &BeatAnalyzerConfig) -> Result<Vec<EnvelopeFrame>> {
    let size = config.frame_size;
    let mut planner = RealFftPlanner::<f32>::new();
    let plan: Arc<dyn RealToComplex<f32>> = planner.plan_fft_forward(size);
    let mut input = plan.make_input_vec();
    let mut spectrum: Vec<Complex32> = plan.make_output_vec();
    let mut scratch = plan.make_scratch_vec();
    let window: Vec<f32> = (0..size).map(|index| hann_value(index, size)).collect();

    let mut previous = vec![0.0_f32; spectrum.len()];
    let mut frames = Vec::with_capacity(mono.len() / config.hop_size + 1);

    let mut start = 0;
    while start + size <= mono.len() {
        let block = &mono[start..start + size];
        for ((slot, sample), weight) in input.iter_mut().zip(block).zip(&window) {
            *slot = sample * weight;
        }

        plan.process_with_scratch(&mut input, &mut spectrum, &mut scratch)
            .map_err(|err| BeatError::AnalysisFailure(format!("fft failed: {err}")))?;

        // The first frame only seeds the reference spectrum.
        let seeded = !frames.is_empty();
        let mut flux = 0.0;
        for (bin, last) in spectrum.iter().zip(previous.iter_mut()) {
            let magnitude = bin.norm();
            if seeded {
                flux += (magnitude - *last).max(0.0);
            }
            *last = magnitude;
        }

        frames.push(EnvelopeFrame {
            flux,
            energy: compute_rms(block),
        });
        start += config.hop_size;
    }

    Ok(frames)
}

fn pick_peaks(strength: &[f32], config: &BeatAnalyzerConfig, seconds_per_frame: f64) -> Vec<usize> {
    let mut onsets: Vec<usize> = Vec::new();

    for (index, &value) in strength.iter().enumerate() {
        let left = if index == 0 { 0.0 } else { strength[index - 1] };
        let right = strength.get(index + 1).copied().unwrap_or(0.0);
        if value <= left || value < right {
            continue;
        }

        let lo = index.saturating_sub(config.threshold_window);
        let hi = (index + config.threshold_window + 1).min(strength.len());
        let local = &strength[lo..hi];
        let mean = local.iter().sum::<f32>() / local.len() as f32;
        if value <= mean * config.threshold_multiplier + config.threshold_offset {
            continue;
        }

        match onsets.last_mut() {
            Some(last)
                if (index - *last) as f64 * seconds_per_frame < config.min_beat_interval =>
            {
                if value > strength[*last] {
                    *last = index;
                }
            }
            _ => onsets.push(index),
        }
    }

    onsets
}

/// Ranks onsets by energy: the top quartile is high, the next quartile medium,
/// the remaining half low. The strongest onset is always high.
fn classify_intensity(energies: &[f32]) -> Vec<BeatIntensity> {
    let count = energies.len();
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_by(|&a, &b| {
        energies[a]
            .partial_cmp(&energies[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut intensities = vec![BeatIntensity::Low; count];
    for (rank, &index) in order.iter().enumerate() {
        let percentile = if count == 1 {
            1.0
        } else {
            rank as f32 / (count - 1) as f32
        };
        intensities[index] = if percentile >= 0.75 {
            BeatIntensity::High
        } else if percentile >= 0.5 {
            BeatIntensity::Medium
        } else {
            BeatIntensity::Low
        };
    }
    intensities
}

fn estimate_tempo(beats: &[Beat]) -> Option<f32> {
    let mut intervals: Vec<f64> = beats
        .windows(2)
        .map(|pair| pair[1].time - pair[0].time)
        .filter(|interval| *interval > f64::EPSILON)
        .collect();
    if intervals.is_empty() {
        return None;
    }
    intervals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let median = intervals[intervals.len() / 2];
    Some((60.0 / median) as f32)
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}
