//! The small amount of signal processing the stitcher needs.
//!
//! - [`resample`] converts backend output to the canonical rate (sinc, high quality).
//! - [`pitch_shift`] lowers or raises pitch without changing duration: a fast
//!   polynomial resample by `2^(-semitones/12)` followed by a WSOLA time-stretch
//!   back to the original length.
//! - [`trim_silence`] cuts quiet edges, frame-RMS based.

use rubato::{
    FastFixedIn, PolynomialDegree, Resampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};
use tracing::debug;

use crate::error::{Result, VoiceCloneError};

/// Frames fed to the resampler per `process` call.
const RESAMPLE_CHUNK: usize = 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Resampling
// ─────────────────────────────────────────────────────────────────────────────

/// Resample mono `samples` from `from_rate` to `to_rate`.
///
/// Output length is `round(len * to_rate / from_rate)`; the resampler's
/// group delay is removed.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        return Err(VoiceCloneError::Configuration(
            "sample rates must be greater than 0".into(),
        ));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| VoiceCloneError::AudioProcessing(format!("cannot create resampler: {e}")))?;

    let out = drive(&mut resampler, samples, ratio)?;
    debug!(from_rate, to_rate, input = samples.len(), output = out.len(), "resampled");
    Ok(out)
}

/// Cubic-polynomial resample by an arbitrary `ratio` (output/input length).
fn resample_by_ratio(samples: &[f32], ratio: f64) -> Result<Vec<f32>> {
    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, RESAMPLE_CHUNK, 1).map_err(
            |e| VoiceCloneError::AudioProcessing(format!("cannot create resampler: {e}")),
        )?;
    drive(&mut resampler, samples, ratio)
}

/// Push `samples` through `resampler` in zero-padded blocks until the expected
/// output plus the group delay has been produced, then strip the delay.
fn drive<R: Resampler<f32>>(resampler: &mut R, samples: &[f32], ratio: f64) -> Result<Vec<f32>> {
    let expected = (samples.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut pos = 0;
    while out.len() < expected + delay {
        let need = resampler.input_frames_next();
        let mut block = vec![0.0f32; need];
        if pos < samples.len() {
            let end = (pos + need).min(samples.len());
            block[..end - pos].copy_from_slice(&samples[pos..end]);
        }
        pos += need;

        let produced = resampler
            .process(&[block], None)
            .map_err(|e| VoiceCloneError::AudioProcessing(format!("resampling failed: {e}")))?;
        out.extend_from_slice(&produced[0]);
    }

    out.drain(..delay.min(out.len()));
    out.truncate(expected);
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Pitch shift (resample + WSOLA)
// ─────────────────────────────────────────────────────────────────────────────

/// Shift pitch by `semitones` while keeping `samples.len()` unchanged.
///
/// Negative values deepen the voice.  Input shorter than one WSOLA frame, or a
/// shift below a thousandth of a semitone, is returned as-is.
pub fn pitch_shift(samples: &[f32], sample_rate: u32, semitones: f32) -> Result<Vec<f32>> {
    let wsola = Wsola::for_rate(sample_rate);
    if semitones.abs() < 1e-3 || samples.len() < wsola.frame {
        return Ok(samples.to_vec());
    }

    // Lowering pitch: stretch the signal longer, then compress time back.
    let factor = 2f64.powf(-(semitones as f64) / 12.0);
    let resampled = resample_by_ratio(samples, factor)?;
    let shifted = wsola.stretch(&resampled, samples.len());

    debug!(semitones, factor, samples = samples.len(), "pitch shifted");
    Ok(shifted)
}

/// Waveform-similarity overlap-add parameters.
struct Wsola {
    frame: usize,
    hop: usize,
    tolerance: usize,
}

impl Wsola {
    /// 50 ms Hann frames with 50 % overlap.
    fn for_rate(sample_rate: u32) -> Self {
        let frame = ((sample_rate as usize / 20).max(64)) & !1;
        Self { frame, hop: frame / 2, tolerance: frame / 4 }
    }

    fn window(&self) -> Vec<f32> {
        (0..self.frame)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / self.frame as f32;
                0.5 - 0.5 * x.cos()
            })
            .collect()
    }

    fn stretch(&self, samples: &[f32], target_len: usize) -> Vec<f32> {
        if target_len == 0 || samples.is_empty() {
            return vec![0.0; target_len];
        }

        // Zero tail so every frame read and every search candidate is in bounds.
        let mut input = samples.to_vec();
        input.resize(samples.len() + self.frame + 2 * self.tolerance + self.hop, 0.0);
        let max_start = input.len() - self.frame - self.hop;

        let window = self.window();
        let analysis_hop = self.hop as f64 * samples.len() as f64 / target_len as f64;

        let mut out = vec![0.0f32; target_len + self.frame];
        let mut norm = vec![0.0f32; target_len + self.frame];

        let mut prev: Option<usize> = None;
        let mut k = 0usize;
        while k * self.hop < target_len {
            let nominal = ((k as f64 * analysis_hop).round() as usize).min(max_start);
            let start = match prev {
                None => nominal,
                Some(p) => self.best_offset(&input, p + self.hop, nominal, max_start),
            };

            let at = k * self.hop;
            for i in 0..self.frame {
                out[at + i] += input[start + i] * window[i];
                norm[at + i] += window[i];
            }
            prev = Some(start);
            k += 1;
        }

        out.truncate(target_len);
        for (s, w) in out.iter_mut().zip(&norm) {
            if *w > 1e-3 {
                *s /= w;
            }
        }
        out
    }

    /// Candidate start near `nominal` whose first half best matches the natural
    /// continuation of the previous frame.
    fn best_offset(&self, input: &[f32], natural: usize, nominal: usize, max_start: usize) -> usize {
        let natural = natural.min(max_start);
        let lo = nominal.saturating_sub(self.tolerance);
        let hi = (nominal + self.tolerance).min(max_start);

        let mut best = nominal.min(max_start);
        let mut best_score = f32::NEG_INFINITY;
        for cand in lo..=hi {
            let mut score = 0.0f32;
            let mut i = 0;
            while i < self.hop {
                score += input[cand + i] * input[natural + i];
                i += 4;
            }
            if score > best_score {
                best_score = score;
                best = cand;
            }
        }
        best
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Silence trimming
// ─────────────────────────────────────────────────────────────────────────────

const TRIM_FRAME: usize = 2048;
const TRIM_HOP: usize = 512;

/// Remove leading and trailing frames quieter than `top_db` below the loudest frame.
///
/// All-silent input trims to empty.
pub fn trim_silence(samples: &[f32], top_db: f32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let n_frames = if samples.len() <= TRIM_FRAME {
        1
    } else {
        1 + (samples.len() - TRIM_FRAME).div_ceil(TRIM_HOP)
    };
    let rms: Vec<f32> = (0..n_frames)
        .map(|f| {
            let start = f * TRIM_HOP;
            let end = (start + TRIM_FRAME).min(samples.len());
            let frame = &samples[start..end];
            (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
        })
        .collect();

    let loudest = rms.iter().cloned().fold(0.0f32, f32::max);
    if loudest <= 0.0 {
        return Vec::new();
    }
    let threshold = loudest * 10f32.powf(-top_db / 20.0);
    let loud = |r: &f32| *r > threshold;

    let (Some(first), Some(last)) = (rms.iter().position(loud), rms.iter().rposition(loud)) else {
        return Vec::new();
    };
    let start = first * TRIM_HOP;
    let end = (last * TRIM_HOP + TRIM_FRAME).min(samples.len());
    samples[start..end].to_vec()
}
