//! Merging per-chunk waveforms into one utterance.
//!
//! Each segment is peak-normalised with headroom, separated from the next by
//! a fixed pause, and the whole signal is normalised once more before the
//! pitch post-effect.

use serde::Deserialize;
use tracing::debug;

use crate::audio::{peak, SAMPLE_RATE};
use crate::dsp;
use crate::error::{Result, VoiceCloneError};

/// Downward pitch shift applied to the stitched signal.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PitchShift {
    pub enabled: bool,
    pub semitones: f32,
}

impl Default for PitchShift {
    fn default() -> Self {
        Self { enabled: true, semitones: -1.2 }
    }
}

impl PitchShift {
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct StitchOptions {
    /// Silence between consecutive segments, seconds.
    pub pause_seconds: f32,
    pub sample_rate: u32,
    /// Peak level after normalisation, in `(0, 1]`.
    pub headroom: f32,
    pub pitch_shift: PitchShift,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            pause_seconds: 0.2,
            sample_rate: SAMPLE_RATE,
            headroom: 0.95,
            pitch_shift: PitchShift::default(),
        }
    }
}

impl StitchOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.headroom > 0.0 && self.headroom <= 1.0) {
            return Err(VoiceCloneError::Configuration(format!(
                "headroom must be in (0, 1], got {}",
                self.headroom
            )));
        }
        if !(self.pause_seconds >= 0.0 && self.pause_seconds.is_finite()) {
            return Err(VoiceCloneError::Configuration(format!(
                "pause_seconds must be non-negative, got {}",
                self.pause_seconds
            )));
        }
        if self.sample_rate == 0 {
            return Err(VoiceCloneError::Configuration("sample_rate must be positive".into()));
        }
        if !self.pitch_shift.semitones.is_finite() {
            return Err(VoiceCloneError::Configuration("pitch shift must be finite".into()));
        }
        Ok(())
    }

    /// Pause length in samples.
    pub fn pause_samples(&self) -> usize {
        (self.pause_seconds as f64 * self.sample_rate as f64).round() as usize
    }
}

/// Scale `samples` so the largest magnitude is 1.0.  Silent input is returned unchanged.
pub fn normalize_segment(samples: &[f32]) -> Vec<f32> {
    scale_to_peak(samples, 1.0)
}

fn scale_to_peak(samples: &[f32], target: f32) -> Vec<f32> {
    let p = peak(samples);
    if p <= 0.0 {
        return samples.to_vec();
    }
    let gain = target / p;
    samples.iter().map(|s| s * gain).collect()
}

/// Stitches segments according to its [`StitchOptions`].
#[derive(Debug, Clone, Default)]
pub struct AudioStitcher {
    options: StitchOptions,
}

impl AudioStitcher {
    pub fn new(options: StitchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StitchOptions {
        &self.options
    }

    /// Normalise, separate with pauses and concatenate, then renormalise.
    /// No pitch effect.
    pub fn concatenate<S: AsRef<[f32]>>(&self, segments: &[S]) -> Vec<f32> {
        let headroom = self.options.headroom;
        let parts: Vec<&[f32]> = segments.iter().map(|s| s.as_ref()).filter(|s| !s.is_empty()).collect();

        // One segment: nothing to join.
        if let [only] = parts.as_slice() {
            return scale_to_peak(only, headroom);
        }

        let pause = self.options.pause_samples();
        let total = parts.iter().map(|s| s.len()).sum::<usize>() + pause * parts.len().saturating_sub(1);
        let mut out = Vec::with_capacity(total);
        for (i, segment) in parts.iter().enumerate() {
            out.extend(scale_to_peak(segment, headroom));
            if i + 1 < parts.len() {
                out.resize(out.len() + pause, 0.0);
            }
        }

        scale_to_peak(&out, headroom)
    }

    /// Full stitch: [`concatenate`](Self::concatenate), optional pitch shift, clip to `[-1, 1]`.
    pub fn stitch<S: AsRef<[f32]>>(&self, segments: &[S]) -> Result<Vec<f32>> {
        let mut audio = self.concatenate(segments);

        let shift = self.options.pitch_shift;
        if shift.enabled {
            audio = dsp::pitch_shift(&audio, self.options.sample_rate, shift.semitones)?;
        }
        for s in &mut audio {
            *s = s.clamp(-1.0, 1.0);
        }

        debug!(
            segments = segments.len(),
            samples = audio.len(),
            pitch_shift = ?shift.enabled.then_some(shift.semitones),
            "stitched audio"
        );
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_pitch() -> AudioStitcher {
        AudioStitcher::new(StitchOptions { pitch_shift: PitchShift::disabled(), ..Default::default() })
    }

    fn ramp(len: usize, amp: f32) -> Vec<f32> {
        (0..len).map(|i| amp * ((i % 50) as f32 / 25.0 - 1.0)).collect()
    }

    #[test]
    fn test_normalize_segment() {
        let out = normalize_segment(&[0.25, -0.5, 0.1]);
        assert_eq!(out, vec![0.5, -1.0, 0.2]);
        assert!(normalize_segment(&[]).is_empty());
        assert_eq!(normalize_segment(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_pause_samples() {
        assert_eq!(StitchOptions::default().pause_samples(), 4_410);
    }

    #[test]
    fn test_single_segment_passthrough() {
        let seg = ramp(1_000, 0.3);
        let out = no_pitch().stitch(&[seg.clone()]).unwrap();
        assert_eq!(out.len(), seg.len());
        assert!((peak(&out) - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_two_segments_with_pause() {
        let (a, b) = (ramp(3_000, 0.2), ramp(5_000, 0.9));
        let out = no_pitch().stitch(&[a, b]).unwrap();
        assert_eq!(out.len(), 3_000 + 4_410 + 5_000);
        assert!(out[3_000..7_410].iter().all(|&s| s == 0.0));
        assert!((peak(&out) - 0.95).abs() < 1e-6);
        // Both segments reach the same level regardless of input gain.
        assert!((peak(&out[..3_000]) - peak(&out[7_410..])).abs() < 1e-6);
    }

    #[test]
    fn test_order_preserved() {
        let a = vec![0.5; 10];
        let b = vec![-0.5; 10];
        let out = AudioStitcher::new(StitchOptions {
            pause_seconds: 0.0,
            pitch_shift: PitchShift::disabled(),
            ..Default::default()
        })
        .stitch(&[a, b])
        .unwrap();
        assert!(out[..10].iter().all(|&s| s > 0.0));
        assert!(out[10..].iter().all(|&s| s < 0.0));
    }

    #[test]
    fn test_empty_segments_skipped() {
        let out = no_pitch().stitch(&[vec![], ramp(100, 0.5), vec![]]).unwrap();
        assert_eq!(out.len(), 100);
        assert!(no_pitch().stitch::<Vec<f32>>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_silent_segments_stay_silent() {
        let out = no_pitch().stitch(&[vec![0.0; 20], vec![0.0; 20]]).unwrap();
        assert_eq!(out.len(), 40 + 4_410);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_pitch_shift_keeps_length_and_range() {
        let seg: Vec<f32> = (0..22_050).map(|i| (i as f32 * 0.06).sin()).collect();
        let out = AudioStitcher::default().stitch(&[seg.clone(), seg]).unwrap();
        assert_eq!(out.len(), 2 * 22_050 + 4_410);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_options_validation() {
        assert!(StitchOptions::default().validate().is_ok());
        assert!(StitchOptions { headroom: 0.0, ..Default::default() }.validate().is_err());
        assert!(StitchOptions { headroom: 1.5, ..Default::default() }.validate().is_err());
        assert!(StitchOptions { pause_seconds: -0.1, ..Default::default() }.validate().is_err());
        assert!(StitchOptions { sample_rate: 0, ..Default::default() }.validate().is_err());
    }
}
