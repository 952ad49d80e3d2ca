//! WAV I/O and the in-memory waveform type.
//!
//! Everything downstream of the backend works on mono `f32` samples in
//! `[-1.0, 1.0]`.  Files are written as 16-bit PCM.

use std::{io::BufWriter, path::Path};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::info;

use crate::error::{Result, VoiceCloneError};

/// Canonical sample rate of synthesized and stitched audio.
pub const SAMPLE_RATE: u32 = 22_050;

/// Mono waveform plus its sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Largest absolute sample value; `0.0` for empty input.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Decode a WAV file to mono `f32`, averaging interleaved channels.
pub fn read_wav(path: &Path) -> Result<Waveform> {
    let reader = WavReader::open(path).map_err(|e| VoiceCloneError::from_hound(path, e))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| VoiceCloneError::from_hound(path, e))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| VoiceCloneError::from_hound(path, e))?
        }
    };

    let samples = if channels > 1 {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        interleaved
    };

    Ok(Waveform::new(samples, spec.sample_rate))
}

/// Write `samples` as a mono 16-bit PCM WAV, creating parent directories.
///
/// Samples are clipped to `[-1.0, 1.0]` before quantisation.  The file is
/// written next to `path` under a temporary name and renamed into place once
/// complete; on error `path` is left untouched.
pub fn write_pcm16(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(|e| VoiceCloneError::io(parent, e))?;
            parent
        }
        None => Path::new("."),
    };

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let to_io = |e: hound::Error| match e {
        hound::Error::IoError(io) => VoiceCloneError::io(path, io),
        other => VoiceCloneError::io(path, std::io::Error::new(std::io::ErrorKind::Other, other)),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".voiceclone-")
        .suffix(".wav.part")
        .tempfile_in(parent)
        .map_err(|e| VoiceCloneError::io(parent, e))?;
    {
        let mut writer = WavWriter::new(BufWriter::new(staged.as_file_mut()), spec).map_err(to_io)?;
        for &s in samples {
            let s16 = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(s16).map_err(to_io)?;
        }
        writer.finalize().map_err(to_io)?;
    }
    staged.persist(path).map_err(|e| VoiceCloneError::io(path, e.error))?;

    info!(
        path = %path.display(),
        samples = samples.len(),
        seconds = samples.len() as f64 / sample_rate.max(1) as f64,
        "saved audio"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak() {
        assert_eq!(peak(&[]), 0.0);
        assert_eq!(peak(&[0.25, -0.75, 0.5]), 0.75);
    }

    #[test]
    fn test_write_then_read_pcm16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.wav");
        let samples = vec![0.0, 0.5, -0.5, 1.0, -1.0];
        write_pcm16(&path, &samples, SAMPLE_RATE).unwrap();

        let reader = WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.channels, 1);

        let back = read_wav(&path).unwrap();
        assert_eq!(back.len(), samples.len());
        for (a, b) in back.samples.iter().zip(&samples) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory sits where the output should go, so the final rename fails.
        let path = dir.path().join("out.wav");
        std::fs::create_dir(&path).unwrap();

        let err = write_pcm16(&path, &[0.1, 0.2], SAMPLE_RATE).unwrap_err();
        assert!(matches!(err, VoiceCloneError::Io { .. }));
        assert!(path.is_dir());
        let names: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names, vec![std::ffi::OsString::from("out.wav")]);
    }

    #[test]
    fn test_write_clips_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        write_pcm16(&path, &[2.0, -3.0], 8_000).unwrap();
        let back = read_wav(&path).unwrap();
        assert!(back.samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_read_stereo_downmixes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut w = WavWriter::create(&path, spec).unwrap();
        for _ in 0..4 {
            w.write_sample(0.5f32).unwrap();
            w.write_sample(-0.5f32).unwrap();
        }
        w.finalize().unwrap();

        let wav = read_wav(&path).unwrap();
        assert_eq!(wav.len(), 4);
        assert!(wav.samples.iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let err = read_wav(Path::new("/definitely/not/here.wav")).unwrap_err();
        assert!(matches!(err, VoiceCloneError::NotFound(_)));
    }
}
