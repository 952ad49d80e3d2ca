//! Error taxonomy for the voice-cloning pipeline.
//!
//! Per-file problems (`NotFound`, `Decode`) are recoverable while the catalog
//! is being scanned: they are logged and the file is skipped.  Everything
//! raised while a synthesis request is in flight aborts the whole request.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;
use crate::cloner::ClonerState;

/// Errors returned by the library.
#[derive(Debug, Error)]
pub enum VoiceCloneError {
    /// Bad directory, bad numeric parameter, unreadable config.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The sound directory contained no supported audio files.
    #[error("no audio files found in {}", .0.display())]
    NoAudioFiles(PathBuf),

    /// Sample selection ran against an empty catalog.
    #[error("no voice samples available")]
    NoSamplesAvailable,

    #[error("audio file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but its header (or body) is not valid audio.
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// Empty, oversized or otherwise unusable request input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation not valid in the orchestrator's current state.
    #[error("voice cloner is not ready (state: {0:?})")]
    NotReady(ClonerState),

    /// The backend reported itself unusable before any chunk was sent.
    #[error("synthesis backend is not ready")]
    BackendNotReady,

    /// The synthesis backend failed on a chunk (1-based index).
    #[error("synthesis failed on chunk {chunk}: {source}")]
    Backend {
        chunk: usize,
        #[source]
        source: BackendError,
    },

    /// Resampler construction or processing failure.
    #[error("audio processing error: {0}")]
    AudioProcessing(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

impl VoiceCloneError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Maps a `hound` failure on `path`: a missing file becomes `NotFound`,
    /// anything else is a decode problem.
    pub(crate) fn from_hound(path: impl Into<PathBuf>, source: hound::Error) -> Self {
        let path = path.into();
        match source {
            hound::Error::IoError(ref e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::NotFound(path)
            }
            source => Self::Decode { path, source },
        }
    }

    /// True for per-file problems that catalog scans skip over.
    pub fn is_per_file(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Decode { .. })
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, VoiceCloneError>;
