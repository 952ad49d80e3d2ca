//! # voiceclone
//!
//! Voice-cloning text-to-speech pipeline around a pluggable neural backend.
//!
//! The crate does everything except the neural synthesis itself: it finds
//! reference recordings, picks voice-cloning prompts, cuts long text into
//! chunks the model can take, calls the backend once per chunk and stitches
//! the results into one normalised utterance.
//!
//! ## Quick start
//!
//! ```no_run
//! use voiceclone::{ClonerConfig, CommandBackend, VoiceCloner};
//!
//! let config = ClonerConfig::from_json_file(std::path::Path::new("voiceclone.json")).unwrap();
//! let backend = CommandBackend::new(config.backend.clone());
//!
//! let mut cloner = VoiceCloner::new(config, backend).unwrap();
//! cloner.initialize().unwrap();
//!
//! let out = std::path::Path::new("out.wav");
//! let audio = cloner.synthesize("Hello there. This is my cloned voice.", "en", Some(out)).unwrap();
//! println!("{:.1} s at {} Hz", audio.duration(), audio.sample_rate);
//! ```
//!
//! Any type implementing [`SynthesisBackend`] can replace [`CommandBackend`]:
//!
//! ```no_run
//! use voiceclone::{BackendError, ChunkRequest, SynthesisBackend, Waveform};
//!
//! struct Silence;
//!
//! impl SynthesisBackend for Silence {
//!     fn synthesize(&self, req: &ChunkRequest<'_>) -> Result<Waveform, BackendError> {
//!         Ok(Waveform::new(vec![0.0; req.text.len() * 200], 22_050))
//!     }
//! }
//! ```
//!
//! ## Pipeline
//! 1. **Catalog**: scan the sound directory for WAV files (sorted by path).
//! 2. **Selection**: first-fit of clips between 2 and 15 seconds, at most 5.
//! 3. **Normalisation**: strip symbols, expand `Dr.`/`Mr.`/…, collapse spaces.
//! 4. **Chunking**: sentences packed greedily into ≤ 500-char chunks.
//! 5. **Synthesis**: one backend call per chunk with the first-ranked clip.
//! 6. **Stitch**: per-chunk peak normalisation, 0.2 s pauses, final
//!    normalisation to 0.95, optional −1.2 semitone pitch shift.
//! 7. **Output**: 22 050 Hz mono, optionally written as 16-bit PCM WAV.

pub mod audio;
pub mod backend;
pub mod catalog;
pub mod cloner;
pub mod config;
pub mod dsp;
pub mod error;
pub mod numbers;
pub mod selector;
pub mod stitch;
pub mod text;

// ─── Re-exports for convenience ─────────────────────────────────────────────

/// The orchestrator handle.
pub use cloner::{ClonerState, VoiceCloner};

pub use audio::{Waveform, SAMPLE_RATE};
pub use backend::{BackendError, ChunkRequest, CommandBackend, CommandConfig, SynthesisBackend};
pub use catalog::{AudioCatalog, AudioInfo, AudioSample};
pub use config::ClonerConfig;
pub use error::{Result, VoiceCloneError};
pub use selector::{select_best, SelectionCriteria};
pub use stitch::{AudioStitcher, PitchShift, StitchOptions};
pub use text::{TextChunk, TextChunker, TextPreprocess};
