//! Voice-cloning orchestrator.
//!
//! Owns the catalog, the cached voice sample set and the backend, and runs a
//! request through chunking → per-chunk synthesis → stitching → optional WAV
//! output.
//!
//! ```text
//! Uninitialized ──initialize──▶ Ready ──synthesize──▶ Synthesizing ──▶ Ready
//!       │
//!       └──────────── initialize fails ──▶ Failed (terminal)
//! ```
//!
//! At most one request runs per instance; concurrent callers queue on an
//! internal mutex.  The backend call itself cannot be interrupted: a caller
//! that gives up on a request (e.g. after its own timeout) does not stop the
//! backend work already in progress.

use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::audio::{self, Waveform};
use crate::backend::{ChunkRequest, SynthesisBackend};
use crate::catalog::{AudioCatalog, AudioSample};
use crate::config::ClonerConfig;
use crate::dsp;
use crate::error::{Result, VoiceCloneError};
use crate::selector::select_best;
use crate::stitch::AudioStitcher;
use crate::text::TextChunker;

/// Requests longer than this are accepted but logged as slow.
const LONG_TEXT_WARNING_CHARS: usize = 10_000;

/// Lifecycle of a [`VoiceCloner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClonerState {
    Uninitialized,
    Ready,
    Synthesizing,
    /// Initialisation failed; build a new instance to recover.
    Failed,
}

/// The voice-cloning pipeline around a [`SynthesisBackend`].
pub struct VoiceCloner<B: SynthesisBackend> {
    config: ClonerConfig,
    catalog: AudioCatalog,
    chunker: TextChunker,
    stitcher: AudioStitcher,
    backend: B,
    voice_samples: Vec<AudioSample>,
    state: Mutex<ClonerState>,
    // Serialises requests; held for the whole of `synthesize`.
    request_lock: Mutex<()>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Puts the state back to `Ready` when a request ends, however it ends.
struct RequestGuard<'a> {
    state: &'a Mutex<ClonerState>,
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = ClonerState::Ready;
    }
}

impl<B: SynthesisBackend> VoiceCloner<B> {
    /// Validate `config` and build an uninitialised cloner.
    pub fn new(config: ClonerConfig, backend: B) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog: config.build_catalog(),
            chunker: config.build_chunker(),
            stitcher: AudioStitcher::new(config.stitch),
            config,
            backend,
            voice_samples: Vec::new(),
            state: Mutex::new(ClonerState::Uninitialized),
            request_lock: Mutex::new(()),
        })
    }

    pub fn state(&self) -> ClonerState {
        *lock(&self.state)
    }

    pub fn config(&self) -> &ClonerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AudioCatalog {
        &self.catalog
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The cached voice sample set (empty before initialisation).
    pub fn voice_samples(&self) -> &[AudioSample] {
        &self.voice_samples
    }

    /// Scan the sound directory and select voice samples.
    ///
    /// Calling it again from `Ready` rebuilds everything from scratch.
    pub fn initialize(&mut self) -> Result<()> {
        let state = self.state();
        if state == ClonerState::Failed {
            return Err(VoiceCloneError::NotReady(state));
        }
        info!(sound_dir = %self.catalog.root().display(), "initializing voice cloner");

        match self.build_sample_set() {
            Ok(samples) => {
                self.voice_samples = samples;
                *lock(&self.state) = ClonerState::Ready;
                info!(
                    files = self.catalog.len(),
                    samples = self.voice_samples.len(),
                    "voice cloner initialized"
                );
                Ok(())
            }
            Err(e) => {
                self.voice_samples.clear();
                *lock(&self.state) = ClonerState::Failed;
                Err(e)
            }
        }
    }

    fn build_sample_set(&mut self) -> Result<Vec<AudioSample>> {
        self.catalog.discover()?;
        if self.catalog.is_empty() {
            return Err(VoiceCloneError::NoAudioFiles(self.catalog.root().to_path_buf()));
        }
        select_best(&self.catalog, &self.config.selection)
    }

    /// Synthesize `text` with the first-ranked voice sample.
    ///
    /// Writes a 16-bit PCM WAV to `output` when given.  Any chunk failure
    /// aborts the request: no waveform is returned and no file is written.
    pub fn synthesize(&self, text: &str, language: &str, output: Option<&Path>) -> Result<Waveform> {
        self.run(text, language, None, output)
    }

    /// Like [`synthesize`](Self::synthesize) with the configured default language.
    pub fn synthesize_default(&self, text: &str, output: Option<&Path>) -> Result<Waveform> {
        self.run(text, &self.config.synthesis.default_language, None, output)
    }

    /// Synthesize with an explicit reference clip instead of the cached choice.
    pub fn synthesize_with_reference(
        &self,
        text: &str,
        language: &str,
        reference: &Path,
        output: Option<&Path>,
    ) -> Result<Waveform> {
        self.run(text, language, Some(reference), output)
    }

    fn run(
        &self,
        text: &str,
        language: &str,
        reference: Option<&Path>,
        output: Option<&Path>,
    ) -> Result<Waveform> {
        let _serial = lock(&self.request_lock);

        let state = self.state();
        if state != ClonerState::Ready {
            return Err(VoiceCloneError::NotReady(state));
        }
        self.validate_request(text, language)?;
        let reference = self.resolve_reference(reference)?;

        let request_id = Uuid::new_v4();
        let span = info_span!("synthesis", request = %request_id);
        let _enter = span.enter();

        *lock(&self.state) = ClonerState::Synthesizing;
        let _reset = RequestGuard { state: &self.state };

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(VoiceCloneError::InvalidInput("text is empty after normalization".into()));
        }
        info!(chunks = chunks.len(), reference = %reference.display(), language, "text split into chunks");

        // Removed on drop: success, error or panic.
        let scratch = tempfile::Builder::new()
            .prefix(&format!("voiceclone-{request_id}-"))
            .tempdir()
            .map_err(|e| VoiceCloneError::io(std::env::temp_dir(), e))?;

        let sample_rate = self.stitcher.options().sample_rate;
        let mut segments = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            info!(chunk = chunk.index, total = chunks.len(), "processing chunk");
            let request = ChunkRequest {
                index: chunk.index,
                text: &chunk.text,
                reference: &reference,
                language,
                scratch_dir: scratch.path(),
            };
            let wav = self
                .backend
                .synthesize(&request)
                .map_err(|source| VoiceCloneError::Backend { chunk: chunk.index, source })?;

            let mut samples = dsp::resample(&wav.samples, wav.sample_rate, sample_rate)?;
            if self.config.synthesis.trim_silence {
                samples = dsp::trim_silence(&samples, self.config.synthesis.trim_top_db);
            }
            segments.push(samples);
        }

        let stitched = Waveform::new(self.stitcher.stitch(&segments)?, sample_rate);
        if let Some(path) = output {
            audio::write_pcm16(path, &stitched.samples, sample_rate)?;
        }
        info!(seconds = stitched.duration(), "synthesis complete");
        Ok(stitched)
    }

    fn validate_request(&self, text: &str, language: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(VoiceCloneError::InvalidInput("text cannot be empty".into()));
        }
        let len = text.chars().count();
        if let Some(limit) = self.config.synthesis.max_input_chars {
            if len > limit {
                return Err(VoiceCloneError::InvalidInput(format!(
                    "text is {len} characters, limit is {limit}"
                )));
            }
        }
        if len > LONG_TEXT_WARNING_CHARS {
            warn!(chars = len, "text is very long, synthesis may take a while");
        }

        let languages = self.backend.supported_languages();
        if !languages.iter().any(|l| l.eq_ignore_ascii_case(language)) {
            return Err(VoiceCloneError::InvalidInput(format!(
                "unsupported language '{language}' (supported: {})",
                languages.join(", ")
            )));
        }
        if !self.backend.is_ready() {
            return Err(VoiceCloneError::BackendNotReady);
        }
        Ok(())
    }

    /// The explicit reference, or the first sample of the cached set.
    /// Either way the file must still exist.
    fn resolve_reference(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => self
                .voice_samples
                .first()
                .map(|s| s.path.clone())
                .ok_or(VoiceCloneError::NoSamplesAvailable)?,
        };
        if !path.is_file() {
            return Err(VoiceCloneError::NotFound(path));
        }
        Ok(path)
    }
}
