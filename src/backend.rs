//! Speech-synthesis backend boundary.
//!
//! The neural model is outside this crate.  Anything that can turn one text
//! chunk plus a reference clip into a mono waveform implements
//! [`SynthesisBackend`]; [`CommandBackend`] drives an external program.

use std::{
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::audio::{self, Waveform};

/// Languages accepted by the XTTS v2 family of models.
pub const DEFAULT_LANGUAGES: &[&str] = &[
    "vi", "en", "es", "fr", "de", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar", "zh-cn", "ja", "hu", "ko",
];

/// Failures reported by a backend for a single chunk.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("synthesis backend is not ready: {0}")]
    NotReady(String),

    #[error("invalid reference audio {}: {reason}", path.display())]
    InvalidReference { path: PathBuf, reason: String },

    #[error("text to synthesize is empty")]
    EmptyText,

    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    #[error("synthesis failed: {0}")]
    Failed(String),

    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One call into the backend.
#[derive(Debug, Clone, Copy)]
pub struct ChunkRequest<'a> {
    /// 1-based chunk position within the request.
    pub index: usize,
    pub text: &'a str,
    /// Voice-cloning prompt.
    pub reference: &'a Path,
    /// BCP-47-like code, e.g. `"en"` or `"zh-cn"`.
    pub language: &'a str,
    /// Private to this request and deleted when it ends.  Backends needing
    /// files for interop must write here.
    pub scratch_dir: &'a Path,
}

/// Opaque text + reference → waveform capability.
///
/// Calls block and may take seconds; no timeout is imposed.  Implementations
/// need not be reentrant: the orchestrator issues one call at a time.
pub trait SynthesisBackend: Send + Sync {
    fn synthesize(&self, request: &ChunkRequest<'_>) -> Result<Waveform, BackendError>;

    fn is_ready(&self) -> bool {
        true
    }

    fn supported_languages(&self) -> Vec<String> {
        DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect()
    }
}

impl<B: SynthesisBackend + ?Sized> SynthesisBackend for Box<B> {
    fn synthesize(&self, request: &ChunkRequest<'_>) -> Result<Waveform, BackendError> {
        (**self).synthesize(request)
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn supported_languages(&self) -> Vec<String> {
        (**self).supported_languages()
    }
}

/// Checks every backend shares before doing any work.
pub fn check_request(request: &ChunkRequest<'_>) -> Result<(), BackendError> {
    if request.text.trim().is_empty() {
        return Err(BackendError::EmptyText);
    }
    if !request.reference.is_file() {
        return Err(BackendError::InvalidReference {
            path: request.reference.to_path_buf(),
            reason: "file does not exist".into(),
        });
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// External command backend
// ─────────────────────────────────────────────────────────────────────────────

/// How to invoke an external synthesis program.
///
/// Every argument may contain the placeholders `{text}`, `{reference}`,
/// `{language}` and `{output}`.  The program must write a WAV file to
/// `{output}` and exit with status 0.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Pipe the chunk text on stdin instead of (or in addition to) `{text}`.
    pub text_on_stdin: bool,
    /// Override the default language list.
    pub languages: Option<Vec<String>>,
}

/// Runs one external process per chunk.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    config: CommandConfig,
}

impl CommandBackend {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }

    fn expand(&self, template: &str, request: &ChunkRequest<'_>, output: &Path) -> String {
        template
            .replace("{text}", request.text)
            .replace("{reference}", &request.reference.to_string_lossy())
            .replace("{language}", request.language)
            .replace("{output}", &output.to_string_lossy())
    }
}

impl SynthesisBackend for CommandBackend {
    fn synthesize(&self, request: &ChunkRequest<'_>) -> Result<Waveform, BackendError> {
        if !self.is_ready() {
            return Err(BackendError::NotReady("no synthesis program configured".into()));
        }
        check_request(request)?;
        if !self.supported_languages().iter().any(|l| l.eq_ignore_ascii_case(request.language)) {
            return Err(BackendError::UnsupportedLanguage(request.language.to_string()));
        }

        let output = request.scratch_dir.join(format!("chunk_{}.wav", request.index));
        let args: Vec<String> = self.config.args.iter().map(|a| self.expand(a, request, &output)).collect();

        debug!(program = %self.config.program, chunk = request.index, "spawning synthesis program");
        let mut child = Command::new(&self.config.program)
            .args(&args)
            .stdin(if self.config.text_on_stdin { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BackendError::NotReady(format!("cannot launch '{}': {e}", self.config.program)))?;

        if self.config.text_on_stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(request.text.as_bytes())?;
            }
        }

        let result = child.wait_with_output()?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(5)..].join("\n");
            return Err(BackendError::Failed(format!("{} exited with {}: {}", self.config.program, result.status, tail)));
        }

        let wav = audio::read_wav(&output)
            .map_err(|e| BackendError::Failed(format!("unreadable output {}: {e}", output.display())))?;
        info!(chunk = request.index, seconds = wav.duration(), "synthesized chunk");
        Ok(wav)
    }

    fn is_ready(&self) -> bool {
        !self.config.program.trim().is_empty()
    }

    fn supported_languages(&self) -> Vec<String> {
        match &self.config.languages {
            Some(list) => list.clone(),
            None => DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
        }
    }
}
