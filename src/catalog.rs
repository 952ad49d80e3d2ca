//! Reference audio discovery and inspection.
//!
//! The catalog only holds paths.  Metadata is read from the WAV header on
//! demand; sample data is never decoded here.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use hound::{SampleFormat, WavReader};
use tracing::{info, warn};

use crate::error::{Result, VoiceCloneError};

/// Header metadata of one audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub format: AudioFormat,
}

/// Sample encoding reported by the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    PcmInt,
    Float,
}

/// A reference clip usable as a voice-cloning prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSample {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub sample_rate: u32,
}

impl From<AudioInfo> for AudioSample {
    fn from(info: AudioInfo) -> Self {
        Self {
            path: info.path,
            duration_seconds: info.duration_seconds,
            sample_rate: info.sample_rate,
        }
    }
}

impl AudioSample {
    /// Placeholder for a catalog entry whose header could not be read.
    pub(crate) fn unprobed(path: PathBuf) -> Self {
        Self { path, duration_seconds: 0.0, sample_rate: 0 }
    }
}

/// Sorted list of candidate reference files under a root directory.
#[derive(Debug, Clone)]
pub struct AudioCatalog {
    root: PathBuf,
    recursive: bool,
    extensions: Vec<String>,
    files: Vec<PathBuf>,
}

impl AudioCatalog {
    /// Catalog of `*.wav` files directly inside `root`.  Call [`discover`](Self::discover) to scan.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            extensions: vec!["wav".to_string()],
            files: Vec::new(),
        }
    }

    /// Descend into subdirectories when scanning.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Replace the accepted extensions (matched case-insensitively, no dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files found by the last scan, sorted by full path.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Rescan the root directory, replacing the previous listing.
    ///
    /// A missing root is not an error here: it logs a warning and yields an
    /// empty catalog.
    pub fn discover(&mut self) -> Result<&[PathBuf]> {
        self.files.clear();

        match fs::metadata(&self.root) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(root = %self.root.display(), "sound directory does not exist");
                return Ok(&self.files);
            }
            Err(e) => return Err(VoiceCloneError::io(&self.root, e)),
            Ok(meta) if !meta.is_dir() => {
                return Err(VoiceCloneError::Configuration(format!(
                    "{} is not a directory",
                    self.root.display()
                )));
            }
            Ok(_) => {}
        }

        let mut found = Vec::new();
        let root = self.root.clone();
        self.scan(&root, &mut found, true)?;
        // Plain byte order of the whole path: "a.wav" before "a/x.wav".
        found.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        self.files = found;

        info!(root = %self.root.display(), count = self.files.len(), "discovered audio files");
        Ok(&self.files)
    }

    fn scan(&self, dir: &Path, found: &mut Vec<PathBuf>, is_root: bool) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if is_root => return Err(VoiceCloneError::io(dir, e)),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                return Ok(());
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            // Symlinked directories are never entered, so every file is listed once.
            if file_type.is_dir() {
                if self.recursive {
                    self.scan(&path, found, false)?;
                }
            } else if path.is_file() && self.accepts(&path) {
                found.push(path);
            }
        }
        Ok(())
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Probe a file's header.  Never decodes sample data.
    pub fn get_info(&self, path: &Path) -> Result<AudioInfo> {
        probe(path)
    }

    /// Probe every discovered file, skipping (and logging) the ones that fail.
    pub fn inspect_all(&self) -> Vec<AudioInfo> {
        self.files
            .iter()
            .filter_map(|path| match probe(path) {
                Ok(info) => Some(info),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping file");
                    None
                }
            })
            .collect()
    }
}

/// Header-only metadata probe.
pub fn probe(path: &Path) -> Result<AudioInfo> {
    if !path.exists() {
        return Err(VoiceCloneError::NotFound(path.to_path_buf()));
    }
    let reader = WavReader::open(path).map_err(|e| VoiceCloneError::from_hound(path, e))?;
    let spec = reader.spec();
    // `duration()` is frames per channel, taken from the data chunk length.
    let frames = reader.duration();

    Ok(AudioInfo {
        path: path.to_path_buf(),
        duration_seconds: if spec.sample_rate == 0 {
            0.0
        } else {
            frames as f64 / spec.sample_rate as f64
        },
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        format: match spec.sample_format {
            SampleFormat::Int => AudioFormat::PcmInt,
            SampleFormat::Float => AudioFormat::Float,
        },
    })
}
