//! JSON configuration for the whole pipeline.
//!
//! Every field has a default, so `{}` is a complete config:
//!
//! ```json
//! {
//!   "catalog":   { "sound_dir": "Sound", "recursive": false, "extensions": ["wav"] },
//!   "text":      { "max_length": 500, "spoken_numbers": false },
//!   "selection": { "min_duration": 2.0, "max_duration": 15.0, "max_samples": 5 },
//!   "stitch":    { "pause_seconds": 0.2, "sample_rate": 22050, "headroom": 0.95,
//!                  "pitch_shift": { "enabled": true, "semitones": -1.2 } },
//!   "synthesis": { "default_language": "en", "max_input_chars": null,
//!                  "trim_silence": false, "trim_top_db": 20.0 },
//!   "backend":   { "program": "xtts-cli", "args": ["--text", "{text}", "--speaker", "{reference}",
//!                  "--language", "{language}", "--out", "{output}"] }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::CommandConfig;
use crate::catalog::AudioCatalog;
use crate::error::{Result, VoiceCloneError};
use crate::numbers::SpokenNumbers;
use crate::selector::SelectionCriteria;
use crate::stitch::StitchOptions;
use crate::text::{TextChunker, DEFAULT_MAX_LENGTH};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub sound_dir: PathBuf,
    pub recursive: bool,
    pub extensions: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sound_dir: PathBuf::from("Sound"),
            recursive: false,
            extensions: vec!["wav".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Maximum characters per synthesis chunk.
    pub max_length: usize,
    /// Read digits as English words before chunking.
    pub spoken_numbers: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { max_length: DEFAULT_MAX_LENGTH, spoken_numbers: false }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub default_language: String,
    /// Reject requests longer than this many characters.  `None` = no limit.
    pub max_input_chars: Option<usize>,
    /// Cut quiet edges off every backend segment before stitching.
    pub trim_silence: bool,
    pub trim_top_db: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            max_input_chars: None,
            trim_silence: false,
            trim_top_db: 20.0,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClonerConfig {
    pub catalog: CatalogConfig,
    pub text: TextConfig,
    pub selection: SelectionCriteria,
    pub stitch: StitchOptions,
    pub synthesis: SynthesisConfig,
    /// Used by the CLI to build a [`CommandBackend`](crate::backend::CommandBackend).
    pub backend: CommandConfig,
}

impl ClonerConfig {
    /// Defaults with a different sound directory.
    pub fn with_sound_dir(sound_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.catalog.sound_dir = sound_dir.into();
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| VoiceCloneError::io(path, e))?;
        Self::from_json_str(&json)
    }

    /// Reject parameter combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.catalog.sound_dir.as_os_str().is_empty() {
            return Err(VoiceCloneError::Configuration("sound_dir must not be empty".into()));
        }
        if self.catalog.extensions.is_empty() {
            return Err(VoiceCloneError::Configuration("at least one audio extension is required".into()));
        }
        if self.text.max_length == 0 {
            return Err(VoiceCloneError::Configuration("text.max_length must be at least 1".into()));
        }
        if self.synthesis.default_language.trim().is_empty() {
            return Err(VoiceCloneError::Configuration("default_language must not be empty".into()));
        }
        if self.synthesis.max_input_chars == Some(0) {
            return Err(VoiceCloneError::Configuration("max_input_chars must be at least 1".into()));
        }
        if !(self.synthesis.trim_top_db > 0.0) {
            return Err(VoiceCloneError::Configuration("trim_top_db must be positive".into()));
        }
        self.selection.validate()?;
        self.stitch.validate()
    }

    pub fn build_catalog(&self) -> AudioCatalog {
        AudioCatalog::new(&self.catalog.sound_dir)
            .recursive(self.catalog.recursive)
            .with_extensions(&self.catalog.extensions)
    }

    pub fn build_chunker(&self) -> TextChunker {
        let chunker = TextChunker::new(self.text.max_length);
        if self.text.spoken_numbers {
            chunker.with_preprocessor(SpokenNumbers)
        } else {
            chunker
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = ClonerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ClonerConfig::default());
        assert_eq!(config.text.max_length, 500);
        assert_eq!(config.selection.max_samples, 5);
        assert_eq!(config.stitch.sample_rate, 22_050);
        assert!(config.stitch.pitch_shift.enabled);
        assert_eq!(config.stitch.pitch_shift.semitones, -1.2);
    }

    #[test]
    fn test_partial_sections() {
        let config = ClonerConfig::from_json_str(
            r#"{
                "catalog": { "sound_dir": "voices", "recursive": true },
                "stitch": { "pitch_shift": { "enabled": false } },
                "backend": { "program": "tts", "args": ["{text}"] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.catalog.sound_dir, PathBuf::from("voices"));
        assert!(config.catalog.recursive);
        assert_eq!(config.catalog.extensions, vec!["wav"]);
        assert!(!config.stitch.pitch_shift.enabled);
        assert_eq!(config.stitch.headroom, 0.95);
        assert_eq!(config.backend.program, "tts");
    }

    #[test]
    fn test_validation_errors() {
        for json in [
            r#"{ "text": { "max_length": 0 } }"#,
            r#"{ "selection": { "min_duration": 10.0, "max_duration": 1.0 } }"#,
            r#"{ "stitch": { "headroom": 2.0 } }"#,
            r#"{ "catalog": { "extensions": [] } }"#,
            r#"{ "synthesis": { "max_input_chars": 0 } }"#,
        ] {
            assert!(
                matches!(ClonerConfig::from_json_str(json), Err(VoiceCloneError::Configuration(_))),
                "{json}"
            );
        }
        assert!(matches!(ClonerConfig::from_json_str("{ not json"), Err(VoiceCloneError::Json(_))));
    }

    #[test]
    fn test_build_chunker_with_numbers() {
        let mut config = ClonerConfig::default();
        config.text.spoken_numbers = true;
        assert_eq!(config.build_chunker().normalize("Take 2 pills."), "Take two pills.");
        assert_eq!(ClonerConfig::default().build_chunker().normalize("Take 2 pills."), "Take 2 pills.");
    }
}
