//! Reference-sample selection.
//!
//! First-fit over the catalog's sorted order: the first `max_samples` files
//! whose duration lies inside the window win.  If none do, the first
//! `max_samples` files are used as-is so a non-empty catalog always yields a
//! prompt.

use serde::Deserialize;
use tracing::{info, warn};

use crate::catalog::{probe, AudioCatalog, AudioSample};
use crate::error::{Result, VoiceCloneError};

/// Duration window and cap for selection.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectionCriteria {
    /// Inclusive lower bound, seconds.
    pub min_duration: f64,
    /// Inclusive upper bound, seconds.
    pub max_duration: f64,
    pub max_samples: usize,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self { min_duration: 2.0, max_duration: 15.0, max_samples: 5 }
    }
}

impl SelectionCriteria {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_duration >= 0.0 && self.min_duration <= self.max_duration) {
            return Err(VoiceCloneError::Configuration(format!(
                "invalid duration window [{}, {}]",
                self.min_duration, self.max_duration
            )));
        }
        if self.max_samples == 0 {
            return Err(VoiceCloneError::Configuration("max_samples must be at least 1".into()));
        }
        Ok(())
    }

    fn accepts(&self, duration: f64) -> bool {
        self.min_duration <= duration && duration <= self.max_duration
    }
}

/// Pick voice-cloning prompts from `catalog` (which must already be discovered).
pub fn select_best(catalog: &AudioCatalog, criteria: &SelectionCriteria) -> Result<Vec<AudioSample>> {
    if catalog.is_empty() {
        return Err(VoiceCloneError::NoSamplesAvailable);
    }

    let mut selected = Vec::new();
    for path in catalog.files() {
        if selected.len() >= criteria.max_samples {
            break;
        }
        match probe(path) {
            Ok(info) if criteria.accepts(info.duration_seconds) => selected.push(AudioSample::from(info)),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "skipping file for selection"),
        }
    }

    if selected.is_empty() {
        warn!(
            min = criteria.min_duration,
            max = criteria.max_duration,
            "no sample inside duration window, using fallback voice samples"
        );
        selected = catalog
            .files()
            .iter()
            .take(criteria.max_samples)
            .map(|path| match probe(path) {
                Ok(info) => AudioSample::from(info),
                Err(_) => AudioSample::unprobed(path.clone()),
            })
            .collect();
    }

    info!(count = selected.len(), "selected voice samples");
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::write_clip;
    use std::fs;

    const RATE: u32 = 1_000;

    fn catalog_with(durations: &[f64]) -> (tempfile::TempDir, AudioCatalog) {
        let dir = tempfile::tempdir().unwrap();
        for (i, &d) in durations.iter().enumerate() {
            write_clip(&dir.path().join(format!("clip_{i:02}.wav")), d, RATE);
        }
        let mut catalog = AudioCatalog::new(dir.path());
        catalog.discover().unwrap();
        (dir, catalog)
    }

    fn names(samples: &[AudioSample]) -> Vec<String> {
        samples
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_select_exact_in_range_in_order() {
        let durations = [1.0, 3.0, 20.0, 0.5, 2.0, 16.0, 15.0, 1.5, 30.0, 8.0];
        let (_dir, catalog) = catalog_with(&durations);
        let picked = select_best(&catalog, &SelectionCriteria::default()).unwrap();
        assert_eq!(names(&picked), vec!["clip_01.wav", "clip_04.wav", "clip_06.wav", "clip_09.wav"]);
        assert!((picked[1].duration_seconds - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_stops_at_max_samples() {
        let (_dir, catalog) = catalog_with(&[3.0, 4.0, 5.0, 6.0]);
        let criteria = SelectionCriteria { max_samples: 2, ..Default::default() };
        let picked = select_best(&catalog, &criteria).unwrap();
        assert_eq!(names(&picked), vec!["clip_00.wav", "clip_01.wav"]);
    }

    #[test]
    fn test_select_fallback_when_none_in_range() {
        let (_dir, catalog) = catalog_with(&[0.5, 0.5, 20.0, 25.0, 1.0, 40.0, 0.2]);
        let picked = select_best(&catalog, &SelectionCriteria::default()).unwrap();
        assert_eq!(picked.len(), 5);
        assert_eq!(names(&picked)[0], "clip_00.wav");
        assert_eq!(names(&picked)[4], "clip_04.wav");
    }

    #[test]
    fn test_select_skips_undecodable() {
        let (dir, _) = catalog_with(&[3.0]);
        fs::write(dir.path().join("aaa_broken.wav"), b"junk").unwrap();
        let mut catalog = AudioCatalog::new(dir.path());
        catalog.discover().unwrap();
        let picked = select_best(&catalog, &SelectionCriteria::default()).unwrap();
        assert_eq!(names(&picked), vec!["clip_00.wav"]);
    }

    #[test]
    fn test_fallback_keeps_unprobeable_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.wav"), b"junk").unwrap();
        let mut catalog = AudioCatalog::new(dir.path());
        catalog.discover().unwrap();
        let picked = select_best(&catalog, &SelectionCriteria::default()).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].duration_seconds, 0.0);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = AudioCatalog::new("/no/such/dir");
        assert!(matches!(
            select_best(&catalog, &SelectionCriteria::default()),
            Err(VoiceCloneError::NoSamplesAvailable)
        ));
    }

    #[test]
    fn test_criteria_validation() {
        assert!(SelectionCriteria::default().validate().is_ok());
        assert!(SelectionCriteria { min_duration: 5.0, max_duration: 1.0, max_samples: 1 }.validate().is_err());
        assert!(SelectionCriteria { max_samples: 0, ..Default::default() }.validate().is_err());
        assert!(SelectionCriteria { min_duration: f64::NAN, ..Default::default() }.validate().is_err());
    }
}
