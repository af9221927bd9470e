// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores trained extractors as JSON.
//
// What gets saved per training run:
//   1. <variant>.json      — one file per trained extractor
//                            (feature table, weights, settings,
//                            or memorised patterns)
//   2. gazetteer.json      — the alias tables used in training
//   3. train_config.json   — the run's hyperparameters
//
// Feature strings are built from canonical forms, so eval and
// run always reload the gazetteer saved here.
//
// File naming convention:
//   checkpoints/
//     classifier.json
//     global.json
//     linked.json
//     gazetteer.json
//     train_config.json
//     metrics.csv          (written by MetricsLogger)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::domain::traits::Persistable;
use crate::ml::extractor::{Extractor, ModelKind};
use crate::ml::lexicon::Gazetteer;

/// Manages saving and loading of trained extractors.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    /// Path to the directory where checkpoints are stored
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    fn extractor_path(&self, kind: ModelKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.name()))
    }

    /// Write a trained extractor to {dir}/{variant}.json
    pub fn save_extractor(&self, extractor: &Extractor) -> Result<()> {
        let path = self.extractor_path(extractor.kind());
        extractor.save(&path)?;
        tracing::info!("Saved {} extractor to '{}'", extractor.name(), path.display());
        Ok(())
    }

    pub fn load_extractor(&self, kind: ModelKind) -> Result<Extractor> {
        let path      = self.extractor_path(kind);
        let extractor = Extractor::load(&path)?;
        if extractor.kind() != kind {
            anyhow::bail!(
                "'{}' holds a {} extractor, expected {}",
                path.display(),
                extractor.name(),
                kind.name()
            );
        }
        tracing::debug!("Loaded {} extractor from '{}'", kind.name(), path.display());
        Ok(extractor)
    }

    pub fn save_gazetteer(&self, gazetteer: &Gazetteer) -> Result<()> {
        gazetteer.save(&self.dir.join("gazetteer.json"))
    }

    /// The saved tables, or the built-in ones for checkpoints
    /// written without a gazetteer file
    pub fn load_gazetteer(&self) -> Result<Gazetteer> {
        let path = self.dir.join("gazetteer.json");
        if path.exists() {
            Gazetteer::load(&path)
        } else {
            tracing::warn!("No gazetteer in '{}', using built-in tables", self.dir.display());
            Ok(Gazetteer::default())
        }
    }

    /// Save the training configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration from JSON.
    #[cfg(test)]
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' first.",
                path.display()
            )
        })?;

        Ok(serde_json::from_str(&json)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::extractor::ModelSettings;

    #[test]
    fn test_extractor_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("ckpt"));

        let ex = Extractor::new(ModelKind::Global, &ModelSettings::default());
        ckpt.save_extractor(&ex).unwrap();
        assert!(dir.path().join("ckpt/global.json").exists());

        let back = ckpt.load_extractor(ModelKind::Global).unwrap();
        assert_eq!(back.kind(), ModelKind::Global);
    }

    #[test]
    fn test_missing_extractor_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let err  = ckpt.load_extractor(ModelKind::Linked).unwrap_err();
        assert!(format!("{err:#}").contains("linked.json"));
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let cfg  = TrainConfig { passes: 3, perceptron: true, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        assert_eq!(ckpt.load_config().unwrap(), cfg);
    }

    #[test]
    fn test_gazetteer_defaults_when_absent() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        assert_eq!(ckpt.load_gazetteer().unwrap(), Gazetteer::default());
    }
}
