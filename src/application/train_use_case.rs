// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the gazetteer           (Layer 6 - infra)
//   Step 2: Load annotated documents     (Layer 4 - data)
//   Step 3: Hold out documents (optional)(Layer 4 - data)
//   Step 4: Save config and gazetteer    (Layer 6 - infra)
//   Step 5: Train each selected variant  (Layer 5 - ml)
//   Step 6: Score the held-out documents (Layer 6 - infra)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::application::extract_use_case::evaluate;
use crate::data::{loader::CorpusLoader, splitter::split_train_val};
use crate::domain::traits::CorpusSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    evaluation::EvalSummary,
    gazetteer_store::GazetteerStore,
    metrics::MetricsLogger,
};
use crate::ml::extractor::{Extractor, ModelKind, ModelSettings};
use crate::ml::lexicon::Lexicon;
use crate::ml::trainer::LearnerConfig;
use crate::ml::weights::UpdateRule;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the trained extractors as train_config.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_data:     String,
    pub checkpoint_dir: String,

    /// "all" or a comma separated list of variant names
    pub models:         String,
    pub passes:         usize,
    pub batch_size:     usize,
    pub step:           f64,
    pub reg:            f64,
    pub perceptron:     bool,
    pub fraction:       f64,

    pub search_steps:     Option<usize>,
    pub search_steps_max: Option<usize>,

    /// Share of documents held out for scoring (0 disables)
    pub holdout:        f64,
    pub seed:           u64,
    pub gazetteer:      Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let rule    = UpdateRule::default();
        let learner = LearnerConfig::default();
        Self {
            train_data:       "data/train.list".to_string(),
            checkpoint_dir:   "checkpoints".to_string(),
            models:           "all".to_string(),
            passes:           learner.passes,
            batch_size:       learner.batch_size,
            step:             rule.step,
            reg:              rule.reg,
            perceptron:       rule.perceptron,
            fraction:         learner.fraction,
            search_steps:     None,
            search_steps_max: None,
            holdout:          0.0,
            seed:             0,
            gazetteer:        None,
        }
    }
}

impl TrainConfig {
    /// Settings every selected extractor is built from
    pub fn settings(&self) -> ModelSettings {
        ModelSettings {
            rule: UpdateRule {
                step:       self.step,
                reg:        self.reg,
                perceptron: self.perceptron,
            },
            learner: LearnerConfig {
                passes:     self.passes,
                batch_size: self.batch_size.max(1),
                fraction:   self.fraction,
            },
            search_steps:     self.search_steps,
            search_steps_max: self.search_steps_max,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    /// Returns the held-out scores when a holdout was requested.
    pub fn execute(&self) -> Result<Option<EvalSummary>> {
        let cfg   = &self.config;
        let kinds = ModelKind::parse_list(&cfg.models)?;

        // ── Step 1: Gazetteer ─────────────────────────────────────────────────
        let gazetteer = GazetteerStore::new(cfg.gazetteer.as_ref()).load()?;
        let lexicon   = Lexicon::new(&gazetteer);

        // ── Step 2: Load annotated documents ──────────────────────────────────
        let docs = CorpusLoader::annotated(&cfg.train_data).load_all()?;

        // ── Step 3: Optional held-out split ───────────────────────────────────
        let (train_docs, held_out) = if cfg.holdout > 0.0 {
            split_train_val(docs, 1.0 - cfg.holdout, cfg.seed)
        } else {
            (docs, Vec::new())
        };
        tracing::info!(
            "Training on {} documents ({} held out)",
            train_docs.len(),
            held_out.len()
        );

        // ── Step 4: Save config and gazetteer ─────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save_config(cfg)?;
        ckpt.save_gazetteer(&gazetteer)?;

        // ── Step 5: Train each variant ────────────────────────────────────────
        let metrics  = MetricsLogger::new(&cfg.checkpoint_dir)?;
        let settings = cfg.settings();
        let mut trained = Vec::with_capacity(kinds.len());

        for kind in kinds {
            tracing::info!("Training {}", kind.name());
            let mut extractor = Extractor::new(kind, &settings);
            let stats = extractor.train(&train_docs, &lexicon)?;
            for s in &stats {
                metrics.log(kind.name(), s)?;
            }
            ckpt.save_extractor(&extractor)?;
            trained.push(extractor);
        }

        // ── Step 6: Score held-out documents ──────────────────────────────────
        if held_out.is_empty() {
            return Ok(None);
        }
        let summary = evaluate(&trained, &held_out, &lexicon, false)?;
        Ok(Some(summary))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::extract_use_case::tests::write_corpus;
    use std::path::Path;

    fn config(dir: &Path, models: &str) -> TrainConfig {
        TrainConfig {
            train_data:     write_corpus(dir).display().to_string(),
            checkpoint_dir: dir.join("ckpt").display().to_string(),
            models:         models.to_string(),
            passes:         2,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_default_matches_learner_defaults() {
        let s = TrainConfig::default().settings();
        assert_eq!(s.rule, UpdateRule::default());
        assert_eq!(s.learner, LearnerConfig::default());
    }

    #[test]
    fn test_trains_and_saves_selected_variants() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "fixed_order,global");

        let summary = TrainUseCase::new(cfg).execute().unwrap();
        assert!(summary.is_none());

        let ckpt = dir.path().join("ckpt");
        assert!(ckpt.join("fixed_order.json").exists());
        assert!(ckpt.join("global.json").exists());
        assert!(!ckpt.join("linked.json").exists());
        assert!(ckpt.join("train_config.json").exists());
        assert!(ckpt.join("gazetteer.json").exists());

        // header + one row per pass of the learned variant
        let csv = std::fs::read_to_string(ckpt.join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_holdout_is_scored() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { holdout: 0.5, ..config(dir.path(), "pattern") };

        let summary = TrainUseCase::new(cfg).execute().unwrap().unwrap();
        assert_eq!(summary.totals("pattern", true).unwrap().documents, 3);
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), "neural");
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
