// ============================================================
// Layer 5 — Online Training Loop
// ============================================================
// Structured perceptron / loss-augmented AdaGrad over whole
// documents. Per pass:
//
//   1. reshuffle the document order with a pass-seeded RNG
//   2. per document, decode twice with a shared feature cache:
//        gold  — only gold-supported options
//        free  — every option (+ loss unless perceptron)
//   3. if the assignments differ:
//        gradient −1 on every gold feature
//        gradient +1 on every free feature
//   4. commit a weight step every `batch_size` documents
//
// Feature ids are allocated while decoding, so the order in
// which documents are seen decides which ids exist first. The
// per-pass seed makes that order reproducible.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::document::LabeledDocument;
use crate::error::{ExtractError, Result};
use crate::ml::decoder::{DecodeMode, Decoder};
use crate::ml::lexicon::Lexicon;
use crate::ml::scorer::{FeatureCache, LinearModel, TrainingScorer};

// ─── LearnerConfig ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearnerConfig {
    pub passes:     usize,
    pub batch_size: usize,

    /// Leading share of the corpus used for training
    pub fraction:   f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            passes:     6,
            batch_size: 1,
            fraction:   1.0,
        }
    }
}

// ─── PassStats ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassStats {
    pub pass:       usize,
    pub documents:  usize,

    /// Documents whose free decode disagreed with the gold decode
    pub mismatches: usize,

    /// Σ (free score − gold score)
    pub objective:  f64,
}

impl PassStats {
    pub fn mismatch_rate(&self) -> f64 {
        if self.documents == 0 {
            0.0
        } else {
            self.mismatches as f64 / self.documents as f64
        }
    }
}

/// Train `model` in place and return one summary per pass.
pub fn train<D: Decoder>(
    decoder: &D,
    model:   &mut LinearModel,
    data:    &[LabeledDocument],
    lexicon: &Lexicon,
    config:  &LearnerConfig,
) -> Result<Vec<PassStats>> {
    let free_mode = if model.weights.rule().perceptron {
        DecodeMode::Plain
    } else {
        DecodeMode::LossAugmented
    };
    let used       = (config.fraction.clamp(0.0, 1.0) * data.len() as f64).floor() as usize;
    let batch_size = config.batch_size.max(1);
    let mut order: Vec<usize> = (0..used).collect();
    let mut history = Vec::with_capacity(config.passes);

    info!(
        decoder   = decoder.name(),
        documents = used,
        passes    = config.passes,
        "starting training"
    );

    for pass in 0..config.passes {
        let mut rng = StdRng::seed_from_u64(pass as u64);
        order.shuffle(&mut rng);

        let mut stats = PassStats { pass, documents: 0, mismatches: 0, objective: 0.0 };

        for (seen, &index) in order.iter().enumerate() {
            let example = &data[index];
            let doc     = &example.document;
            let gold    = example
                .gold
                .as_ref()
                .ok_or_else(|| ExtractError::MissingGold(doc.source.clone()))?;

            // ── gold and free decode share one cache ──────────────────────────
            let mut cache = FeatureCache::new();
            let (best_gold, best_free) = {
                let mut scorer = TrainingScorer::new(model);
                let g = decoder.decode(&mut scorer, &mut cache, doc, lexicon, Some(gold), DecodeMode::Gold)?;
                let f = decoder.decode(&mut scorer, &mut cache, doc, lexicon, Some(gold), free_mode)?;
                (g, f)
            };

            stats.documents += 1;
            stats.objective += best_free.score - best_gold.score;

            if best_gold.assignment != best_free.assignment {
                stats.mismatches += 1;
                debug!(document = %doc.source, "gold and free decodes differ");
                for &id in &best_gold.features {
                    model.weights.accumulate_gradient(id, -1.0);
                }
                for &id in &best_free.features {
                    model.weights.accumulate_gradient(id, 1.0);
                }
            }

            if (seen + 1) % batch_size == 0 {
                model.weights.apply_step();
            }
        }

        info!(
            pass,
            documents     = stats.documents,
            mismatches    = stats.mismatches,
            mismatch_rate = stats.mismatch_rate(),
            objective     = stats.objective,
            "training pass finished"
        );
        history.push(stats);
    }

    // a trailing partial batch is committed so nothing stays pending
    if model.weights.has_pending() {
        model.weights.apply_step();
    }

    Ok(history)
}
