// ============================================================
// Layer 5 — Local Scorer
// ============================================================
// A LinearModel is the whole learned state: the feature table
// plus the weight store. Scoring a feature set is the sum of
// its weights.
//
// Training and inference read the model differently:
//
//   TrainingScorer  — allocates ids for new keys and writes the
//                     lazy decay back into the store
//   InferenceScorer — looks keys up only; unknown keys score 0
//                     and nothing in the model changes
//
// Decoders are generic over the Scorer trait so the same search
// code runs on both paths.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::annotation::Position;
use crate::domain::document::Document;
use crate::ml::features;
use crate::ml::label::Label;
use crate::ml::lexicon::Lexicon;
use crate::ml::weights::{FeatureId, FeatureTable, UpdateRule, WeightStore};

// ─── LinearModel ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub features: FeatureTable,
    pub weights:  WeightStore,
}

impl LinearModel {
    pub fn new(rule: UpdateRule) -> Self {
        Self {
            features: FeatureTable::new(),
            weights:  WeightStore::new(rule),
        }
    }

    /// Intern `key` and make sure it has a weight entry
    pub fn feature(&mut self, key: &str) -> FeatureId {
        let id = self.features.get_or_create(key);
        self.weights.ensure(id);
        id
    }

    /// Read-only weight of a key (0 when never seen)
    #[cfg(test)]
    pub fn weight_of(&self, key: &str) -> f64 {
        self.features
            .lookup(key)
            .map_or(0.0, |id| self.weights.current_value(id))
    }
}

// ─── Scorer ───────────────────────────────────────────────────────────────────
pub trait Scorer {
    /// Id for a feature key, or None when the key is unknown and
    /// must not be created
    fn resolve(&mut self, key: &str) -> Option<FeatureId>;

    /// Current (fully decayed) weight of a feature
    fn weight(&mut self, id: FeatureId) -> f64;

    fn resolve_all(&mut self, keys: &[String]) -> Vec<FeatureId> {
        keys.iter().filter_map(|k| self.resolve(k)).collect()
    }

    /// Sum of weights, accumulated in order
    fn score(&mut self, ids: &[FeatureId]) -> f64 {
        let mut total = 0.0;
        for &id in ids {
            total += self.weight(id);
        }
        total
    }
}

pub struct TrainingScorer<'m> {
    model: &'m mut LinearModel,
}

impl<'m> TrainingScorer<'m> {
    pub fn new(model: &'m mut LinearModel) -> Self {
        Self { model }
    }
}

impl Scorer for TrainingScorer<'_> {
    fn resolve(&mut self, key: &str) -> Option<FeatureId> {
        Some(self.model.feature(key))
    }

    fn weight(&mut self, id: FeatureId) -> f64 {
        self.model.weights.refresh(id)
    }
}

pub struct InferenceScorer<'m> {
    model: &'m LinearModel,
}

impl<'m> InferenceScorer<'m> {
    pub fn new(model: &'m LinearModel) -> Self {
        Self { model }
    }
}

impl Scorer for InferenceScorer<'_> {
    fn resolve(&mut self, key: &str) -> Option<FeatureId> {
        self.model.features.lookup(key)
    }

    fn weight(&mut self, id: FeatureId) -> f64 {
        self.model.weights.current_value(id)
    }
}

// ─── Slot ─────────────────────────────────────────────────────────────────────
/// Whether a field holds an amount or a currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Amount,
    Currency,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Amount   => "amount",
            FieldKind::Currency => "currency",
        }
    }
}

/// What a label is assigned to: a token, or the explicit
/// "nothing" choice of a field. Tokens order before Absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Token(Position),
    Absent(FieldKind),
}

// ─── FeatureCache ─────────────────────────────────────────────────────────────
/// Per-document cache of resolved feature ids, keyed by
/// (slot, label). Lives for one training step (gold + free
/// decode) or one extraction.
#[derive(Debug, Default)]
pub struct FeatureCache {
    entries: HashMap<(Slot, Label), Vec<FeatureId>>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context features of a token under `label`
    pub fn token<S: Scorer>(
        &mut self,
        scorer:  &mut S,
        doc:     &Document,
        lexicon: &Lexicon,
        pos:     Position,
        label:   Label,
    ) -> &[FeatureId] {
        self.entries
            .entry((Slot::Token(pos), label))
            .or_insert_with(|| {
                let keys = features::context_features(doc, pos, label.name(), lexicon);
                scorer.resolve_all(&keys)
            })
    }

    /// The single bias feature of an absent field
    pub fn absent<S: Scorer>(&mut self, scorer: &mut S, kind: FieldKind, label: Label) -> &[FeatureId] {
        self.entries
            .entry((Slot::Absent(kind), label))
            .or_insert_with(|| {
                let key = format!("BIAS_{}_{}", label.name(), kind.name());
                scorer.resolve(&key).into_iter().collect()
            })
    }

    /// Previously built features for (slot, label); empty if none
    pub fn get(&self, slot: Slot, label: Label) -> &[FeatureId] {
        self.entries
            .get(&(slot, label))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Score of a token under `label`
    pub fn score_token<S: Scorer>(
        &mut self,
        scorer:  &mut S,
        doc:     &Document,
        lexicon: &Lexicon,
        pos:     Position,
        label:   Label,
    ) -> f64 {
        let ids = self.token(scorer, doc, lexicon, pos, label).to_vec();
        scorer.score(&ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new("t", vec![vec!["have".into(), "100".into(), "usd".into()]])
    }

    #[test]
    fn test_inference_scorer_never_creates_features() {
        let model = LinearModel::new(UpdateRule::default());
        let lex = Lexicon::default();
        let mut cache = FeatureCache::new();
        let mut scorer = InferenceScorer::new(&model);
        let ids = cache.token(&mut scorer, &doc(), &lex, Position::new(0, 1), Label::Have);
        assert!(ids.is_empty());
        assert!(model.features.is_empty());
    }

    #[test]
    fn test_training_scorer_interns_and_scores() {
        let mut model = LinearModel::new(UpdateRule { perceptron: true, ..UpdateRule::default() });
        let lex = Lexicon::default();
        let id = model.feature("cw_100_have");
        model.weights.accumulate_gradient(id, -2.0);
        model.weights.apply_step();

        let mut cache = FeatureCache::new();
        let mut scorer = TrainingScorer::new(&mut model);
        let s = cache.score_token(&mut scorer, &doc(), &lex, Position::new(0, 1), Label::Have);
        assert_eq!(s, 2.0);
        assert!(model.features.len() > 1);
        assert_eq!(model.weight_of("cw_100_have"), 2.0);
    }

    #[test]
    fn test_absent_uses_bias_key() {
        let mut model = LinearModel::new(UpdateRule::default());
        let mut cache = FeatureCache::new();
        let mut scorer = TrainingScorer::new(&mut model);
        let ids = cache.absent(&mut scorer, FieldKind::Currency, Label::Want).to_vec();
        assert_eq!(ids.len(), 1);
        assert_eq!(model.features.name(ids[0]), Some("BIAS_want_currency"));
    }
}
