// ============================================================
// Layer 5 — Per-token Classifier
// ============================================================
// Baseline decoder: every token is labelled independently with
// the best of {have, want, have-want, rate, background}.
//
// During loss-augmented decoding each wrong label gets a margin
// bonus depending on the kind of mistake it would be:
//
//   gold is background          → false_positive
//   candidate is background     → false_negative
//   both non-background         → false_discovery
//
// Equal scores go to the lexicographically greatest label name.

use serde::{Deserialize, Serialize};

use crate::domain::annotation::Annotation;
use crate::domain::document::Document;
use crate::error::{ExtractError, Result};
use crate::ml::decoder::{Assigned, DecodeMode, Decoded, Decoder};
use crate::ml::label::Label;
use crate::ml::lexicon::Lexicon;
use crate::ml::scorer::{FeatureCache, Scorer, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossWeights {
    pub false_negative:  f64,
    pub false_positive:  f64,
    pub false_discovery: f64,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self {
            false_negative:  1.0,
            false_positive:  1.0,
            false_discovery: 1.0,
        }
    }
}

impl LossWeights {
    pub fn margin(&self, gold: Label, candidate: Label) -> f64 {
        if gold == candidate {
            0.0
        } else if gold == Label::Background {
            self.false_positive
        } else if candidate == Label::Background {
            self.false_negative
        } else {
            self.false_discovery
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenDecoder {
    #[serde(default)]
    pub loss: LossWeights,
}

impl Decoder for TokenDecoder {
    fn name(&self) -> &'static str {
        "classifier"
    }

    fn decode<S: Scorer>(
        &self,
        scorer:  &mut S,
        cache:   &mut FeatureCache,
        doc:     &Document,
        lexicon: &Lexicon,
        gold:    Option<&Annotation>,
        mode:    DecodeMode,
    ) -> Result<Decoded> {
        if mode.restricted() && gold.is_none() {
            return Err(ExtractError::MissingGold(doc.source.clone()));
        }

        let mut out = Decoded::default();

        for pos in doc.positions() {
            let correct = gold.map(|g| Label::from_tags(g.tags_at(pos)));

            let candidates: Vec<Label> = match (mode, correct) {
                (DecodeMode::Gold, Some(label)) => vec![label],
                _ => Label::ALL.to_vec(),
            };

            let mut best: Option<(f64, Label)> = None;
            for label in candidates {
                let ids = cache.token(scorer, doc, lexicon, pos, label).to_vec();
                let mut total = scorer.score(&ids);
                if let (true, Some(gold_label)) = (mode.augmented(), correct) {
                    total += self.loss.margin(gold_label, label);
                }

                let better = match best {
                    None => true,
                    Some((s, l)) => total > s || (total == s && label.name() > l.name()),
                };
                if better {
                    best = Some((total, label));
                }
            }

            if let Some((total, label)) = best {
                out.score += total;
                out.features.extend_from_slice(cache.get(Slot::Token(pos), label));
                out.assignment.push(Assigned::token(pos, label));
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::annotation::{Position, Tag};
    use crate::ml::scorer::{InferenceScorer, LinearModel, TrainingScorer};
    use crate::ml::weights::UpdateRule;

    fn doc() -> Document {
        Document::new("t", vec![vec!["have".into(), "100".into(), "usd".into()]])
    }

    #[test]
    fn test_untrained_ties_go_to_greatest_name() {
        let model = LinearModel::new(UpdateRule::default());
        let mut scorer = InferenceScorer::new(&model);
        let decoded = TokenDecoder::default()
            .decode(&mut scorer, &mut FeatureCache::new(), &doc(), &Lexicon::default(), None, DecodeMode::Plain)
            .unwrap();
        assert_eq!(decoded.assignment.len(), 3);
        assert!(decoded.assignment.iter().all(|a| a.label == Label::Want));
    }

    #[test]
    fn test_gold_mode_follows_annotation() {
        let mut gold = Annotation::new();
        gold.add(Tag::Have, Position::new(0, 1));
        gold.add(Tag::Want, Position::new(0, 1));

        let mut model = LinearModel::new(UpdateRule::default());
        let mut scorer = TrainingScorer::new(&mut model);
        let decoded = TokenDecoder::default()
            .decode(&mut scorer, &mut FeatureCache::new(), &doc(), &Lexicon::default(), Some(&gold), DecodeMode::Gold)
            .unwrap();
        let labels: Vec<Label> = decoded.assignment.iter().map(|a| a.label).collect();
        assert_eq!(labels, vec![Label::Background, Label::HaveWant, Label::Background]);
        assert!(!decoded.features.is_empty());
    }

    #[test]
    fn test_gold_mode_without_gold_is_an_error() {
        let model = LinearModel::new(UpdateRule::default());
        let mut scorer = InferenceScorer::new(&model);
        let err = TokenDecoder::default()
            .decode(&mut scorer, &mut FeatureCache::new(), &doc(), &Lexicon::default(), None, DecodeMode::Gold)
            .unwrap_err();
        assert!(matches!(err, ExtractError::MissingGold(_)));
    }

    #[test]
    fn test_margins_by_mistake_kind() {
        let loss = LossWeights { false_negative: 2.0, false_positive: 3.0, false_discovery: 5.0 };
        assert_eq!(loss.margin(Label::Have, Label::Have), 0.0);
        assert_eq!(loss.margin(Label::Background, Label::Rate), 3.0);
        assert_eq!(loss.margin(Label::Have, Label::Background), 2.0);
        assert_eq!(loss.margin(Label::Have, Label::Want), 5.0);
    }
}
