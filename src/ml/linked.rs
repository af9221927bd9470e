// ============================================================
// Layer 5 — Linked Group Decoder
// ============================================================
// Tokens sharing a canonical form are labelled together:
//
//   "have 10 usd, will take 12 dollars or usd"
//     group "usd" → (0,2) (0,6) (0,8)      one label for all three
//
// A group's score under a label is the sum of its members'
// token scores under that label. The search lattice has one
// dimension per group; there are no interaction features.
//
// Gold for a group is approximate. A label is gold for a member
// when the member carries every tag of the label; background is
// gold for every member when no member supports any other
// label. A group is gold for a label when any member is.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::domain::annotation::{Annotation, Position, Tag};
use crate::domain::document::Document;
use crate::error::{ExtractError, Result};
use crate::ml::decoder::{Assigned, DecodeMode, Decoded, Decoder};
use crate::ml::label::Label;
use crate::ml::lexicon::Lexicon;
use crate::ml::scorer::{FeatureCache, Scorer, Slot};
use crate::ml::search::{best_first, SearchConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDecoder {
    pub search: SearchConfig,

    /// Margin added per non-gold member in loss-augmented decoding
    pub loss: f64,
}

impl Default for GroupDecoder {
    fn default() -> Self {
        Self {
            search: SearchConfig::groups(),
            loss:   1.0,
        }
    }
}

/// Positions of a document keyed by canonical form
pub fn group_positions(doc: &Document, lexicon: &Lexicon) -> BTreeMap<String, Vec<Position>> {
    let mut groups: BTreeMap<String, Vec<Position>> = BTreeMap::new();
    for pos in doc.positions() {
        let (_, canon) = lexicon.canonicalize(pos, doc);
        groups.entry(canon).or_default().push(pos);
    }
    groups
}

impl Decoder for GroupDecoder {
    fn name(&self) -> &'static str {
        "linked"
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

        let empty = BTreeSet::new();
        let tags_of = |pos: Position| gold.and_then(|g| g.tags_at(pos)).unwrap_or(&empty);

        // ── Step 1: scored label options per group ────────────────────────────
        let groups = group_positions(doc, lexicon);
        let mut options: Vec<Vec<(f64, Label)>> = Vec::with_capacity(groups.len());

        for (canon, members) in &groups {
            let supported = members.iter().any(|&m| {
                Label::ALL.iter().any(|l| l.supported_by(tags_of(m)))
            });

            let mut scored = Vec::with_capacity(Label::ALL.len());
            for label in Label::ALL {
                let member_gold = |m: Position| match label {
                    Label::Background => !supported,
                    _ => label.supported_by(tags_of(m)),
                };
                let group_gold = members.iter().any(|&m| member_gold(m));
                if mode.restricted() && !group_gold {
                    continue;
                }

                let mut score = 0.0;
                for &m in members {
                    score += cache.score_token(scorer, doc, lexicon, m, label);
                    if mode.augmented() && !member_gold(m) {
                        score += self.loss;
                    }
                }
                scored.push((score, label));
            }

            if scored.is_empty() {
                return Err(ExtractError::EmptyCandidates(canon.clone()));
            }

            // ── Step 2: best first, ties by the greater label name ────────────
            scored.sort_by(|a, b| {
                b.0.total_cmp(&a.0).then_with(|| b.1.name().cmp(a.1.name()))
            });
            options.push(scored);
        }

        // ── Step 3: search one rank per group ─────────────────────────────────
        let dims: Vec<usize> = options.iter().map(Vec::len).collect();
        let outcome = best_first(
            &dims,
            &[],
            |ranks| ranks.iter().zip(&options).map(|(&r, opts)| opts[r].0).sum(),
            &self.search,
        );
        debug!(
            document   = %doc.source,
            groups     = groups.len(),
            expansions = outcome.expansions,
            "group search finished"
        );

        let mut out = Decoded {
            score: outcome.score,
            ..Decoded::default()
        };
        for ((_, members), (&r, opts)) in groups.iter().zip(outcome.ranks.iter().zip(&options)) {
            let label = opts[r].1;
            for &m in members {
                out.features.extend_from_slice(cache.get(Slot::Token(m), label));
                out.assignment.push(Assigned::token(m, label));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::LabeledDocument;
    use crate::ml::scorer::{InferenceScorer, LinearModel, TrainingScorer};
    use crate::ml::trainer::{train, LearnerConfig};
    use crate::ml::weights::UpdateRule;

    fn doc(text: &str) -> Document {
        Document::new(text, vec![text.split_whitespace().map(String::from).collect()])
    }

    fn decode_gold(d: &Document, gold: &Annotation) -> Decoded {
        let mut model = LinearModel::new(UpdateRule::default());
        let mut scorer = TrainingScorer::new(&mut model);
        GroupDecoder::default()
            .decode(&mut scorer, &mut FeatureCache::new(), d, &Lexicon::default(), Some(gold), DecodeMode::Gold)
            .unwrap()
    }

    #[test]
    fn test_groups_follow_canonical_form() {
        let d = doc("usd 5 USD dollars 5");
        let groups = group_positions(&d, &Lexicon::default());
        assert_eq!(groups["usd"].len(), 3);
        assert_eq!(groups["5"], vec![Position::new(0, 1), Position::new(0, 4)]);
    }

    #[test]
    fn test_any_gold_member_labels_whole_group() {
        let d = doc("have 10 usd or 12 usd");
        let mut gold = Annotation::new();
        gold.add(Tag::Have, Position::new(0, 1));
        gold.add(Tag::Have, Position::new(0, 2));

        let ann = decode_gold(&d, &gold).to_annotation();
        assert_eq!(
            ann.positions(Tag::Have),
            &[Position::new(0, 1), Position::new(0, 2), Position::new(0, 5)]
        );
    }

    #[test]
    fn test_have_want_needs_both_tags() {
        let d = doc("swap 10 usd");
        let mut gold = Annotation::new();
        gold.add(Tag::Have, Position::new(0, 2));
        gold.add(Tag::Want, Position::new(0, 2));

        let decoded = decode_gold(&d, &gold);
        let usd = decoded
            .assignment
            .iter()
            .find(|a| a.slot == Slot::Token(Position::new(0, 2)))
            .unwrap();
        // have, want and have-want are all gold here; the search keeps the first option
        assert!(matches!(usd.label, Label::Have | Label::Want | Label::HaveWant));
        let bg = decoded
            .assignment
            .iter()
            .find(|a| a.slot == Slot::Token(Position::new(0, 0)))
            .unwrap();
        assert_eq!(bg.label, Label::Background);
    }

    #[test]
    fn test_every_token_is_assigned() {
        let d = doc("have 10 usd");
        let model = LinearModel::new(UpdateRule::default());
        let mut scorer = InferenceScorer::new(&model);
        let decoded = GroupDecoder::default()
            .decode(&mut scorer, &mut FeatureCache::new(), &d, &Lexicon::default(), None, DecodeMode::Plain)
            .unwrap();
        assert_eq!(decoded.assignment.len(), 3);
    }

    #[test]
    fn test_learns_simple_offer() {
        let data: Vec<LabeledDocument> = [("100", "90"), ("20", "18"), ("7", "6"), ("300", "280")]
            .iter()
            .map(|(h, w)| {
                let mut gold = Annotation::new();
                gold.add(Tag::Have, Position::new(0, 1));
                gold.add(Tag::Have, Position::new(0, 2));
                gold.add(Tag::Want, Position::new(0, 4));
                gold.add(Tag::Want, Position::new(0, 5));
                LabeledDocument::with_gold(doc(&format!("have {h} usd want {w} eur")), gold)
            })
            .collect();

        let mut model = LinearModel::new(UpdateRule { perceptron: true, ..UpdateRule::default() });
        let lex = Lexicon::default();
        let decoder = GroupDecoder::default();
        train(&decoder, &mut model, &data, &lex, &LearnerConfig { passes: 6, ..LearnerConfig::default() })
            .unwrap();

        let mut scorer = InferenceScorer::new(&model);
        let ann = decoder
            .decode(&mut scorer, &mut FeatureCache::new(), &doc("have 50 usd want 45 eur"), &lex, None, DecodeMode::Plain)
            .unwrap()
            .to_annotation();
        assert_eq!(ann.positions(Tag::Have), &[Position::new(0, 1), Position::new(0, 2)]);
        assert_eq!(ann.positions(Tag::Want), &[Position::new(0, 4), Position::new(0, 5)]);
    }
}
