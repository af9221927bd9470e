// ============================================================
// Layer 5 — Joint Field Decoder
// ============================================================
// Reads exactly one exchange out of a document: five fields,
// each filled by one token or left absent.
//
//   have_amount  have_currency  want_amount  want_currency  rate
//
// Step 1 scores every token as a candidate for every field of
// its label. CURRENCY tokens go to the currency field and all
// other tokens to the amount field; rate only has an amount.
// Each field also gets a synthetic "absent" candidate scored by
// a single BIAS feature.
//
// Step 2 sorts each candidate list best-first.
//
// Step 3 searches the 5-d rank lattice. An assignment's score is
// the five candidate scores plus interaction features between
// the chosen tokens (their words, mapped symbols, trading words
// between them, bucketed distance) and one feature for the
// left-to-right order of the fields that are present.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::domain::annotation::{Annotation, Position, Tag};
use crate::domain::document::Document;
use crate::error::{ExtractError, Result};
use crate::ml::decoder::{Assigned, DecodeMode, Decoded, Decoder};
use crate::ml::label::Label;
use crate::ml::lexicon::{Category, Lexicon, UNKNOWN_SYMBOL};
use crate::ml::scorer::{FeatureCache, FieldKind, Scorer, Slot};
use crate::ml::search::{best_first, SearchConfig};

// ─── Field ────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    HaveAmount,
    HaveCurrency,
    WantAmount,
    WantCurrency,
    RateAmount,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::HaveAmount,
        Field::HaveCurrency,
        Field::WantAmount,
        Field::WantCurrency,
        Field::RateAmount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::HaveAmount   => "have_amount",
            Field::HaveCurrency => "have_currency",
            Field::WantAmount   => "want_amount",
            Field::WantCurrency => "want_currency",
            Field::RateAmount   => "rate",
        }
    }

    pub fn tag(self) -> Tag {
        match self {
            Field::HaveAmount | Field::HaveCurrency => Tag::Have,
            Field::WantAmount | Field::WantCurrency => Tag::Want,
            Field::RateAmount                      => Tag::Rate,
        }
    }

    pub fn label(self) -> Label {
        Label::from(self.tag())
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::HaveCurrency | Field::WantCurrency => FieldKind::Currency,
            _ => FieldKind::Amount,
        }
    }

    /// Fields a tag fills, amount first
    fn of_tag(tag: Tag) -> &'static [Field] {
        match tag {
            Tag::Have => &[Field::HaveAmount, Field::HaveCurrency],
            Tag::Want => &[Field::WantAmount, Field::WantCurrency],
            Tag::Rate => &[Field::RateAmount],
        }
    }

    /// Field a token lands in for `tag`, by its single-token class
    fn for_token(tag: Tag, category: Category) -> Field {
        match (tag, category) {
            (Tag::Have, Category::Currency) => Field::HaveCurrency,
            (Tag::Have, _)                  => Field::HaveAmount,
            (Tag::Want, Category::Currency) => Field::WantCurrency,
            (Tag::Want, _)                  => Field::WantAmount,
            (Tag::Rate, _)                  => Field::RateAmount,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

// ─── FieldDecoder ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecoder {
    pub search: SearchConfig,

    /// Margin added to wrong candidates in loss-augmented decoding
    pub loss: f64,
}

impl Default for FieldDecoder {
    fn default() -> Self {
        Self {
            search: SearchConfig::fields(),
            loss:   1.0,
        }
    }
}

impl Decoder for FieldDecoder {
    fn name(&self) -> &'static str {
        "global"
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

        let lattice = Lattice::build(self.loss, scorer, cache, doc, lexicon, gold, mode)?;
        let dims    = lattice.dims();
        let seeds: Vec<Vec<usize>> = lattice.absent_ranks().into_iter().collect();

        let outcome = best_first(
            &dims,
            &seeds,
            |ranks| lattice.score(scorer, lexicon, ranks),
            &self.search,
        );
        debug!(
            document   = %doc.source,
            expansions = outcome.expansions,
            score      = outcome.score,
            "field search finished"
        );

        let mut out = Decoded {
            score: outcome.score,
            ..Decoded::default()
        };
        out.features = scorer.resolve_all(&lattice.interaction_keys(lexicon, &outcome.ranks));
        for (field, slot) in lattice.chosen(&outcome.ranks) {
            let label = field.label();
            out.features.extend_from_slice(cache.get(slot, label));
            out.assignment.push(Assigned { slot, label });
        }
        Ok(out)
    }
}

// ─── Lattice ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
struct Candidate {
    slot:  Slot,
    score: f64,
}

/// Sorted candidate lists of one document, one per field
struct Lattice<'d> {
    doc:   &'d Document,
    lists: Vec<Vec<Candidate>>,
}

impl<'d> Lattice<'d> {
    fn build<S: Scorer>(
        loss:    f64,
        scorer:  &mut S,
        cache:   &mut FeatureCache,
        doc:     &'d Document,
        lexicon: &Lexicon,
        gold:    Option<&Annotation>,
        mode:    DecodeMode,
    ) -> Result<Self> {
        let mut lists: Vec<Vec<Candidate>> = vec![Vec::new(); Field::ALL.len()];

        for tag in Tag::ALL {
            let label = Label::from(tag);
            let mut gold_kinds: BTreeSet<FieldKind> = BTreeSet::new();

            // ── Step 1a: token candidates ─────────────────────────────────────
            for pos in doc.positions() {
                let is_gold = gold.is_some_and(|g| g.has_tag(pos, tag));
                if mode.restricted() && !is_gold {
                    continue;
                }
                let token = doc.token(pos).unwrap_or(UNKNOWN_SYMBOL);
                let field = Field::for_token(tag, lexicon.classify(token).category());
                if is_gold {
                    gold_kinds.insert(field.kind());
                }

                let mut score = cache.score_token(scorer, doc, lexicon, pos, label);
                if mode.augmented() && !is_gold {
                    score += loss;
                }
                lists[field.index()].push(Candidate { slot: Slot::Token(pos), score });
            }

            // ── Step 1b: absent candidates ────────────────────────────────────
            for &field in Field::of_tag(tag) {
                if mode.restricted() && !lists[field.index()].is_empty() {
                    continue;
                }
                let ids = cache.absent(scorer, field.kind(), label).to_vec();
                let mut score = scorer.score(&ids);
                if mode.augmented() && gold_kinds.contains(&field.kind()) {
                    score += loss;
                }
                lists[field.index()].push(Candidate { slot: Slot::Absent(field.kind()), score });
            }
        }

        // ── Step 2: best first, ties by slot ──────────────────────────────────
        for (field, list) in Field::ALL.iter().zip(lists.iter_mut()) {
            if list.is_empty() {
                return Err(ExtractError::EmptyCandidates(field.name().to_string()));
            }
            list.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.slot.cmp(&b.slot)));
        }

        Ok(Self { doc, lists })
    }

    fn dims(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }

    /// Ranks of the all-absent assignment, when every field has one
    fn absent_ranks(&self) -> Option<Vec<usize>> {
        self.lists
            .iter()
            .map(|list| list.iter().position(|c| matches!(c.slot, Slot::Absent(_))))
            .collect()
    }

    fn chosen(&self, ranks: &[usize]) -> Vec<(Field, Slot)> {
        Field::ALL
            .iter()
            .zip(ranks)
            .map(|(&field, &r)| (field, self.lists[field.index()][r].slot))
            .collect()
    }

    fn interaction_keys(&self, lexicon: &Lexicon, ranks: &[usize]) -> Vec<String> {
        let chosen: Vec<(Field, Option<Position>)> = self
            .chosen(ranks)
            .into_iter()
            .map(|(field, slot)| match slot {
                Slot::Token(pos) => (field, Some(pos)),
                Slot::Absent(_)  => (field, None),
            })
            .collect();
        interaction_features(self.doc, lexicon, &chosen)
    }

    fn score<S: Scorer>(&self, scorer: &mut S, lexicon: &Lexicon, ranks: &[usize]) -> f64 {
        let mut total = 0.0;
        for (field, &r) in Field::ALL.iter().zip(ranks) {
            total += self.lists[field.index()][r].score;
        }
        let ids = scorer.resolve_all(&self.interaction_keys(lexicon, ranks));
        total + scorer.score(&ids)
    }
}

// ─── Interaction features ─────────────────────────────────────────────────────
fn distance_bucket(d: isize) -> String {
    match d {
        -2..=2  => d.to_string(),
        3..=5   => "3to5".to_string(),
        -5..=-3 => "-5to-3".to_string(),
        d if d > 0 => "6+".to_string(),
        _ => "-6-".to_string(),
    }
}

/// Pair and order features of a full five-field assignment.
///
/// Pairs are taken over (later field, earlier field) in field
/// order and only when at least one side is present. The order
/// feature is only emitted when some field is present.
pub fn interaction_features(doc: &Document, lexicon: &Lexicon, chosen: &[(Field, Option<Position>)]) -> Vec<String> {
    let word = |pos: Option<Position>| -> String {
        pos.and_then(|p| doc.token(p))
            .map_or_else(|| UNKNOWN_SYMBOL.to_string(), str::to_lowercase)
    };

    let mut feats = Vec::new();

    for (i, &(f0, p0)) in chosen.iter().enumerate() {
        for &(f1, p1) in &chosen[..i] {
            if p0.is_none() && p1.is_none() {
                continue;
            }
            let (n0, n1) = (f0.name(), f1.name());
            let (w0, w1) = (word(p0), word(p1));
            let m0 = lexicon.classify(&w0).symbol();
            let m1 = lexicon.classify(&w1).symbol();

            feats.push(format!("PAIR_ww_{n0}_{n1}_{w0}_{w1}"));
            feats.push(format!("PAIR_wmwm_{n0}_{n1}_{m0}_{m1}"));

            let distance = match (p0, p1) {
                (Some(a), Some(b)) if a.line == b.line => {
                    let line = doc.line(a.line);
                    let (lo, hi) = (a.token.min(b.token), a.token.max(b.token));
                    let between = line[lo..hi.min(line.len())].iter().any(|t| lexicon.is_trading(t));
                    feats.push(format!("PAIR_trading_{n0}_{n1}_{between}"));
                    format!("toks={}", distance_bucket(a.token as isize - b.token as isize))
                }
                (Some(a), Some(b)) => format!("lines={}", distance_bucket(a.line as isize - b.line as isize)),
                _ => "NA".to_string(),
            };
            feats.push(format!("PAIR_dist_{n0}_{n1}_{distance}"));
        }
    }

    let mut present: Vec<(Position, &str)> = chosen
        .iter()
        .filter_map(|&(field, pos)| pos.map(|p| (p, field.name())))
        .collect();
    if !present.is_empty() {
        present.sort();
        let names: Vec<&str> = present.iter().map(|(_, n)| *n).collect();
        feats.push(format!("ORDER_{}", names.join("_")));
    }

    feats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::LabeledDocument;
    use crate::ml::scorer::{InferenceScorer, LinearModel, TrainingScorer};
    use crate::ml::trainer::{train, LearnerConfig};
    use crate::ml::weights::UpdateRule;

    fn doc(text: &str) -> Document {
        Document::new(
            text,
            text.lines()
                .map(|l| l.split_whitespace().map(String::from).collect())
                .collect(),
        )
    }

    fn offer(have: &str, want: &str) -> LabeledDocument {
        let text = format!("have {have} usd want {want} eur");
        let mut gold = Annotation::new();
        gold.add(Tag::Have, Position::new(0, 1));
        gold.add(Tag::Have, Position::new(0, 2));
        gold.add(Tag::Want, Position::new(0, 4));
        gold.add(Tag::Want, Position::new(0, 5));
        LabeledDocument::with_gold(doc(&text), gold)
    }

    fn corpus() -> Vec<LabeledDocument> {
        [("100", "90"), ("20", "18"), ("7", "6"), ("300", "280"), ("15", "12"), ("60", "55")]
            .iter()
            .map(|(h, w)| offer(h, w))
            .collect()
    }

    #[test]
    fn test_empty_document_is_all_absent_with_bias_only() {
        let mut model = LinearModel::new(UpdateRule::default());
        let lex = Lexicon::default();
        let empty = Document::new("empty", Vec::new());
        let decoded = {
            let mut scorer = TrainingScorer::new(&mut model);
            FieldDecoder::default()
                .decode(&mut scorer, &mut FeatureCache::new(), &empty, &lex, None, DecodeMode::Plain)
                .unwrap()
        };
        assert!(decoded.to_annotation().is_empty());
        assert!(decoded.assignment.iter().all(|a| matches!(a.slot, Slot::Absent(_))));
        assert_eq!(decoded.features.len(), 5);
        assert_eq!(decoded.score, 0.0);
        assert_eq!(model.features.len(), 5);
        assert!(model.features.lookup("BIAS_rate_amount").is_some());
    }

    #[test]
    fn test_gold_mode_keeps_gold_tokens() {
        let example = offer("100", "90");
        let mut model = LinearModel::new(UpdateRule::default());
        let mut scorer = TrainingScorer::new(&mut model);
        let decoded = FieldDecoder::default()
            .decode(
                &mut scorer,
                &mut FeatureCache::new(),
                &example.document,
                &Lexicon::default(),
                example.gold.as_ref(),
                DecodeMode::Gold,
            )
            .unwrap();
        assert_eq!(decoded.to_annotation(), example.gold.clone().unwrap());
        assert_eq!(decoded.assignment[4].slot, Slot::Absent(FieldKind::Amount));
    }

    #[test]
    fn test_score_never_below_all_absent() {
        let data = corpus();
        let mut model = LinearModel::new(UpdateRule { perceptron: true, ..UpdateRule::default() });
        let lex = Lexicon::default();
        let decoder = FieldDecoder {
            search: SearchConfig { search_steps: 1, search_steps_max: 1 },
            ..FieldDecoder::default()
        };
        train(&decoder, &mut model, &data, &lex, &LearnerConfig { passes: 2, ..LearnerConfig::default() }).unwrap();

        for text in ["have 5 usd", "want 3 eur for 4 usd\nrate 1.2", "lol", "usd usd 9 9"] {
            let d = doc(text);
            let mut scorer = InferenceScorer::new(&model);
            let mut cache = FeatureCache::new();
            let lattice =
                Lattice::build(decoder.loss, &mut scorer, &mut cache, &d, &lex, None, DecodeMode::Plain).unwrap();
            let absent = lattice.absent_ranks().unwrap();
            let floor = lattice.score(&mut scorer, &lex, &absent);

            let decoded = decoder
                .decode(&mut scorer, &mut FeatureCache::new(), &d, &lex, None, DecodeMode::Plain)
                .unwrap();
            assert!(decoded.score >= floor, "{text}: {} < {floor}", decoded.score);
        }
    }

    #[test]
    fn test_pair_features_skip_double_absent() {
        let d = doc("have 100 usd");
        let lex = Lexicon::default();
        let chosen = vec![
            (Field::HaveAmount, Some(Position::new(0, 1))),
            (Field::HaveCurrency, Some(Position::new(0, 2))),
            (Field::WantAmount, None),
            (Field::WantCurrency, None),
            (Field::RateAmount, None),
        ];
        let feats = interaction_features(&d, &lex, &chosen);
        assert!(feats.contains(&"PAIR_ww_have_currency_have_amount_usd_100".to_string()));
        assert!(feats.contains(&"PAIR_wmwm_have_currency_have_amount_CURRENCY_###".to_string()));
        assert!(feats.contains(&"PAIR_trading_have_currency_have_amount_false".to_string()));
        assert!(feats.contains(&"PAIR_dist_have_currency_have_amount_toks=1".to_string()));
        assert!(feats.contains(&"PAIR_dist_want_amount_have_amount_NA".to_string()));
        assert!(!feats.iter().any(|f| f.contains("want_currency_want_amount")));
        assert_eq!(feats.last().map(String::as_str), Some("ORDER_have_amount_have_currency"));
    }

    #[test]
    fn test_distance_buckets() {
        assert_eq!(distance_bucket(0), "0");
        assert_eq!(distance_bucket(-2), "-2");
        assert_eq!(distance_bucket(4), "3to5");
        assert_eq!(distance_bucket(-3), "-5to-3");
        assert_eq!(distance_bucket(12), "6+");
        assert_eq!(distance_bucket(-6), "-6-");
    }

    #[test]
    fn test_learns_simple_offer() {
        let data = corpus();
        let mut model = LinearModel::new(UpdateRule::default());
        let lex = Lexicon::default();
        let decoder = FieldDecoder::default();
        let config = LearnerConfig { passes: 10, ..LearnerConfig::default() };
        train(&decoder, &mut model, &data, &lex, &config).unwrap();

        let held_out = doc("have 50 usd want 45 eur");
        let mut scorer = InferenceScorer::new(&model);
        let decoded = decoder
            .decode(&mut scorer, &mut FeatureCache::new(), &held_out, &lex, None, DecodeMode::Plain)
            .unwrap();
        let ann = decoded.to_annotation();
        assert_eq!(ann.positions(Tag::Have), &[Position::new(0, 1), Position::new(0, 2)]);
        assert_eq!(ann.positions(Tag::Want), &[Position::new(0, 4), Position::new(0, 5)]);
        assert!(ann.positions(Tag::Rate).is_empty());
    }
}
