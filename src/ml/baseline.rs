// ============================================================
// Layer 5 — Rule Baselines
// ============================================================
// Two extractors with no learned weights, kept as reference
// points for the learned models:
//
//   FixedOrderExtractor — first currency is "have", the next
//                         different one is "want"; same for the
//                         first two numbers
//   PatternExtractor    — memorises, per line, the sequence of
//                         known symbols and which tags sat on
//                         them; replays exact matches

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::annotation::{Annotation, Position, Tag};
use crate::domain::document::{Document, LabeledDocument};
use crate::error::{ExtractError, Result};
use crate::ml::lexicon::{Category, Lexicon};

// ─── FixedOrderExtractor ──────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedOrderExtractor;

impl FixedOrderExtractor {
    pub fn extract(&self, doc: &Document, lexicon: &Lexicon) -> Annotation {
        let mut ann = Annotation::new();
        let mut have_currency: Option<String> = None;
        let mut want_currency = false;
        let mut amounts = 0;

        for pos in doc.positions() {
            let Some(word) = doc.token(pos) else { continue };
            let word = word.to_lowercase();
            match lexicon.classify(&word).category() {
                Category::Currency => match &have_currency {
                    None => {
                        ann.add(Tag::Have, pos);
                        have_currency = Some(word);
                    }
                    Some(first) if !want_currency && *first != word => {
                        ann.add(Tag::Want, pos);
                        want_currency = true;
                    }
                    _ => {}
                },
                Category::Number => {
                    match amounts {
                        0 => ann.add(Tag::Have, pos),
                        1 => ann.add(Tag::Want, pos),
                        _ => {}
                    }
                    amounts += 1;
                }
                Category::Unknown => {}
            }
        }
        ann
    }
}

// ─── PatternExtractor ─────────────────────────────────────────────────────────
/// Symbol sequence (space separated) → tag set per symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternExtractor {
    pub patterns: BTreeMap<String, Vec<BTreeSet<Tag>>>,
}

/// Known (non-unknown) mapped symbols of one line with their positions
fn line_pattern(doc: &Document, line: usize, lexicon: &Lexicon) -> (String, Vec<Position>) {
    let mut symbols   = Vec::new();
    let mut positions = Vec::new();
    for (t, word) in doc.line(line).iter().enumerate() {
        let class = lexicon.classify(word);
        if !class.is_unknown() {
            symbols.push(class.symbol());
            positions.push(Position::new(line, t));
        }
    }
    (symbols.join(" "), positions)
}

impl PatternExtractor {
    /// Record every line that has at least one tagged known token.
    /// A later line with the same pattern overwrites an earlier one.
    pub fn train(&mut self, data: &[LabeledDocument], lexicon: &Lexicon) -> Result<()> {
        for example in data {
            let doc  = &example.document;
            let gold = example
                .gold
                .as_ref()
                .ok_or_else(|| ExtractError::MissingGold(doc.source.clone()))?;

            for line in 0..doc.num_lines() {
                let (pattern, positions) = line_pattern(doc, line, lexicon);
                let marks: Vec<BTreeSet<Tag>> = positions
                    .iter()
                    .map(|&p| gold.tags_at(p).cloned().unwrap_or_default())
                    .collect();
                if marks.iter().any(|m| !m.is_empty()) {
                    self.patterns.insert(pattern, marks);
                }
            }
        }
        Ok(())
    }

    pub fn extract(&self, doc: &Document, lexicon: &Lexicon) -> Annotation {
        let mut ann = Annotation::new();
        for line in 0..doc.num_lines() {
            let (pattern, positions) = line_pattern(doc, line, lexicon);
            let Some(marks) = self.patterns.get(&pattern) else { continue };
            for (&pos, tags) in positions.iter().zip(marks) {
                for &tag in tags {
                    ann.add(tag, pos);
                }
            }
        }
        ann
    }
}
