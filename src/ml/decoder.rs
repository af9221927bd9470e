// ============================================================
// Layer 5 — Decoder contract
// ============================================================
// A decoder turns per-token scores into one labelled assignment
// for a whole document. The trainer runs it twice per document:
//
//   DecodeMode::Gold           only gold-supported options, no loss
//   DecodeMode::LossAugmented  every option, wrong ones get a bonus
//   DecodeMode::Plain          every option, no loss (inference and
//                              perceptron training)
//
// and compares the two assignments. Decoded::features lists every
// feature that contributed to the chosen assignment's score,
// duplicates included, so the trainer can push its gradient
// without knowing the decoder's structure.

use crate::domain::annotation::{Annotation, Position};
use crate::domain::document::Document;
use crate::error::Result;
use crate::ml::label::Label;
use crate::ml::lexicon::Lexicon;
use crate::ml::scorer::{FeatureCache, Scorer, Slot};
use crate::ml::weights::FeatureId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    Gold,
    LossAugmented,
    Plain,
}

impl DecodeMode {
    pub fn restricted(self) -> bool {
        self == DecodeMode::Gold
    }

    pub fn augmented(self) -> bool {
        self == DecodeMode::LossAugmented
    }
}

/// One label placed on one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Assigned {
    pub slot:  Slot,
    pub label: Label,
}

impl Assigned {
    pub fn token(pos: Position, label: Label) -> Self {
        Self { slot: Slot::Token(pos), label }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub assignment: Vec<Assigned>,
    pub score:      f64,
    pub features:   Vec<FeatureId>,
}

impl Decoded {
    /// Tags written by the assignment. Absent slots and background
    /// labels write nothing.
    pub fn to_annotation(&self) -> Annotation {
        let mut ann = Annotation::new();
        for a in &self.assignment {
            if let Slot::Token(pos) = a.slot {
                for &tag in a.label.tags() {
                    ann.add(tag, pos);
                }
            }
        }
        ann
    }
}

pub trait Decoder {
    /// Short name used in logs and checkpoint files
    fn name(&self) -> &'static str;

    fn decode<S: Scorer>(
        &self,
        scorer:  &mut S,
        cache:   &mut FeatureCache,
        doc:     &Document,
        lexicon: &Lexicon,
        gold:    Option<&Annotation>,
        mode:    DecodeMode,
    ) -> Result<Decoded>;
}
