// ============================================================
// Layer 5 — Extractor Variants
// ============================================================
// The closed set of extraction systems behind one interface:
//
//   fixed_order  rule baseline, nothing to train
//   pattern      memorised symbol patterns
//   classifier   per-token linear classifier
//   global       five-field joint decoder
//   linked       canonical-group joint decoder
//
// Every variant owns its own state. The three learned variants
// each carry a LinearModel (feature table + weights) plus the
// decoder and learner settings they were trained with, which is
// everything needed to reproduce their scores after a reload.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
    str::FromStr,
};

use crate::domain::annotation::Annotation;
use crate::domain::document::{Document, LabeledDocument};
use crate::domain::traits::Persistable;
use crate::error::{ExtractError, Result};
use crate::ml::baseline::{FixedOrderExtractor, PatternExtractor};
use crate::ml::classifier::TokenDecoder;
use crate::ml::decoder::{DecodeMode, Decoded, Decoder};
use crate::ml::global::FieldDecoder;
use crate::ml::lexicon::Lexicon;
use crate::ml::linked::GroupDecoder;
use crate::ml::scorer::{FeatureCache, InferenceScorer, LinearModel};
use crate::ml::search::SearchConfig;
use crate::ml::trainer::{self, LearnerConfig, PassStats};
use crate::ml::weights::UpdateRule;

// ─── ModelKind ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelKind {
    FixedOrder,
    Pattern,
    Classifier,
    Global,
    Linked,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::FixedOrder,
        ModelKind::Pattern,
        ModelKind::Classifier,
        ModelKind::Global,
        ModelKind::Linked,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::FixedOrder => "fixed_order",
            ModelKind::Pattern    => "pattern",
            ModelKind::Classifier => "classifier",
            ModelKind::Global     => "global",
            ModelKind::Linked     => "linked",
        }
    }

    /// Parse a comma separated selection; "all" expands to every variant
    pub fn parse_list(list: &str) -> Result<Vec<ModelKind>> {
        let mut kinds = Vec::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part == "all" {
                return Ok(ModelKind::ALL.to_vec());
            }
            let kind: ModelKind = part.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            return Err(ExtractError::UnknownModel(list.to_string()));
        }
        Ok(kinds)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = ExtractError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| ExtractError::UnknownModel(s.to_string()))
    }
}

// ─── ModelSettings ────────────────────────────────────────────────────────────
/// Everything needed to build an untrained extractor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub rule:    UpdateRule,
    pub learner: LearnerConfig,

    /// Overrides of the per-decoder search defaults
    pub search_steps:     Option<usize>,
    pub search_steps_max: Option<usize>,
}

impl ModelSettings {
    fn search(&self, defaults: SearchConfig) -> SearchConfig {
        SearchConfig {
            search_steps:     self.search_steps.unwrap_or(defaults.search_steps),
            search_steps_max: self.search_steps_max.unwrap_or(defaults.search_steps_max),
        }
    }
}

// ─── LearnedExtractor ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedExtractor<D> {
    pub decoder: D,
    pub learner: LearnerConfig,
    pub model:   LinearModel,
}

impl<D: Decoder> LearnedExtractor<D> {
    pub fn new(decoder: D, settings: &ModelSettings) -> Self {
        Self {
            decoder,
            learner: settings.learner,
            model:   LinearModel::new(settings.rule),
        }
    }

    pub fn train(&mut self, data: &[LabeledDocument], lexicon: &Lexicon) -> Result<Vec<PassStats>> {
        trainer::train(&self.decoder, &mut self.model, data, lexicon, &self.learner)
    }

    /// Plain decode against the frozen model
    pub fn decode(&self, doc: &Document, lexicon: &Lexicon) -> Result<Decoded> {
        let mut scorer = InferenceScorer::new(&self.model);
        let mut cache  = FeatureCache::new();
        self.decoder
            .decode(&mut scorer, &mut cache, doc, lexicon, None, DecodeMode::Plain)
    }
}

// ─── Extractor ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extractor {
    FixedOrder(FixedOrderExtractor),
    Pattern(PatternExtractor),
    Classifier(LearnedExtractor<TokenDecoder>),
    Global(LearnedExtractor<FieldDecoder>),
    Linked(LearnedExtractor<GroupDecoder>),
}

impl Extractor {
    pub fn new(kind: ModelKind, settings: &ModelSettings) -> Self {
        match kind {
            ModelKind::FixedOrder => Extractor::FixedOrder(FixedOrderExtractor),
            ModelKind::Pattern    => Extractor::Pattern(PatternExtractor::default()),
            ModelKind::Classifier => {
                Extractor::Classifier(LearnedExtractor::new(TokenDecoder::default(), settings))
            }
            ModelKind::Global => {
                let decoder = FieldDecoder {
                    search: settings.search(SearchConfig::fields()),
                    ..FieldDecoder::default()
                };
                Extractor::Global(LearnedExtractor::new(decoder, settings))
            }
            ModelKind::Linked => {
                let decoder = GroupDecoder {
                    search: settings.search(SearchConfig::groups()),
                    ..GroupDecoder::default()
                };
                Extractor::Linked(LearnedExtractor::new(decoder, settings))
            }
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Extractor::FixedOrder(_) => ModelKind::FixedOrder,
            Extractor::Pattern(_)    => ModelKind::Pattern,
            Extractor::Classifier(_) => ModelKind::Classifier,
            Extractor::Global(_)     => ModelKind::Global,
            Extractor::Linked(_)     => ModelKind::Linked,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Learn from annotated documents. Rule baselines return no
    /// pass statistics.
    pub fn train(&mut self, data: &[LabeledDocument], lexicon: &Lexicon) -> Result<Vec<PassStats>> {
        match self {
            Extractor::FixedOrder(_) => Ok(Vec::new()),
            Extractor::Pattern(p) => {
                p.train(data, lexicon)?;
                Ok(Vec::new())
            }
            Extractor::Classifier(e) => e.train(data, lexicon),
            Extractor::Global(e)     => e.train(data, lexicon),
            Extractor::Linked(e)     => e.train(data, lexicon),
        }
    }

    /// Extract one annotation. Never changes the extractor.
    pub fn extract(&self, doc: &Document, lexicon: &Lexicon) -> Result<Annotation> {
        match self {
            Extractor::FixedOrder(e) => Ok(e.extract(doc, lexicon)),
            Extractor::Pattern(e)    => Ok(e.extract(doc, lexicon)),
            Extractor::Classifier(e) => Ok(e.decode(doc, lexicon)?.to_annotation()),
            Extractor::Global(e)     => Ok(e.decode(doc, lexicon)?.to_annotation()),
            Extractor::Linked(e)     => Ok(e.decode(doc, lexicon)?.to_annotation()),
        }
    }

    /// Learned model, if this variant has one
    #[cfg(test)]
    pub fn model(&self) -> Option<&LinearModel> {
        match self {
            Extractor::Classifier(e) => Some(&e.model),
            Extractor::Global(e)     => Some(&e.model),
            Extractor::Linked(e)     => Some(&e.model),
            _ => None,
        }
    }
}

impl Persistable for Extractor {
    fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Cannot create model file '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)
            .with_context(|| format!("Cannot serialise {} extractor", self.name()))?;
        writer.flush()?;
        Ok(())
    }

    fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Cannot open model file '{}'. Have you run 'train' first?", path.display()))?;
        let extractor = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Corrupt model file '{}'", path.display()))?;
        Ok(extractor)
    }
}
