// ============================================================
// Layer 2 — Extract Use Case
// ============================================================
// Loads trained extractors from a checkpoint directory and
// applies them to new documents in one of two ways:
//
//   eval — documents come with gold annotations; every guess is
//          scored and the totals are returned as an EvalSummary
//
//   run  — raw documents only; every guess is rendered as one
//          CSV row: filename,system,output
//
// Extraction never changes a loaded extractor, so the same
// instance serves every document.

use anyhow::Result;

use crate::data::loader::CorpusLoader;
use crate::domain::document::LabeledDocument;
use crate::domain::traits::CorpusSource;
use crate::error::ExtractError;
use crate::infra::{
    checkpoint::CheckpointManager,
    evaluation::{score_document, EvalSummary},
};
use crate::ml::extractor::{Extractor, ModelKind};
use crate::ml::lexicon::Lexicon;

pub struct ExtractUseCase {
    lexicon:    Lexicon,
    extractors: Vec<Extractor>,
}

impl ExtractUseCase {
    /// Load the selected variants and the gazetteer they were
    /// trained with from `checkpoint_dir`.
    pub fn new(checkpoint_dir: &str, models: &str) -> Result<Self> {
        let ckpt    = CheckpointManager::new(checkpoint_dir);
        let lexicon = Lexicon::new(&ckpt.load_gazetteer()?);

        let extractors = ModelKind::parse_list(models)?
            .into_iter()
            .map(|kind| ckpt.load_extractor(kind))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { lexicon, extractors })
    }

    /// Score every extractor on an annotated corpus.
    /// `all_values` adds the per-occurrence scores to the
    /// default unique-value ones.
    pub fn evaluate(&self, eval_data: &str, all_values: bool) -> Result<EvalSummary> {
        let docs = CorpusLoader::annotated(eval_data).load_all()?;
        evaluate(&self.extractors, &docs, &self.lexicon, all_values)
    }

    /// Label a raw corpus. Returns CSV text with a header row.
    pub fn run(&self, run_data: &str) -> Result<String> {
        let docs = CorpusLoader::raw(run_data).load_all()?;

        let mut out = String::from("filename,system,output\n");
        for labeled in &docs {
            let doc = &labeled.document;
            for extractor in &self.extractors {
                let guess = extractor.extract(doc, &self.lexicon)?;
                out.push_str(&format!(
                    "{},{},{}\n",
                    doc.source,
                    extractor.name(),
                    guess.word_repr(doc)
                ));
            }
        }
        Ok(out)
    }
}

/// Score `extractors` on annotated documents.
pub fn evaluate(
    extractors: &[Extractor],
    docs:       &[LabeledDocument],
    lexicon:    &Lexicon,
    all_values: bool,
) -> Result<EvalSummary> {
    let modes: &[bool] = if all_values { &[true, false] } else { &[true] };
    let mut summary = EvalSummary::new();

    for labeled in docs {
        let doc = &labeled.document;
        let gold = labeled
            .gold
            .as_ref()
            .ok_or_else(|| ExtractError::MissingGold(doc.source.clone()))?;
        tracing::debug!("{:<12} {:<30} {}", doc.source, "gold", gold.word_repr(doc));

        for extractor in extractors {
            let guess = extractor.extract(doc, lexicon)?;
            tracing::debug!("{:<12} {:<30} {}", doc.source, extractor.name(), guess.word_repr(doc));
            for &unique in modes {
                let score = score_document(&guess, gold, doc, lexicon, unique);
                summary.add(extractor.name(), unique, &score);
            }
        }
    }

    tracing::info!(
        "Evaluated {} extractors on {} documents",
        extractors.len(),
        docs.len()
    );
    Ok(summary)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use std::{
        fs,
        path::{Path, PathBuf},
    };

    const POSTS: &[(&str, &str)] = &[
        ("have 50 usd want 45 eur",   "have {50} {usd} want [45] [eur]"),
        ("have 20 btc want 300 pp",   "have {20} {btc} want [300] [pp]"),
        ("have 10 lr want 9 pp",      "have {10} {lr} want [9] [pp]"),
        ("have 70 pp want 60 btc",    "have {70} {pp} want [60] [btc]"),
        ("have 5 skrill want 4 usd",  "have {5} {skrill} want [4] [usd]"),
        ("have 100 wu want 95 pp",    "have {100} {wu} want [95] [pp]"),
    ];

    /// Writes six annotated posts and a list file; returns the list path
    pub(crate) fn write_corpus(dir: &Path) -> PathBuf {
        let mut list = String::new();
        for (i, (raw, gold)) in POSTS.iter().enumerate() {
            fs::write(dir.join(format!("{i}.txt")), raw).unwrap();
            fs::write(dir.join(format!("{i}.gold")), gold).unwrap();
            list.push_str(&format!("{i}.txt {i}.gold\n"));
        }
        let path = dir.join("corpus.list");
        fs::write(&path, list).unwrap();
        path
    }

    fn trained(dir: &Path, models: &str) -> (PathBuf, String) {
        let list = write_corpus(dir);
        let ckpt = dir.join("ckpt").display().to_string();
        let cfg  = TrainConfig {
            train_data:     list.display().to_string(),
            checkpoint_dir: ckpt.clone(),
            models:         models.to_string(),
            passes:         2,
            ..TrainConfig::default()
        };
        TrainUseCase::new(cfg).execute().unwrap();
        (list, ckpt)
    }

    #[test]
    fn test_eval_counts_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let (list, ckpt) = trained(dir.path(), "fixed_order,classifier");

        let uc      = ExtractUseCase::new(&ckpt, "fixed_order,classifier").unwrap();
        let summary = uc.evaluate(&list.display().to_string(), true).unwrap();

        for system in ["fixed_order", "classifier"] {
            for unique in [true, false] {
                assert_eq!(summary.totals(system, unique).unwrap().documents, POSTS.len());
            }
        }
    }

    #[test]
    fn test_fixed_order_handles_simple_posts() {
        let dir = tempfile::tempdir().unwrap();
        let (list, ckpt) = trained(dir.path(), "fixed_order");

        let uc      = ExtractUseCase::new(&ckpt, "fixed_order").unwrap();
        let summary = uc.evaluate(&list.display().to_string(), false).unwrap();
        let t       = summary.totals("fixed_order", true).unwrap();
        assert_eq!(t.complete, POSTS.len());
    }

    #[test]
    fn test_run_writes_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (list, ckpt) = trained(dir.path(), "fixed_order");

        let csv = ExtractUseCase::new(&ckpt, "fixed_order")
            .unwrap()
            .run(&list.display().to_string())
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "filename,system,output");
        assert_eq!(lines.len(), POSTS.len() + 1);
        assert_eq!(lines[1], "0.txt,fixed_order,H:(50,usd) W:(45,eur) R:_");
    }

    #[test]
    fn test_untrained_variant_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let (_, ckpt) = trained(dir.path(), "fixed_order");
        assert!(ExtractUseCase::new(&ckpt, "linked").is_err());
    }
}
