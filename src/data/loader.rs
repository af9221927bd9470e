// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads a list file naming one document per line:
//
//   posts/0001.txt  gold/0001.txt
//   posts/0002.txt  gold/0002.txt
//
// The first path is the raw post, the second its annotated copy
// (optional for `run`). Relative paths are resolved against the
// list file's directory.
//
// Loading is strict: an unreadable file or a malformed gold copy
// aborts the whole load with the offending path in the error.

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::gold::parse_gold;
use crate::data::tokenize::tokenize;
use crate::domain::document::{Document, LabeledDocument};
use crate::domain::traits::CorpusSource;

/// Loads documents listed in a corpus list file.
/// Implements the CorpusSource trait from Layer 3.
pub struct CorpusLoader {
    list: PathBuf,

    /// Whether every entry must name a gold file
    with_gold: bool,
}

impl CorpusLoader {
    /// Loader for annotated corpora (train / eval)
    pub fn annotated(list: impl Into<PathBuf>) -> Self {
        Self { list: list.into(), with_gold: true }
    }

    /// Loader for raw corpora (run); gold paths are ignored
    pub fn raw(list: impl Into<PathBuf>) -> Self {
        Self { list: list.into(), with_gold: false }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        match self.list.parent() {
            Some(base) if p.is_relative() => base.join(p),
            _ => p.to_path_buf(),
        }
    }
}

impl CorpusSource for CorpusLoader {
    fn load_all(&self) -> Result<Vec<LabeledDocument>> {
        let listing = fs::read_to_string(&self.list)
            .with_context(|| format!("Cannot read corpus list '{}'", self.list.display()))?;

        let mut docs = Vec::new();
        for (n, entry) in listing.lines().enumerate() {
            let parts: Vec<&str> = entry.split_whitespace().collect();
            let Some(raw_path) = parts.first() else { continue };

            let doc = load_raw(&self.resolve(raw_path), raw_path)?;

            let gold = if self.with_gold {
                let Some(gold_path) = parts.get(1) else {
                    bail!(
                        "Entry {} of '{}' has no gold file",
                        n + 1,
                        self.list.display()
                    );
                };
                let path = self.resolve(gold_path);
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("Cannot read gold file '{}'", path.display()))?;
                let gold = parse_gold(&doc, &text)
                    .with_context(|| format!("Bad gold file '{}'", path.display()))?;
                Some(gold)
            } else {
                None
            };

            tracing::debug!(
                source = %doc.source,
                tokens = doc.num_tokens(),
                "loaded document"
            );
            docs.push(LabeledDocument::new(doc, gold));
        }

        tracing::info!("Loaded {} documents from '{}'", docs.len(), self.list.display());
        Ok(docs)
    }
}

/// Read and tokenise one raw post. `source` is the name as listed.
fn load_raw(path: &Path, source: &str) -> Result<Document> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(Document::new(source, tokenize(&text)))
}
