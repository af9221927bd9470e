// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between layers:
//   - CorpusSource: anything that yields labeled documents
//   - Persistable:  anything whose state round-trips to disk
//
// The application layer only sees these traits, so a future
// database-backed corpus or a different model format plugs in
// without touching the use cases.

use anyhow::Result;
use std::path::Path;

use crate::domain::document::LabeledDocument;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can load tokenised documents.
///
/// Implementations:
///   - CorpusLoader → reads a list file of `raw [gold]` path pairs
pub trait CorpusSource {
    /// Load every document this source knows about, in listing order.
    fn load_all(&self) -> Result<Vec<LabeledDocument>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
///
/// Implementations:
///   - Extractor → trained weights, feature table, patterns
///   - Gazetteer → currency / trading / common word tables
pub trait Persistable: Sized {
    /// Save this component's state to the given path
    fn save(&self, path: &Path) -> Result<()>;

    /// Load a component's state from the given path.
    fn load(path: &Path) -> Result<Self>;
}
