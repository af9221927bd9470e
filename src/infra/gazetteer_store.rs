// ============================================================
// Layer 6 — Gazetteer Store
// ============================================================
// Supplies the alias tables the Lexicon is built from.
//
// Without a file the built-in tables are used. With a file the
// JSON replaces them completely:
//
//   {
//     "currency": [["pp", "pay pal", "paypal"], ...],
//     "trading":  [["h", "got", "have"], ...],
//     "common":   [["u", "you", "your"], ...]
//   }
//
// The last alias of each group is its canonical spelling.
//
// The tables used for training are written next to the model
// files, so later `eval` / `run` calls see the same lexicon.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::traits::Persistable;
use crate::ml::lexicon::Gazetteer;

impl Persistable for Gazetteer {
    fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write gazetteer to '{}'", path.display()))?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read gazetteer '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid gazetteer JSON in '{}'", path.display()))
    }
}

pub struct GazetteerStore {
    /// User-supplied tables, if any
    path: Option<PathBuf>,
}

impl GazetteerStore {
    pub fn new(path: Option<impl Into<PathBuf>>) -> Self {
        Self { path: path.map(Into::into) }
    }

    /// Load the configured tables, or the built-in ones
    pub fn load(&self) -> Result<Gazetteer> {
        match &self.path {
            Some(path) => {
                tracing::info!("Loading gazetteer from '{}'", path.display());
                Gazetteer::load(path)
            }
            None => {
                tracing::debug!("Using built-in gazetteer");
                Ok(Gazetteer::default())
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::lexicon::{Lexicon, WordClass};

    #[test]
    fn test_defaults_without_file() {
        let gaz = GazetteerStore::new(None::<PathBuf>).load().unwrap();
        assert_eq!(gaz, Gazetteer::default());
    }

    #[test]
    fn test_file_replaces_tables() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("gaz.json");
        fs::write(
            &path,
            r#"{"currency": [["zz", "zedcoin"]], "trading": [["got", "have"]], "common": []}"#,
        )
        .unwrap();

        let lex = Lexicon::new(&GazetteerStore::new(Some(&path)).load().unwrap());
        assert_eq!(lex.currency("ZZ"), Some("zedcoin"));
        assert_eq!(lex.classify("pp"), WordClass::Unknown);
        assert_eq!(lex.classify("got"), WordClass::Trading("have"));
    }

    #[test]
    fn test_bad_json_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("gaz.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(GazetteerStore::new(Some(&path)).load().is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("gazetteer.json");
        Gazetteer::default().save(&path).unwrap();
        assert_eq!(Gazetteer::load(&path).unwrap(), Gazetteer::default());
    }
}
