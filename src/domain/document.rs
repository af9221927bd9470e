// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// A marketplace post after tokenisation: an ordered list of
// lines, each an ordered list of tokens. Line structure is
// kept because "same line" is a strong signal for which
// amount belongs to which currency.
//
// Documents are immutable once loaded. Every model reads them
// through Position coordinates.

use serde::{Deserialize, Serialize};

use crate::domain::annotation::{Annotation, Position};

/// A tokenised document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// The filename or path, kept for traceability in reports
    pub source: String,

    /// Tokens grouped by line. Lines may be empty.
    pub lines: Vec<Vec<String>>,
}

impl Document {
    /// Create a Document from already tokenised lines.
    pub fn new(source: impl Into<String>, lines: Vec<Vec<String>>) -> Self {
        Self {
            source: source.into(),
            lines,
        }
    }

    /// The token at a position, if the position is inside the document
    pub fn token(&self, pos: Position) -> Option<&str> {
        self.lines
            .get(pos.line)
            .and_then(|line| line.get(pos.token))
            .map(String::as_str)
    }

    /// Tokens of one line (empty slice past the end)
    pub fn line(&self, line: usize) -> &[String] {
        self.lines.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Every token position in reading order
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.lines.iter().enumerate().flat_map(|(l, line)| {
            (0..line.len()).map(move |t| Position::new(l, t))
        })
    }

    pub fn num_tokens(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.token(pos).is_some()
    }
}

/// A document paired with its gold annotation, when one exists.
/// Documents passed to `run` have no gold; training and
/// evaluation require it.
#[derive(Debug, Clone)]
pub struct LabeledDocument {
    pub document: Document,
    pub gold:     Option<Annotation>,
}

impl LabeledDocument {
    pub fn new(document: Document, gold: Option<Annotation>) -> Self {
        Self { document, gold }
    }

    /// Convenience for documents that always carry gold
    pub fn with_gold(document: Document, gold: Annotation) -> Self {
        Self { document, gold: Some(gold) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(
            "t",
            vec![
                vec!["have".into(), "100".into()],
                vec![],
                vec!["want".into()],
            ],
        )
    }

    #[test]
    fn test_positions_skip_empty_lines() {
        let positions: Vec<Position> = doc().positions().collect();
        assert_eq!(
            positions,
            vec![Position::new(0, 0), Position::new(0, 1), Position::new(2, 0)]
        );
    }

    #[test]
    fn test_token_out_of_range_is_none() {
        let d = doc();
        assert_eq!(d.token(Position::new(0, 1)), Some("100"));
        assert_eq!(d.token(Position::new(1, 0)), None);
        assert_eq!(d.token(Position::new(9, 0)), None);
        assert_eq!(d.num_tokens(), 3);
    }
}
