// ============================================================
// Layer 3 — Annotation Domain Types
// ============================================================
// An Annotation records which tokens of a document belong to
// the "have" side of an offer, the "want" side, and the rate:
//
//   "have {100} {usd} want [90] [eur]"
//     have → (0,1) (0,2)
//     want → (0,4) (0,5)
//
// A position may carry several tags (a token annotated as both
// have and want when the annotator could not decide). The
// inverse index answers "which tags sit here?" in O(log n).
//
// Annotations only grow: `add` is the single mutation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::domain::document::Document;
use crate::error::ExtractError;

// ─── Position ─────────────────────────────────────────────────────────────────
/// (line, token) coordinates into a tokenised Document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line:  usize,
    pub token: usize,
}

impl Position {
    pub fn new(line: usize, token: usize) -> Self {
        Self { line, token }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.line, self.token)
    }
}

// ─── Tag ──────────────────────────────────────────────────────────────────────
/// The three annotation tags. No other tag is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Have,
    Want,
    Rate,
}

impl Tag {
    pub const ALL: [Tag; 3] = [Tag::Have, Tag::Want, Tag::Rate];

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Have => "have",
            Tag::Want => "want",
            Tag::Rate => "rate",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "have" => Ok(Tag::Have),
            "want" => Ok(Tag::Want),
            "rate" => Ok(Tag::Rate),
            other  => Err(ExtractError::UnknownTag(other.to_string())),
        }
    }
}

// ─── Annotation ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    have: Vec<Position>,
    want: Vec<Position>,
    rate: Vec<Position>,

    /// position → tags present there, sorted for deterministic output
    inverse: BTreeMap<Position, BTreeSet<Tag>>,
}

impl Annotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `pos` to the list for `tag` and record it in the inverse index.
    pub fn add(&mut self, tag: Tag, pos: Position) {
        self.inverse.entry(pos).or_default().insert(tag);
        match tag {
            Tag::Have => self.have.push(pos),
            Tag::Want => self.want.push(pos),
            Tag::Rate => self.rate.push(pos),
        }
    }

    /// Positions tagged with `tag`, in insertion order
    pub fn positions(&self, tag: Tag) -> &[Position] {
        match tag {
            Tag::Have => &self.have,
            Tag::Want => &self.want,
            Tag::Rate => &self.rate,
        }
    }

    pub fn tags_at(&self, pos: Position) -> Option<&BTreeSet<Tag>> {
        self.inverse.get(&pos)
    }

    pub fn has_tag(&self, pos: Position, tag: Tag) -> bool {
        self.inverse.get(&pos).is_some_and(|tags| tags.contains(&tag))
    }

    pub fn is_empty(&self) -> bool {
        self.inverse.is_empty()
    }

    /// Human-readable form using the document's tokens, e.g.
    /// `H:(100,usd) W:(90,eur) R:_`
    pub fn word_repr(&self, doc: &Document) -> String {
        let words = |tag: Tag| -> Vec<String> {
            self.positions(tag)
                .iter()
                .map(|&p| doc.token(p).unwrap_or("?").to_string())
                .collect()
        };
        format!(
            "{} {} {}",
            list_to_string("H", &words(Tag::Have)),
            list_to_string("W", &words(Tag::Want)),
            list_to_string("R", &words(Tag::Rate)),
        )
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |tag: Tag| -> Vec<String> {
            self.positions(tag).iter().map(Position::to_string).collect()
        };
        write!(
            f,
            "{} {} {}",
            list_to_string("H", &render(Tag::Have)),
            list_to_string("W", &render(Tag::Want)),
            list_to_string("R", &render(Tag::Rate)),
        )
    }
}

fn list_to_string(name: &str, values: &[String]) -> String {
    let squash = |v: &String| v.split_whitespace().collect::<String>();
    match values {
        []  => format!("{name}:_"),
        [v] => format!("{name}:{}", squash(v)),
        vs  => format!(
            "{name}:({})",
            vs.iter().map(squash).collect::<Vec<_>>().join(",")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_lists_and_inverse_in_sync() {
        let mut a = Annotation::new();
        a.add(Tag::Have, Position::new(0, 1));
        a.add(Tag::Want, Position::new(0, 1));
        a.add(Tag::Rate, Position::new(1, 0));

        assert_eq!(a.positions(Tag::Have), &[Position::new(0, 1)]);
        let tags = a.tags_at(Position::new(0, 1)).unwrap();
        assert!(tags.contains(&Tag::Have) && tags.contains(&Tag::Want));
        assert!(a.has_tag(Position::new(1, 0), Tag::Rate));
        assert!(!a.has_tag(Position::new(1, 0), Tag::Have));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(matches!("price".parse::<Tag>(), Err(ExtractError::UnknownTag(_))));
        assert_eq!("want".parse::<Tag>().unwrap(), Tag::Want);
    }

    #[test]
    fn test_word_repr() {
        let doc = Document::new(
            "t",
            vec!["have 100 usd want 90 eur".split(' ').map(String::from).collect()],
        );
        let mut a = Annotation::new();
        a.add(Tag::Have, Position::new(0, 1));
        a.add(Tag::Have, Position::new(0, 2));
        a.add(Tag::Want, Position::new(0, 4));
        assert_eq!(a.word_repr(&doc), "H:(100,usd) W:90 R:_");
        assert_eq!(a.to_string(), "H:((0,1),(0,2)) W:(0,4) R:_");
    }
}
