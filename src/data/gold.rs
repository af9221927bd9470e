// ============================================================
// Layer 4 — Inline Gold Parser
// ============================================================
// Gold annotations come as a copy of the raw post where each
// annotated word is wrapped in markers:
//
//   {word}   have
//   [word]   want
//   |word|   rate
//
// Markers may nest ("{[pp]}" is both have and want). A wrapped
// word that splits into several tokens tags every piece. Short
// wrapped words containing "$" are not tagged.
//
// Token positions are counted exactly as the tokeniser counts
// them, so the result indexes into the raw Document.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::data::tokenize::split_word;
use crate::domain::annotation::{Annotation, Position, Tag};
use crate::domain::document::Document;
use crate::error::{ExtractError, Result};

static ANNOTATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[{\[|][^\]|}]+[\]}]?[\]}|]$").expect("valid annotation regex"));

/// True when every `{` / `[` in the word has a partner
fn balanced(word: &str) -> bool {
    let count = |c: char| word.chars().filter(|&x| x == c).count();
    count('{') == count('}') && count('[') == count(']')
}

/// A word that opens a have/want marker without closing it.
/// Brackets elsewhere in a word (":[", "]:") are ordinary post text.
fn malformed(word: &str) -> bool {
    word.starts_with(['{', '[']) && !balanced(word)
}

/// Strip nested wrapper characters from both ends
fn unwrap_word(word: &str) -> &str {
    let mut inner = word;
    while inner.len() > 1
        && inner.starts_with(['{', '[', '|'])
        && inner.ends_with(['}', ']', '|'])
    {
        inner = &inner[1..inner.len() - 1];
    }
    inner
}

/// Tags encoded by the markers around one word
fn marker_tags(word: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    if word.contains('{') && word.contains('}') {
        tags.push(Tag::Have);
    }
    if word.contains('[') && word.contains(']') {
        tags.push(Tag::Want);
    }
    if word.matches('|').count() >= 2 {
        tags.push(Tag::Rate);
    }
    tags
}

/// Parse the annotated copy of `raw` into gold positions.
pub fn parse_gold(raw: &Document, annotated: &str) -> Result<Annotation> {
    let mut gold = Annotation::new();

    for (l, line) in annotated.lines().enumerate() {
        let mut next = 0usize;

        for word in line.split_whitespace() {
            if malformed(word) {
                return Err(ExtractError::MalformedAnnotation {
                    source_name: raw.source.clone(),
                    line:        l,
                    text:        line.to_string(),
                });
            }

            if !ANNOTATED_RE.is_match(word) {
                next += split_word(word).len();
                continue;
            }

            let tags = marker_tags(word);
            let skip = word.contains('$') && word.chars().count() < 4;
            for _ in split_word(&unwrap_word(word).to_lowercase()) {
                let pos = Position::new(l, next);
                next += 1;
                if skip {
                    continue;
                }
                if !raw.contains(pos) {
                    return Err(ExtractError::PositionOutOfRange {
                        source_name: raw.source.clone(),
                        position:    pos,
                    });
                }
                for &tag in &tags {
                    gold.add(tag, pos);
                }
            }
        }
    }

    Ok(gold)
}
