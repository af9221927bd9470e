// ============================================================
// Layer 5 — Context Feature Builder
// ============================================================
// Turns (document, position, label) into symbolic feature keys.
// Every key ends with the label name, so one weight table holds
// a separate linear model per label.
//
// For the token at `cw` the builder looks at a ±6 token window
// that runs across line breaks:
//
//   line 0:  have 100 usd
//   line 1:  want 90 eur
//
//   window around "90" (1,1):
//     ppppw=100  pppw=usd  ppw=SENT_BOUNDARY  pw=want  cw=90  nw=eur ...
//
// From the window it emits:
//   1. the words themselves           pw_want_have
//   2. their mapped symbols           pw_map_want_have
//   3. every pair of mapped symbols   cw_map_pw_map_###_want_have
//   4. mapped 3/4/5-grams, raw and with unknown symbols removed
//   5. trading keywords before/after on the same line
//   6. coarse line/token position buckets from both ends

use crate::domain::annotation::Position;
use crate::domain::document::Document;
use crate::ml::lexicon::{Lexicon, UNKNOWN_SYMBOL};

const WINDOW: isize = 6;
const POSITION_BUCKETS: usize = 4;

pub const DOC_START:     &str = "DOC_START";
pub const DOC_END:       &str = "DOC_END";
pub const SENT_BOUNDARY: &str = "SENT_BOUNDARY";

/// Token `delta` steps away from `pos`, walking across lines.
///
/// Moving off the end of a line lands on a boundary slot first,
/// so one step separates the last token of a line from the
/// boundary and another reaches the next line's first token.
/// Empty lines are skipped. Past either end of the document the
/// walk stops at DOC_START / DOC_END.
pub fn word_at(doc: &Document, pos: Position, delta: isize) -> &str {
    let n_lines = doc.num_lines() as isize;
    let mut l = pos.line as isize;
    let mut w = pos.token as isize;
    let len = |l: isize| doc.line(l as usize).len() as isize;

    for _ in 0..delta.unsigned_abs() {
        if !(0..n_lines).contains(&l) {
            break;
        }
        if w < 0 {
            if delta > 0 {
                w = 0;
            } else {
                l -= 1;
                while l >= 0 && len(l) == 0 {
                    l -= 1;
                }
                if l >= 0 {
                    w = len(l) - 1;
                }
            }
        } else if delta < 0 {
            w -= 1;
        } else if w < len(l) - 1 {
            w += 1;
        } else {
            l += 1;
            while l < n_lines && len(l) == 0 {
                l += 1;
            }
            w = -1;
        }
    }

    if l < 0 {
        DOC_START
    } else if l >= n_lines {
        DOC_END
    } else if w < 0 {
        SENT_BOUNDARY
    } else {
        doc.line(l as usize)[w as usize].as_str()
    }
}

fn slot_name(delta: isize) -> String {
    match delta {
        0          => "cw".to_string(),
        d if d < 0 => format!("{}w", "p".repeat(d.unsigned_abs())),
        d          => format!("{}w", "n".repeat(d.unsigned_abs())),
    }
}

fn bucket(value: usize) -> String {
    if value < POSITION_BUCKETS {
        value.to_string()
    } else {
        "Large".to_string()
    }
}

/// Joins a run of (name, symbol) pairs into one (name, value) pair
fn join(run: &[(String, &str)]) -> (String, String) {
    let names: Vec<&str>  = run.iter().map(|(n, _)| n.as_str()).collect();
    let values: Vec<&str> = run.iter().map(|(_, v)| *v).collect();
    (names.join("_"), values.join("_"))
}

/// All context feature keys for the token at `pos` under `label`.
pub fn context_features(doc: &Document, pos: Position, label: &str, lexicon: &Lexicon) -> Vec<String> {
    // ── 1. Window words ───────────────────────────────────────────────────────
    let words: Vec<(String, String)> = (-WINDOW..=WINDOW)
        .map(|d| (slot_name(d), word_at(doc, pos, d).to_lowercase()))
        .collect();

    // ── 2. Mapped symbols ─────────────────────────────────────────────────────
    let mapped: Vec<(String, &str)> = words
        .iter()
        .map(|(name, word)| (format!("{name}_map"), lexicon.classify(word).symbol()))
        .collect();

    let mut combos: Vec<(String, String)> = Vec::new();

    // ── 3. Pairs of mapped symbols ────────────────────────────────────────────
    for w1 in 0..mapped.len() {
        for w2 in 0..w1 {
            combos.push(join(&[mapped[w1].clone(), mapped[w2].clone()]));
        }
    }

    // ── 4. Mapped n-grams, then the same over known symbols only ──────────────
    for w in 0..mapped.len() {
        for d in 2..5 {
            if w + d < mapped.len() {
                combos.push(join(&mapped[w..=w + d]));
            }
        }
    }
    let known: Vec<(String, &str)> = mapped
        .iter()
        .filter(|(_, sym)| *sym != UNKNOWN_SYMBOL)
        .cloned()
        .collect();
    for w in 0..mapped.len() {
        for d in 2..5 {
            if w + d < mapped.len() {
                let lo = w.min(known.len());
                let hi = (w + d + 1).min(known.len());
                if lo < hi {
                    let (name, value) = join(&known[lo..hi]);
                    combos.push((format!("filter_{name}"), value));
                }
            }
        }
    }

    // ── 5. Trading keywords around the token on its line ──────────────────────
    let line = doc.line(pos.line);
    let trading_before = line[..pos.token.min(line.len())]
        .iter()
        .filter_map(|t| lexicon.trading(t))
        .last()
        .unwrap_or(UNKNOWN_SYMBOL);
    let trading_after = line[pos.token.min(line.len())..]
        .iter()
        .find_map(|t| lexicon.trading(t))
        .unwrap_or(UNKNOWN_SYMBOL);

    let mut feats = Vec::with_capacity(words.len() * 2 + combos.len() + 5);
    for (name, word) in &words {
        feats.push(format!("{name}_{word}_{label}"));
    }
    for (name, sym) in &mapped {
        feats.push(format!("{name}_{sym}_{label}"));
    }
    for (name, value) in &combos {
        feats.push(format!("{name}_{value}_{label}"));
    }
    feats.push(format!("TRADING_{trading_before}_{trading_after}_{label}"));

    // ── 6. Positional buckets ─────────────────────────────────────────────────
    feats.push(format!("LinePos={}_{label}", bucket(pos.line)));
    feats.push(format!("WordPos={}_{label}", bucket(pos.token)));
    feats.push(format!("NegLinePos={}_{label}", bucket(doc.num_lines() - pos.line)));
    feats.push(format!("NegWordPos={}_{label}", bucket(line.len() - pos.token)));

    feats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(lines: &[&str]) -> Document {
        Document::new(
            "t",
            lines
                .iter()
                .map(|l| l.split_whitespace().map(String::from).collect())
                .collect(),
        )
    }

    #[test]
    fn test_word_at_crosses_lines_through_boundary() {
        let d = doc(&["have 100 usd", "", "want 90 eur"]);
        let p = Position::new(2, 1); // "90"
        assert_eq!(word_at(&d, p, 0), "90");
        assert_eq!(word_at(&d, p, -1), "want");
        assert_eq!(word_at(&d, p, -2), SENT_BOUNDARY);
        assert_eq!(word_at(&d, p, -3), "usd");
        assert_eq!(word_at(&d, p, -5), "have");
        assert_eq!(word_at(&d, p, -6), SENT_BOUNDARY);
        assert_eq!(word_at(&d, p, -7), DOC_START);
        assert_eq!(word_at(&d, p, 1), "eur");
        assert_eq!(word_at(&d, p, 2), DOC_END);
        assert_eq!(word_at(&d, p, 6), DOC_END);
    }

    #[test]
    fn test_word_at_forward_into_next_line() {
        let d = doc(&["have 100", "want 90"]);
        let p = Position::new(0, 1);
        assert_eq!(word_at(&d, p, 1), SENT_BOUNDARY);
        assert_eq!(word_at(&d, p, 2), "want");
        assert_eq!(word_at(&d, p, 3), "90");
    }

    #[test]
    fn test_every_feature_carries_label() {
        let lex = Lexicon::default();
        let d = doc(&["have 100 usd want 90 eur"]);
        let feats = context_features(&d, Position::new(0, 1), "have", &lex);
        assert!(feats.iter().all(|f| f.ends_with("_have")));
        assert!(feats.contains(&"cw_100_have".to_string()));
        assert!(feats.contains(&"pw_have_have".to_string()));
        assert!(feats.contains(&"cw_map_###_have".to_string()));
        assert!(feats.contains(&"nw_map_CURRENCY_have".to_string()));
        assert!(feats.contains(&"TRADING_have_want_have".to_string()));
        assert!(feats.contains(&"WordPos=1_have".to_string()));
        assert!(feats.contains(&"NegWordPos=Large_have".to_string()));
    }

    #[test]
    fn test_filtered_ngrams_skip_unknown_symbols() {
        let lex = Lexicon::default();
        let d = doc(&["lol have 100 usd"]);
        let feats = context_features(&d, Position::new(0, 2), "want", &lex);
        assert!(feats
            .iter()
            .any(|f| f.starts_with("filter_") && f.contains("have_###_CURRENCY")));
    }

    #[test]
    fn test_features_are_deterministic() {
        let lex = Lexicon::default();
        let d = doc(&["h 5 pp", "w 4 btc"]);
        let a = context_features(&d, Position::new(1, 1), "rate", &lex);
        let b = context_features(&d, Position::new(1, 1), "rate", &lex);
        assert_eq!(a, b);
    }
}
