// ============================================================
// Layer 4 — Tokeniser
// ============================================================
// Posts are split on whitespace per line, then each word is
// split once more:
//
//   "50lr"       → "50" "lr"       number glued to a unit
//   "btc/ltc"    → "btc" "ltc"     slash-separated options
//   "paypal"     → "paypal"
//
// Line breaks are kept; an empty input line becomes an empty
// token line so gold line numbers stay aligned.

use once_cell::sync::Lazy;
use regex::Regex;

static COMPOUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9.]+)([A-Za-z]+)$").expect("valid compound regex"));

/// Split one whitespace-delimited word into tokens.
pub fn split_word(word: &str) -> Vec<String> {
    match COMPOUND_RE.captures(word) {
        Some(caps) => vec![caps[1].to_string(), caps[2].to_string()],
        None       => word.split('/').map(String::from).collect(),
    }
}

/// Tokenise raw text into lines of tokens.
pub fn tokenize(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.split_whitespace().flat_map(split_word).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_compound_number() {
        assert_eq!(split_word("50lr"), vec!["50", "lr"]);
        assert_eq!(split_word("2.5btc"), vec!["2.5", "btc"]);
    }

    #[test]
    fn test_split_on_slash() {
        assert_eq!(split_word("btc/ltc"), vec!["btc", "ltc"]);
        assert_eq!(split_word("lr50"), vec!["lr50"]);
    }

    #[test]
    fn test_tokenize_keeps_empty_lines() {
        let lines = tokenize("have 50lr\n\nwant pp/btc");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], vec!["have", "50", "lr"]);
        assert!(lines[1].is_empty());
        assert_eq!(lines[2], vec!["want", "pp", "btc"]);
    }
}
