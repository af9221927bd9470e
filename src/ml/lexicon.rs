// ============================================================
// Layer 5 — Lexicon (word classes and canonical forms)
// ============================================================
// Maps raw tokens onto the small vocabulary the models reason
// with:
//
//   "PayPal" → CURRENCY, canonical "paypal"
//   "1,500"  → NUMBER   ("###")
//   "need"   → trading keyword, canonical "want"
//   "you"    → common word,     canonical "your"
//   "lol"    → UNKNOWN  ("_")
//
// Lookups are case-insensitive. Multi-word currency names
// ("western union", "perfect money") are resolved by pairing a
// token with its neighbours before the single-token lookup
// result is accepted.
//
// The tables come from a Gazetteer: groups of aliases whose
// LAST alias is the canonical form. Everything here is a pure
// function of those tables.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::annotation::Position;
use crate::domain::document::Document;

/// Mapped symbol for unknown tokens (and for out-of-document slots)
pub const UNKNOWN_SYMBOL: &str = "_";
pub const NUMBER_SYMBOL:  &str = "###";
pub const CURRENCY_SYMBOL: &str = "CURRENCY";

/// Digits, commas and periods, with at least one digit
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[,.0-9]*[0-9][,.0-9]*$").expect("number pattern is valid")
});

pub fn is_number(token: &str) -> bool {
    NUMBER_RE.is_match(token)
}

// ─── Gazetteer ────────────────────────────────────────────────────────────────
/// The three alias tables. Each inner Vec is one group of
/// aliases; its last entry is the canonical spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gazetteer {
    pub currency: Vec<Vec<String>>,
    pub trading:  Vec<Vec<String>>,
    pub common:   Vec<Vec<String>>,
}

const DEFAULT_CURRENCY: &[&[&str]] = &[
    &["adsense"],
    &["amazon"],
    &["ap", "alterpay"],
    &["bank", "deposit", "bank deposit"],
    &["bloocoins", "bloocoin"],
    &["btc", "bitcoin", "bit", "coin", "coins", "btc-e", "bitcoins", "bitcoin"],
    &["cage", "cagecoin"],
    &["cashu"],
    &["catcoin"],
    &["cc", "credit", "credit card"],
    &["coye", "coinye"],
    &["doge", "doges", "dogecoin", "doge coins", "doge coin", "dogecoins"],
    &["dwolla"],
    &["ego", "egopay"],
    &["flappycoins", "flappycoin"],
    &["freelancers"],
    &["interac"],
    &["liberty", "reserve", "l.r", "lr", "libertyreserve", "liberty reserve"],
    &["ltc", "lite-coin", "lite-coints", "litecoins", "litecoin"],
    &["mb", "moneybooker", "booker", "moneybrokers", "moneybookers"],
    &["mg", "gram", "moneygram"],
    &["mp", "pak", "moneypaks", "moneypak"],
    &["neteller"],
    &["okpay"],
    &["omc", "omcv2", "omcs", "open metaverse currency", "open metaverse"],
    &["omnicoins", "omnicoin"],
    &["payoneer"],
    &["pf", "perfectmoney", "perfect money"],
    &["pokerstars"],
    &["pp", "pay pal", "pay-pal", "paypal"],
    &["protoshares"],
    &["psc", "paysafe", "paysafecards", "paysafecard", "pay safe card"],
    &["pz", "payza"],
    &["skrill"],
    &["solid", "solidtrustpay"],
    &["starbucks"],
    &["steam"],
    &["stp"],
    &["ukash"],
    &["venmo"],
    &["wdc", "world coins", "worldcoins"],
    &["wmz", "webmoney", "web money"],
    &["wu", "w.u", "western", "union", "western union"],
    &["zetacoin"],
    // fiat
    &["$", "dollar", "dollars", "us dollars", "usd"],
    &["€", "euro", "euros", "eur"],
    &["£", "pound", "pounds", "gbp"],
    &["aud"],
    &["cad"],
    &["inr"],
];

const DEFAULT_TRADING: &[&[&str]] = &[
    &["h", "got", "have"],
    &["n", "w", "need", "want"],
    &[":"],
    &["for", "to", ">"],
    &["<"],
];

const DEFAULT_COMMON: &[&[&str]] = &[
    &["i", "my", "me"],
    &["u", "you", "your"],
    &["go"],
    &["exchange"],
    &["can"],
    &["with"],
    &["do"],
    &["will"],
    &["or"],
    &["this"],
    &["a"],
    &["if"],
    &["and"],
];

fn to_groups(table: &[&[&str]]) -> Vec<Vec<String>> {
    table
        .iter()
        .map(|group| group.iter().map(|s| s.to_string()).collect())
        .collect()
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self {
            currency: to_groups(DEFAULT_CURRENCY),
            trading:  to_groups(DEFAULT_TRADING),
            common:   to_groups(DEFAULT_COMMON),
        }
    }
}

// ─── WordClass ────────────────────────────────────────────────────────────────
/// Coarse semantic category used by the decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Currency,
    Number,
    Unknown,
}

/// Fine-grained class of a token. Trading and common words
/// carry their canonical spelling because features use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordClass<'a> {
    Currency,
    Number,
    Trading(&'a str),
    Common(&'a str),
    Unknown,
}

impl<'a> WordClass<'a> {
    /// The symbol this class contributes to feature keys
    pub fn symbol(&self) -> &'a str {
        match *self {
            WordClass::Currency   => CURRENCY_SYMBOL,
            WordClass::Number     => NUMBER_SYMBOL,
            WordClass::Trading(c) => c,
            WordClass::Common(c)  => c,
            WordClass::Unknown    => UNKNOWN_SYMBOL,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            WordClass::Currency => Category::Currency,
            WordClass::Number   => Category::Number,
            _                   => Category::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, WordClass::Unknown)
    }
}

// ─── Lexicon ──────────────────────────────────────────────────────────────────
/// Lowercased alias → canonical lookup tables built from a Gazetteer.
#[derive(Debug, Clone)]
pub struct Lexicon {
    currency: HashMap<String, String>,
    trading:  HashMap<String, String>,
    common:   HashMap<String, String>,
}

fn index(groups: &[Vec<String>]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for group in groups {
        let Some(canonical) = group.last() else { continue };
        let canonical = canonical.to_lowercase();
        for alias in group {
            map.insert(alias.to_lowercase(), canonical.clone());
        }
    }
    map
}

impl Lexicon {
    pub fn new(gazetteer: &Gazetteer) -> Self {
        Self {
            currency: index(&gazetteer.currency),
            trading:  index(&gazetteer.trading),
            common:   index(&gazetteer.common),
        }
    }

    /// Classify a single token, ignoring its neighbours.
    /// Currency wins over trading, trading over common, and any
    /// dictionary hit over the numeric pattern.
    pub fn classify(&self, token: &str) -> WordClass<'_> {
        let lower = token.to_lowercase();
        if self.currency.contains_key(&lower) {
            WordClass::Currency
        } else if let Some(c) = self.trading.get(&lower) {
            WordClass::Trading(c)
        } else if let Some(c) = self.common.get(&lower) {
            WordClass::Common(c)
        } else if is_number(token) {
            WordClass::Number
        } else {
            WordClass::Unknown
        }
    }

    /// Canonical trading keyword for a token, if it is one
    pub fn trading(&self, token: &str) -> Option<&str> {
        self.trading.get(&token.to_lowercase()).map(String::as_str)
    }

    pub fn is_trading(&self, token: &str) -> bool {
        self.trading(token).is_some()
    }

    /// Canonical currency name for a (possibly multi-word) phrase
    pub fn currency(&self, phrase: &str) -> Option<&str> {
        self.currency.get(&phrase.to_lowercase()).map(String::as_str)
    }

    /// Class and canonical string of the token at `pos`.
    ///
    /// The previous-token pair and then the next-token pair are
    /// checked against the currency table; a hit forces CURRENCY
    /// and the table's canonical form, overriding the
    /// single-token answer. A missing neighbour pairs as "_".
    pub fn canonicalize(&self, pos: Position, doc: &Document) -> (WordClass<'_>, String) {
        let line  = doc.line(pos.line);
        let token = line.get(pos.token).map(String::as_str).unwrap_or(UNKNOWN_SYMBOL);

        let mut class = self.classify(token);
        let mut canon = match self.currency(token) {
            Some(c) => c.to_string(),
            None    => token.to_lowercase(),
        };

        let prev = pos
            .token
            .checked_sub(1)
            .and_then(|t| line.get(t))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SYMBOL);
        let next = line
            .get(pos.token + 1)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SYMBOL);

        for pair in [format!("{prev} {token}"), format!("{token} {next}")] {
            if let Some(c) = self.currency(&pair) {
                canon = c.to_string();
                class = WordClass::Currency;
            }
        }

        (class, canon)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(&Gazetteer::default())
    }
}
