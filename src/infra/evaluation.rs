// ============================================================
// Layer 6 — Evaluation
// ============================================================
// Compares a system's annotation with the gold annotation of
// the same document.
//
// Every tagged position becomes a value (kind, canonical):
//
//   rate field              → Rate
//   number or number word   → Number   (counted as "amount")
//   anything else           → Currency
//
// In unique mode the values of a field form a set, so "50 usd
// ... usd" scores the currency once. In all-values mode the
// position is part of the value and every occurrence counts.
//
// Per document we record, for each bucket (currency, amount,
// rate), how many gold values were matched, missed, or guessed
// without support. A document is complete when nothing was
// missed and nothing extra was guessed.
//
// A guessed want-currency that gold lists only under have (or
// the reverse) is a direction error. When both directions occur
// in one document the document counts as reversed.
//
// Example table row:
//
//      all  true                         global |   3   1  40 |  97.6  93.0  95.2 |   2.0 |   1.0 |  80.0

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::domain::annotation::{Annotation, Position, Tag};
use crate::domain::document::Document;
use crate::ml::lexicon::{is_number, Lexicon};

/// Canonical words scored as amounts rather than currencies
const NUMBER_WORDS: &[&str] = &[
    "_", "usd", "aud", "gbp", "ind", "inr", "euro", "indian", "uk", "us", "k", "m",
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
    "hundred", "thousand", "million", "dollars",
];

// ─── Value ────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Currency,
    Number,
    Rate,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Value {
    kind:     ValueKind,
    canon:    String,
    position: Option<Position>,
}

fn value_kind(canon: &str, tag: Tag) -> ValueKind {
    if tag == Tag::Rate {
        ValueKind::Rate
    } else if is_number(canon) || NUMBER_WORDS.contains(&canon) {
        ValueKind::Number
    } else {
        ValueKind::Currency
    }
}

/// Collapse two-token currency names onto their second token so a
/// phrase tagged on both words counts once.
fn merge_multiword(positions: &[Position], doc: &Document, lexicon: &Lexicon) -> Vec<Position> {
    let pair_at = |pos: Position| -> Option<String> {
        let line = doc.line(pos.line);
        let next = line.get(pos.token + 1)?;
        Some(format!("{} {}", line.get(pos.token)?, next))
    };
    let is_pair = |pos: Position| pair_at(pos).is_some_and(|p| lexicon.currency(&p).is_some());

    let mut merged: Vec<Position> = Vec::with_capacity(positions.len());
    for (i, &pos) in positions.iter().enumerate() {
        let next_is_partner = positions
            .get(i + 1)
            .is_some_and(|n| n.line == pos.line && n.token == pos.token + 1);
        if next_is_partner && is_pair(pos) {
            continue;
        }
        merged.push(pos);
    }

    let mut out: Vec<Position> = merged
        .into_iter()
        .map(|pos| if is_pair(pos) { Position::new(pos.line, pos.token + 1) } else { pos })
        .collect();
    out.sort();
    out.dedup();
    out
}

fn values(
    annotation: &Annotation,
    tag:        Tag,
    doc:        &Document,
    lexicon:    &Lexicon,
    unique:     bool,
) -> BTreeSet<Value> {
    merge_multiword(annotation.positions(tag), doc, lexicon)
        .into_iter()
        .map(|pos| {
            let (_, canon) = lexicon.canonicalize(pos, doc);
            Value {
                kind:     value_kind(&canon, tag),
                canon,
                position: if unique { None } else { Some(pos) },
            }
        })
        .collect()
}

// ─── Counts ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub missing: usize,
    pub extra:   usize,
    pub matched: usize,
}

impl Counts {
    /// matched / (matched + extra), 1.0 when nothing was guessed
    pub fn precision(&self) -> f64 {
        let denom = self.matched + self.extra;
        if denom == 0 { 1.0 } else { self.matched as f64 / denom as f64 }
    }

    /// matched / (matched + missing), 1.0 when gold is empty
    pub fn recall(&self) -> f64 {
        let denom = self.matched + self.missing;
        if denom == 0 { 1.0 } else { self.matched as f64 / denom as f64 }
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    pub fn is_clean(&self) -> bool {
        self.missing == 0 && self.extra == 0
    }

    fn add(&mut self, other: &Counts) {
        self.missing += other.missing;
        self.extra   += other.extra;
        self.matched += other.matched;
    }
}

// ─── DocumentScore ────────────────────────────────────────────────────────────
/// Comparison of one guess against one gold annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentScore {
    pub currency: Counts,
    pub amount:   Counts,
    pub rate:     Counts,

    /// Guessed have-currencies that gold has only as want
    pub have_want: usize,
    /// Guessed want-currencies that gold has only as have
    pub want_have: usize,
    /// Gold currency values over all fields
    pub gold_currencies: usize,

    /// Both direction errors occurred
    pub reversed: bool,
}

impl DocumentScore {
    pub fn is_complete(&self) -> bool {
        self.currency.is_clean() && self.amount.is_clean() && self.rate.is_clean()
    }

    fn bucket(&mut self, kind: ValueKind) -> &mut Counts {
        match kind {
            ValueKind::Rate     => &mut self.rate,
            ValueKind::Currency => &mut self.currency,
            ValueKind::Number   => &mut self.amount,
        }
    }
}

/// Score `guess` against `gold` on one document.
pub fn score_document(
    guess:   &Annotation,
    gold:    &Annotation,
    doc:     &Document,
    lexicon: &Lexicon,
    unique:  bool,
) -> DocumentScore {
    let mut score = DocumentScore::default();
    let mut gold_curr:  BTreeMap<Tag, Vec<String>> = BTreeMap::new();
    let mut guess_curr: BTreeMap<Tag, Vec<String>> = BTreeMap::new();

    for tag in Tag::ALL {
        let guessed = values(guess, tag, doc, lexicon, unique);
        let golden  = values(gold, tag, doc, lexicon, unique);

        for v in golden.iter().filter(|v| v.kind == ValueKind::Currency) {
            score.gold_currencies += 1;
            gold_curr.entry(tag).or_default().push(v.canon.clone());
        }
        for v in guessed.iter().filter(|v| v.kind == ValueKind::Currency) {
            guess_curr.entry(tag).or_default().push(v.canon.clone());
        }

        for v in &golden {
            let found = guessed.contains(v);
            let counts = score.bucket(v.kind);
            if found { counts.matched += 1 } else { counts.missing += 1 }
        }
        for v in guessed.difference(&golden) {
            score.bucket(v.kind).extra += 1;
        }
    }

    let listed = |map: &BTreeMap<Tag, Vec<String>>, tag: Tag, canon: &String| {
        map.get(&tag).is_some_and(|vals| vals.contains(canon))
    };
    for canon in guess_curr.get(&Tag::Want).into_iter().flatten() {
        if !listed(&gold_curr, Tag::Want, canon) && listed(&gold_curr, Tag::Have, canon) {
            score.want_have += 1;
        }
    }
    for canon in guess_curr.get(&Tag::Have).into_iter().flatten() {
        if !listed(&gold_curr, Tag::Have, canon) && listed(&gold_curr, Tag::Want, canon) {
            score.have_want += 1;
        }
    }
    score.reversed = score.want_have > 0 && score.have_want > 0;

    score
}

// ─── EvalSummary ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemTotals {
    pub documents: usize,
    pub complete:  usize,
    pub reversed:  usize,
    pub have_want: usize,
    pub want_have: usize,
    pub gold_currencies: usize,

    pub currency: Counts,
    pub amount:   Counts,
    pub rate:     Counts,

    /// Documents with no error in the given bucket
    pub currency_complete: usize,
    pub amount_complete:   usize,
    pub rate_complete:     usize,
}

impl SystemTotals {
    pub fn add(&mut self, s: &DocumentScore) {
        self.documents       += 1;
        self.complete        += s.is_complete() as usize;
        self.reversed        += s.reversed as usize;
        self.have_want       += s.have_want;
        self.want_have       += s.want_have;
        self.gold_currencies += s.gold_currencies;

        self.currency.add(&s.currency);
        self.amount.add(&s.amount);
        self.rate.add(&s.rate);

        self.currency_complete += s.currency.is_clean() as usize;
        self.amount_complete   += s.amount.is_clean() as usize;
        self.rate_complete     += s.rate.is_clean() as usize;
    }

    pub fn all(&self) -> Counts {
        let mut c = self.currency;
        c.add(&self.amount);
        c.add(&self.rate);
        c
    }
}

/// Running totals per (system, unique mode)
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvalSummary {
    totals: BTreeMap<(String, bool), SystemTotals>,
}

fn pct(num: usize, denom: usize) -> f64 {
    if denom == 0 { 100.0 } else { 100.0 * num as f64 / denom as f64 }
}

impl EvalSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, system: &str, unique: bool, score: &DocumentScore) {
        self.totals
            .entry((system.to_string(), unique))
            .or_default()
            .add(score);
    }

    pub fn totals(&self, system: &str, unique: bool) -> Option<&SystemTotals> {
        self.totals.get(&(system.to_string(), unique))
    }

    /// Fixed-width table, one row per (field, mode, system)
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>8} {:>5} {:>30} | {:>3} {:>3} {:>3} | {:>5} {:>5} {:>5} | {:>5} | {:>5} | {:>5}",
            "field", "uni", "system", "-", "+", "=", "P", "R", "F", "Rev", "Re2", "Complete",
        );

        let mut rows = Vec::new();
        for ((system, unique), t) in &self.totals {
            let n = t.documents;
            let direction = pct(t.have_want + t.want_have, t.gold_currencies);
            let reversed  = if n == 0 { 0.0 } else { 100.0 * t.reversed as f64 / n as f64 };

            let fields = [
                ("all",      t.all(),    direction, reversed, t.complete),
                ("currency", t.currency, 100.0,     0.0,      t.currency_complete),
                ("amount",   t.amount,   100.0,     0.0,      t.amount_complete),
                ("rate",     t.rate,     100.0,     0.0,      t.rate_complete),
            ];
            for (field, c, rev, re2, complete) in fields {
                rows.push(format!(
                    "{:>8} {:>5} {:>30} | {:>3} {:>3} {:>3} | {:>5.1} {:>5.1} {:>5.1} | {:>5.1} | {:>5.1} | {:>5.1}",
                    field,
                    unique,
                    system,
                    c.missing,
                    c.extra,
                    c.matched,
                    100.0 * c.precision(),
                    100.0 * c.recall(),
                    100.0 * c.f1(),
                    rev,
                    re2,
                    pct(complete, n),
                ));
            }
        }
        rows.sort();
        for row in rows {
            out.push_str(&row);
            out.push('\n');
        }
        out
    }
}
