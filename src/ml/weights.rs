// ============================================================
// Layer 5 — Weight Store (lazily regularised online learner)
// ============================================================
// Sparse linear weights, one per interned feature key, trained
// with an adaptive-gradient rule that has L2 shrinkage built in:
//
//   s  = s + g²                       (squared-gradient sum)
//   q  = √s                           (per-feature rate)
//   w' = (w·q − η·g) / (η·λ + q)      (step + shrink)
//
// A feature that receives no gradient in an iteration still
// shrinks by q / (η·λ + q). Doing that eagerly would touch every
// feature on every step, so the shrink is deferred: each entry
// remembers the iteration it was last brought up to date and
// a read applies all pending shrinks at once,
//
//   w = w · (q / (η·λ + q))^Δt
//
// Perceptron mode switches the whole rule off: the raw gradient
// is subtracted, there is no adaptive rate and nothing decays.
//
// Reference: Duchi, Hazan & Singer (2011) AdaGrad
//            Collins (2002) structured perceptron

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Initial squared-gradient value. Keeps q > 0 for fresh features.
pub const SQ_GRADIENT_FLOOR: f64 = 1e-6;

// ─── FeatureId / FeatureTable ─────────────────────────────────────────────────
/// Stable small-integer id of an interned feature key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub u32);

impl FeatureId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Append-only interning arena: feature key → id.
///
/// Serialised as the key list in id order, so a reload hands out
/// exactly the same ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureTable {
    names: Vec<String>,
    ids:   HashMap<String, FeatureId>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `key`, allocating the next id on first sight
    pub fn get_or_create(&mut self, key: &str) -> FeatureId {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        let id = FeatureId(self.names.len() as u32);
        self.names.push(key.to_string());
        self.ids.insert(key.to_string(), id);
        id
    }

    /// Id of `key` without allocating
    pub fn lookup(&self, key: &str) -> Option<FeatureId> {
        self.ids.get(key).copied()
    }

    pub fn name(&self, id: FeatureId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<Vec<String>> for FeatureTable {
    fn from(names: Vec<String>) -> Self {
        let ids = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), FeatureId(i as u32)))
            .collect();
        Self { names, ids }
    }
}

impl From<FeatureTable> for Vec<String> {
    fn from(table: FeatureTable) -> Self {
        table.names
    }
}

// ─── UpdateRule ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateRule {
    /// η — step size
    pub step: f64,

    /// λ — L2 regularisation strength
    pub reg: f64,

    /// Plain perceptron updates instead of the adaptive rule
    pub perceptron: bool,
}

impl Default for UpdateRule {
    fn default() -> Self {
        Self {
            step:       0.01,
            reg:        1e-5,
            perceptron: false,
        }
    }
}

// ─── WeightEntry ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub value:       f64,
    pub sq_gradient: f64,

    /// Iteration through which `value` already includes decay
    pub last_update: u64,
}

// ─── WeightStore ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightStore {
    rule:      UpdateRule,
    entries:   Vec<WeightEntry>,

    /// Number of committed steps. Only ever increases.
    iteration: u64,

    /// Gradient accumulated since the last step, ordered by id so
    /// a step touches features in a fixed order
    #[serde(default)]
    pending:   BTreeMap<FeatureId, f64>,
}

impl WeightStore {
    pub fn new(rule: UpdateRule) -> Self {
        Self {
            rule,
            entries:   Vec::new(),
            iteration: 0,
            pending:   BTreeMap::new(),
        }
    }

    pub fn rule(&self) -> UpdateRule {
        self.rule
    }

    #[cfg(test)]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn entry(&self, id: FeatureId) -> Option<&WeightEntry> {
        self.entries.get(id.index())
    }

    /// Create entries up to and including `id`.
    /// New entries start at value 0, squared gradient ε and the
    /// current iteration.
    pub fn ensure(&mut self, id: FeatureId) {
        while self.entries.len() <= id.index() {
            self.entries.push(WeightEntry {
                value:       0.0,
                sq_gradient: SQ_GRADIENT_FLOOR,
                last_update: self.iteration,
            });
        }
    }

    /// Shrink applied per elapsed iteration: q / (η·λ + q)
    fn decay_factor(&self, entry: &WeightEntry) -> f64 {
        let q = entry.sq_gradient.sqrt();
        q / (self.rule.step * self.rule.reg + q)
    }

    fn decayed(&self, entry: &WeightEntry) -> f64 {
        if self.rule.perceptron {
            return entry.value;
        }
        let dt = self.iteration.saturating_sub(entry.last_update);
        if dt == 0 {
            entry.value
        } else {
            entry.value * self.decay_factor(entry).powf(dt as f64)
        }
    }

    /// Fully decayed value of `id` without recording anything.
    /// Unknown ids read as 0.
    pub fn current_value(&self, id: FeatureId) -> f64 {
        self.entry(id).map_or(0.0, |e| self.decayed(e))
    }

    /// Fully decayed value of `id`, stored back so the decay is
    /// not applied twice. Used on the training path.
    pub fn refresh(&mut self, id: FeatureId) -> f64 {
        self.ensure(id);
        let entry = self.entries[id.index()];
        let value = self.decayed(&entry);
        if !self.rule.perceptron && entry.last_update < self.iteration {
            let e = &mut self.entries[id.index()];
            e.value       = value;
            e.last_update = self.iteration;
        }
        value
    }

    pub fn accumulate_gradient(&mut self, id: FeatureId, delta: f64) {
        *self.pending.entry(id).or_insert(0.0) += delta;
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Commit the accumulated gradient as one iteration.
    pub fn apply_step(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        let next    = self.iteration + 1;

        for (id, g) in pending {
            if self.rule.perceptron {
                self.ensure(id);
                self.entries[id.index()].value -= g;
                continue;
            }

            // bring the value up to date through the current iteration,
            // the update below then accounts for the new one
            let w   = self.refresh(id);
            let eta = self.rule.step;
            let lam = self.rule.reg;

            let e = &mut self.entries[id.index()];
            e.sq_gradient += g * g;
            let q = e.sq_gradient.sqrt();
            e.value       = (w * q - eta * g) / (eta * lam + q);
            e.last_update = next;
        }

        self.iteration = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store(perceptron: bool) -> WeightStore {
        WeightStore::new(UpdateRule { perceptron, ..UpdateRule::default() })
    }

    #[test]
    fn test_feature_ids_are_stable_and_append_only() {
        let mut t = FeatureTable::new();
        let a = t.get_or_create("cw_usd_have");
        let b = t.get_or_create("pw_have_have");
        assert_eq!(t.get_or_create("cw_usd_have"), a);
        assert_eq!(a, FeatureId(0));
        assert_eq!(b, FeatureId(1));
        assert_eq!(t.lookup("missing"), None);
        assert_eq!(t.name(b), Some("pw_have_have"));
    }

    #[test]
    fn test_feature_table_serialises_in_id_order() {
        let mut t = FeatureTable::new();
        t.get_or_create("b");
        t.get_or_create("a");
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"["b","a"]"#);
        let back: FeatureTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.lookup("a"), Some(FeatureId(1)));
    }

    #[test]
    fn test_new_entry_defaults() {
        let mut s = store(false);
        s.apply_step();
        s.ensure(FeatureId(2));
        let e = s.entry(FeatureId(2)).unwrap();
        assert_eq!(e.value, 0.0);
        assert_eq!(e.sq_gradient, SQ_GRADIENT_FLOOR);
        assert_eq!(e.last_update, 1);
    }

    #[test]
    fn test_adaptive_update_formula() {
        let mut s = store(false);
        let id = FeatureId(0);
        s.ensure(id);
        s.accumulate_gradient(id, 1.0);
        s.accumulate_gradient(id, 1.0);
        s.apply_step();

        let sq = SQ_GRADIENT_FLOOR + 4.0;
        let q  = sq.sqrt();
        let expected = (0.0 * q - 0.01 * 2.0) / (0.01 * 1e-5 + q);
        assert_eq!(s.current_value(id), expected);
        assert_eq!(s.iteration(), 1);
    }

    #[test]
    fn test_perceptron_subtracts_raw_gradient() {
        let mut s = store(true);
        let id = FeatureId(0);
        s.accumulate_gradient(id, 1.0);
        s.apply_step();
        s.accumulate_gradient(id, -3.0);
        s.apply_step();
        // no decay however long it sits
        for _ in 0..10 {
            s.apply_step();
        }
        assert_eq!(s.current_value(id), 2.0);
    }

    #[test]
    fn test_perceptron_and_adaptive_trajectories_differ() {
        let mut a = store(false);
        let mut p = store(true);
        let id = FeatureId(0);
        for g in [1.0, -1.0, 1.0, 1.0] {
            a.accumulate_gradient(id, g);
            p.accumulate_gradient(id, g);
            a.apply_step();
            p.apply_step();
        }
        assert_ne!(a.current_value(id), p.current_value(id));

        // with gradients permanently zero both stay at zero
        let other = FeatureId(1);
        a.ensure(other);
        p.ensure(other);
        for _ in 0..3 {
            a.accumulate_gradient(other, 0.0);
            p.accumulate_gradient(other, 0.0);
            a.apply_step();
            p.apply_step();
        }
        assert_eq!(a.current_value(other), 0.0);
        assert_eq!(p.current_value(other), 0.0);
    }

    #[test]
    fn test_refresh_records_decay_once() {
        let mut s = store(false);
        let id = FeatureId(0);
        s.accumulate_gradient(id, -1.0);
        s.apply_step();
        for _ in 0..5 {
            s.apply_step();
        }
        let pure = s.current_value(id);
        let read = s.refresh(id);
        assert_eq!(pure, read);
        assert_eq!(s.entry(id).unwrap().last_update, s.iteration());
        // a second read must not shrink again
        assert_eq!(s.refresh(id), read);
        assert_eq!(s.current_value(id), read);
    }

    proptest! {
        #[test]
        fn prop_lazy_decay_matches_eager(
            grads in prop::collection::vec(-3.0f64..3.0, 1..5),
            idle in 0u64..40,
        ) {
            let mut s = store(false);
            let id = FeatureId(0);
            for g in &grads {
                s.accumulate_gradient(id, *g);
                s.apply_step();
            }
            let after_touch = s.current_value(id);
            let entry = *s.entry(id).unwrap();
            let q = entry.sq_gradient.sqrt();
            let factor = q / (0.01 * 1e-5 + q);

            // untouched iterations: other features step, this one idles
            let mut eager = after_touch;
            for _ in 0..idle {
                s.accumulate_gradient(FeatureId(1), 1.0);
                s.apply_step();
                eager *= factor;
            }

            let lazy = s.current_value(id);
            let tol = 1e-12 * eager.abs().max(1e-300);
            prop_assert!((lazy - eager).abs() <= tol, "lazy {} eager {}", lazy, eager);
        }
    }
}
