// ============================================================
// Layer 5 — Anytime Best-First Search
// ============================================================
// Both joint decoders search a lattice of rank vectors: one
// dimension per field (or group), each rank indexing into that
// dimension's score-sorted option list.
//
//   start    [0, 0, 0, 0, 0]
//   succ     [1, 0, 0, 0, 0]  [0, 1, 0, 0, 0]  ...
//
// A successor advances exactly one dimension by one rank. The
// frontier is a max-heap on assignment score. The search stops
// when the best score has not improved for `search_steps`
// expansions, after `search_steps_max` expansions, or when the
// frontier is empty. The best assignment seen is returned even
// when the search stops early.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

// ─── SearchConfig ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Expansions without improvement before giving up
    pub search_steps: usize,

    /// Hard cap on total expansions
    pub search_steps_max: usize,
}

impl SearchConfig {
    /// Defaults for the five-field decoder
    pub fn fields() -> Self {
        Self { search_steps: 100, search_steps_max: 1000 }
    }

    /// Defaults for the group decoder
    pub fn groups() -> Self {
        Self { search_steps: 5, search_steps_max: 100 }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::fields()
    }
}

// ─── Frontier node ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
struct Node {
    score: f64,
    ranks: Vec<usize>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher score pops first; on equal scores the
        // lexicographically smaller rank vector pops first
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.ranks.cmp(&self.ranks))
    }
}

// ─── SearchOutcome ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub ranks:      Vec<usize>,
    pub score:      f64,
    pub expansions: usize,
}

/// Anytime best-first search over rank vectors.
///
/// `dims[i]` is the number of options in dimension `i` and must
/// be at least 1. `seeds` are extra starting points pushed next
/// to the all-zero start; the result is never worse than any of
/// them.
pub fn best_first<F>(dims: &[usize], seeds: &[Vec<usize>], mut score: F, config: &SearchConfig) -> SearchOutcome
where
    F: FnMut(&[usize]) -> f64,
{
    let start = vec![0; dims.len()];

    let mut visited: HashSet<Vec<usize>> = HashSet::new();
    let mut frontier: BinaryHeap<Node> = BinaryHeap::new();

    let start_score = score(&start);
    visited.insert(start.clone());
    let mut best = Node { score: start_score, ranks: start.clone() };
    frontier.push(best.clone());

    for seed in seeds {
        if seed.len() != dims.len() || visited.contains(seed) {
            continue;
        }
        let node = Node { score: score(seed), ranks: seed.clone() };
        visited.insert(seed.clone());
        if node.score > best.score {
            best = node.clone();
        }
        frontier.push(node);
    }

    let mut since_change = 0;
    let mut expansions   = 0;

    while since_change < config.search_steps && expansions < config.search_steps_max {
        let Some(current) = frontier.pop() else { break };
        expansions   += 1;
        since_change += 1;

        if current.score > best.score {
            best = current.clone();
            since_change = 0;
        }

        for dim in 0..dims.len() {
            if current.ranks[dim] + 1 >= dims[dim] {
                continue;
            }
            let mut next = current.ranks.clone();
            next[dim] += 1;
            if visited.insert(next.clone()) {
                let s = score(&next);
                frontier.push(Node { score: s, ranks: next });
            }
        }
    }

    SearchOutcome {
        ranks: best.ranks,
        score: best.score,
        expansions,
    }
}
