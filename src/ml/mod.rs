// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// Everything that scores, decodes, or learns lives here. The
// layer is plain Rust: sparse string features, a lazily updated
// weight vector, and search over small candidate lattices.
//
// What's in this layer:
//
//   lexicon.rs    — word classes and currency canonicalisation
//   features.rs   — context feature strings around one token
//   weights.rs    — feature table plus AdaGrad / perceptron store
//   label.rs      — per-token output labels
//   scorer.rs     — linear scoring through training or frozen views
//   search.rs     — anytime best-first search over rank vectors
//
//   decoder.rs    — the Decoder trait shared by all learned models
//   classifier.rs — independent per-token labelling
//   global.rs     — joint 5-field decoding with pair features
//   linked.rs     — one label per group of identical tokens
//
//   trainer.rs    — online structured learning loop
//   baseline.rs   — fixed-order and line-pattern heuristics
//   extractor.rs  — the closed set of extractor variants

/// Word classes, trading terms, and currency aliases
pub mod lexicon;

/// Context feature extraction
pub mod features;

/// Feature ids and the lazy-update weight store
pub mod weights;

/// Token labels (have / want / both / rate / background)
pub mod label;

/// Linear model and the Scorer views over it
pub mod scorer;

/// Best-first search over ranked candidate lists
pub mod search;

/// Decoder trait and decode modes
pub mod decoder;

/// Per-token classifier
pub mod classifier;

/// Joint field decoder
pub mod global;

/// Linked group decoder
pub mod linked;

/// Online training loop
pub mod trainer;

/// Non-learned baselines
pub mod baseline;

/// Extractor variants and persistence
pub mod extractor;
