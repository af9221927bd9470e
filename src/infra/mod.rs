// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   checkpoint.rs      — Saving and loading trained extractors
//                        as JSON, together with the gazetteer
//                        and TrainConfig used to train them.
//
//   gazetteer_store.rs — Alias tables for the Lexicon: the
//                        built-in ones or a user JSON file.
//
//   metrics.rs         — Training metrics logging
//                        Writes pass-level metrics (mismatch
//                        rate, objective) to a CSV file.
//
//   evaluation.rs      — Scores guesses against gold and
//                        renders the summary table.

/// Extractor checkpoint saving and loading
pub mod checkpoint;

/// Gazetteer loading and persistence
pub mod gazetteer_store;

/// Training metrics CSV logger
pub mod metrics;

/// Gold-vs-guess scoring and summary tables
pub mod evaluation;
