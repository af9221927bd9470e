// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer turns files on disk into tokenised documents with
// optional gold annotations.
//
// The pipeline flows in this order:
//
//   corpus list file  (raw path, gold path per line)
//       │
//       ▼
//   CorpusLoader      → reads both files for each entry
//       │
//       ▼
//   tokenize          → lines of whitespace tokens, with
//       │               "50lr" and "btc/ltc" split apart
//       ▼
//   parse_gold        → inline {have} [want] |rate| markers
//       │               mapped back onto raw token positions
//       ▼
//   split_train_val   → optional seeded held-out split
//
// Each module is responsible for exactly one step.

/// Whitespace tokeniser with compound splitting
pub mod tokenize;

/// Inline gold annotation parser
pub mod gold;

/// Reads `raw gold` list files into LabeledDocuments
pub mod loader;

/// Shuffles and splits documents into train/held-out sets
pub mod splitter;
