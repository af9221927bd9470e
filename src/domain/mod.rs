// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the extractor:
//
//   - a Document is lines of tokens
//   - a Position points at one token in a Document
//   - an Annotation tags positions as have / want / rate
//
// Rules for this layer:
//   - NO file I/O
//   - NO model or scoring code
//   - Only plain structs, enums, and traits
//
// Everything above this layer (data loading, learning,
// decoding, evaluation) speaks in these types.

// Tokenised documents, with or without gold spans
pub mod document;

// Positions, tags, and the have/want/rate annotation
pub mod annotation;

// Core abstractions (traits) that other layers implement
pub mod traits;
