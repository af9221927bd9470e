// ============================================================
// Domain Errors
// ============================================================
// Typed failures raised by the domain, data and ML layers.
// The application layer converts them into anyhow::Error and
// attaches file-level context, so a CLI user sees both the
// document that failed and the reason.
//
// None of these are retried. Malformed input is fatal for the
// document being processed.

use thiserror::Error;

use crate::domain::annotation::Position;

/// Result alias for the domain and ML layers
pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// An inline annotation opened a span without closing it
    /// (or closed one that was never opened)
    #[error("malformed annotation in '{source_name}' line {line}: {text}")]
    MalformedAnnotation {
        source_name: String,
        line:        usize,
        text:        String,
    },

    /// Only have / want / rate are valid annotation tags
    #[error("unknown annotation tag '{0}'")]
    UnknownTag(String),

    /// A gold span points outside the tokenised raw document
    #[error("gold position {position} is outside document '{source_name}'")]
    PositionOutOfRange {
        source_name: String,
        position:    Position,
    },

    /// A model name that is not one of the extractor variants
    #[error("unknown extractor '{0}'")]
    UnknownModel(String),

    /// A decoder field ended up with no candidates at all
    #[error("no candidates generated for field '{0}'")]
    EmptyCandidates(String),

    /// Training was asked to learn from a document without gold spans
    #[error("document '{0}' has no gold annotation")]
    MissingGold(String),
}
