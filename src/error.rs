//! Error types for memory operations.
//!
//! Only malformed input is an error. Retrieval failure is a normal outcome
//! delivered through the completion path, and a superseded completion is
//! silently dropped; neither appears here.

use thiserror::Error;

/// Result type alias for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Synchronous validation failures raised by the store entry points.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The chunk contained no tokens.
    #[error("empty chunk")]
    EmptyChunk,

    /// Slot:value pairs and bare values were mixed in one chunk.
    #[error("chunk mixes slot:value pairs with bare values")]
    MixedFormat,

    /// A token did not parse under the chunk mini-language.
    #[error("malformed token `{0}`")]
    BadToken(String),

    /// A request carried more than one `?` wildcard.
    #[error("requests must have no more than one `?`")]
    MultiplePlaceholders,

    /// `add` was given a chunk still containing a `?` wildcard.
    #[error("cannot store a chunk containing `?`")]
    PlaceholderInAdd,

    /// `resonance` was given a chunk containing a `?` wildcard.
    #[error("resonance requires a chunk with no `?`; use request instead")]
    PlaceholderInResonance,
}
