//! Error types for chain operations.

use thiserror::Error;

use crate::ValueEncoding;

/// Errors produced by a chain.
///
/// Adapters never invent these; whatever the chain reports is handed to the
/// caller unchanged, through either a resolved `Request` or a callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// A block index past the end of the chain was requested without waiting.
    #[error("block {index} is out of bounds (length {length})")]
    OutOfBounds { index: u64, length: u64 },

    /// A byte offset past the end of the chain was sought without waiting.
    #[error("byte offset {offset} is out of bounds (byte length {byte_length})")]
    ByteOffsetOutOfBounds { offset: u64, byte_length: u64 },

    /// The chain does not accept appends.
    #[error("chain is not writable")]
    NotWritable,

    /// The chain has been closed.
    #[error("chain is closed")]
    Closed,

    /// The request was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// A block could not be encoded or decoded with the chain's value encoding.
    #[error("{encoding} encoding error: {message}")]
    Encoding {
        encoding: ValueEncoding,
        message: String,
    },

    /// A block exceeded the size limit of a write stream.
    #[error("block of {size} bytes exceeds the {max} byte limit")]
    BlockTooLarge { size: usize, max: usize },

    /// The underlying storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The chain dropped a completion callback without invoking it.
    #[error("completion callback dropped before it was invoked")]
    Abandoned,
}
