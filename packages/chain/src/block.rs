//! Blocks, batches, and the value encodings that turn them into bytes.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ChainError;

/// A single entry of a chain, as seen by callers.
///
/// Chains store bytes. Which `Block` variant comes back from a read depends on
/// the `ValueEncoding` used to decode it.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Opaque bytes (`binary` encoding).
    Binary(Bytes),
    /// UTF-8 text (`utf-8` encoding).
    Text(String),
    /// A JSON document (`json` encoding).
    Json(serde_json::Value),
}

impl Block {
    /// The text of a `Text` block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Block::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The bytes of a `Binary` block.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Block::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// The document of a `Json` block.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Block::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for Block {
    fn from(s: &str) -> Self {
        Block::Text(s.to_string())
    }
}

impl From<String> for Block {
    fn from(s: String) -> Self {
        Block::Text(s)
    }
}

impl From<Bytes> for Block {
    fn from(b: Bytes) -> Self {
        Block::Binary(b)
    }
}

impl From<Vec<u8>> for Block {
    fn from(b: Vec<u8>) -> Self {
        Block::Binary(Bytes::from(b))
    }
}

impl From<serde_json::Value> for Block {
    fn from(v: serde_json::Value) -> Self {
        Block::Json(v)
    }
}

/// One or more blocks appended in a single operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch(Vec<Block>);

impl Batch {
    /// Create a batch from blocks.
    pub fn new(blocks: Vec<Block>) -> Self {
        Batch(blocks)
    }

    /// Number of blocks in the batch.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the batch holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the blocks.
    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.0.iter()
    }

    /// Unwrap, returning the blocks.
    pub fn into_blocks(self) -> Vec<Block> {
        self.0
    }
}

impl From<Block> for Batch {
    fn from(block: Block) -> Self {
        Batch(vec![block])
    }
}

impl From<&str> for Batch {
    fn from(s: &str) -> Self {
        Batch(vec![Block::from(s)])
    }
}

impl From<String> for Batch {
    fn from(s: String) -> Self {
        Batch(vec![Block::from(s)])
    }
}

impl From<Vec<Block>> for Batch {
    fn from(blocks: Vec<Block>) -> Self {
        Batch(blocks)
    }
}

impl FromIterator<Block> for Batch {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        Batch(iter.into_iter().collect())
    }
}

impl IntoIterator for Batch {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// How blocks are converted to and from stored bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueEncoding {
    /// Bytes in, bytes out.
    #[default]
    #[serde(rename = "binary")]
    Binary,
    /// UTF-8 strings.
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    /// JSON documents.
    #[serde(rename = "json")]
    Json,
}

impl ValueEncoding {
    /// The canonical name of this encoding.
    pub fn name(&self) -> &'static str {
        match self {
            ValueEncoding::Binary => "binary",
            ValueEncoding::Utf8 => "utf-8",
            ValueEncoding::Json => "json",
        }
    }

    /// Encode a block into the bytes a chain stores.
    pub fn encode(&self, block: &Block) -> Result<Bytes, ChainError> {
        match (self, block) {
            (ValueEncoding::Binary | ValueEncoding::Utf8, Block::Binary(b)) => Ok(b.clone()),
            (ValueEncoding::Binary | ValueEncoding::Utf8, Block::Text(s)) => {
                Ok(Bytes::copy_from_slice(s.as_bytes()))
            }
            (ValueEncoding::Json, Block::Binary(_)) => Err(self.error("binary block is not JSON")),
            (ValueEncoding::Json, Block::Text(s)) => {
                self.json_bytes(&serde_json::Value::from(s.as_str()))
            }
            (ValueEncoding::Json, Block::Json(v)) => self.json_bytes(v),
            (_, Block::Json(v)) => Ok(Bytes::from(v.to_string())),
        }
    }

    /// Decode stored bytes into a block.
    pub fn decode(&self, bytes: &Bytes) -> Result<Block, ChainError> {
        match self {
            ValueEncoding::Binary => Ok(Block::Binary(bytes.clone())),
            ValueEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(|s| Block::Text(s.to_string()))
                .map_err(|e| self.error(e.to_string())),
            ValueEncoding::Json => serde_json::from_slice(bytes)
                .map(Block::Json)
                .map_err(|e| self.error(e.to_string())),
        }
    }

    fn json_bytes(&self, value: &serde_json::Value) -> Result<Bytes, ChainError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| self.error(e.to_string()))
    }

    fn error(&self, message: impl Into<String>) -> ChainError {
        ChainError::Encoding {
            encoding: *self,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValueEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueEncoding {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" => Ok(ValueEncoding::Binary),
            "utf-8" | "utf8" => Ok(ValueEncoding::Utf8),
            "json" => Ok(ValueEncoding::Json),
            other => Err(ChainError::Encoding {
                encoding: ValueEncoding::Binary,
                message: format!("unknown value encoding: {}", other),
            }),
        }
    }
}
