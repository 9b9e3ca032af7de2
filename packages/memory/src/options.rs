//! Configuration for a memory chain.

use serde::{Deserialize, Serialize};
use unichain_chain::{Key, ValueEncoding};

/// Options for creating a `MemoryChain`.
///
/// Deserializes from a partial object; missing fields take their defaults.
///
/// ```rust
/// use unichain_memory::ChainOptions;
/// use unichain_chain::ValueEncoding;
///
/// let opts = ChainOptions::default().value_encoding(ValueEncoding::Utf8);
/// assert!(opts.writable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainOptions {
    pub value_encoding: ValueEncoding,
    pub writable: bool,
    pub sparse: bool,
    pub weak: bool,
    pub lazy: bool,
    /// A fixed identity key. Generated when the chain opens if absent.
    pub key: Option<Key>,
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self {
            value_encoding: ValueEncoding::Binary,
            writable: true,
            sparse: false,
            weak: false,
            lazy: false,
            key: None,
        }
    }
}

impl ChainOptions {
    pub fn value_encoding(mut self, encoding: ValueEncoding) -> Self {
        self.value_encoding = encoding;
        self
    }

    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    pub fn sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    pub fn key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }
}
