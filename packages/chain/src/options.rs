//! Option structs and small value types shared by every chain operation.
//!
//! Every options struct derives `Deserialize` with `#[serde(default)]`, so a
//! partial JSON object is enough to configure a call.

use serde::{Deserialize, Serialize};

use crate::ValueEncoding;

/// A 32-byte chain identity key.
pub type Key = [u8; 32];

/// Options for reading a single block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetOptions {
    /// Wait for the block to become available instead of failing.
    pub wait: bool,
    /// Decode with this encoding instead of the chain's own.
    pub value_encoding: Option<ValueEncoding>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            wait: true,
            value_encoding: None,
        }
    }
}

impl GetOptions {
    /// Options that fail immediately for blocks the chain does not have.
    pub fn no_wait() -> Self {
        Self {
            wait: false,
            ..Self::default()
        }
    }
}

/// Options for waiting on a longer chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    /// Resolve right away with whatever is currently available.
    pub if_available: bool,
    /// Resolve once the chain has at least this many blocks.
    ///
    /// `None` means one more block than the chain has now.
    pub min_length: Option<u64>,
}

/// Options for seeking to a byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekOptions {
    /// Wait for the offset to become available instead of failing.
    pub wait: bool,
}

impl Default for SeekOptions {
    fn default() -> Self {
        Self { wait: true }
    }
}

/// The block containing a byte offset and the offset within that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekPosition {
    pub index: u64,
    pub relative_offset: u64,
}

/// A range of blocks to download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadRange {
    pub start: u64,
    /// Exclusive end. `None` downloads everything from `start` onward.
    pub end: Option<u64>,
    /// Download in order rather than in whatever order peers answer.
    pub linear: bool,
}

impl DownloadRange {
    /// A bounded range `[start, end)`.
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
            linear: false,
        }
    }

    /// Everything from `start` onward.
    pub fn starting_at(start: u64) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }
}

/// Options for a read stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadStreamOptions {
    pub start: u64,
    /// Exclusive end. `None` reads to the current length.
    pub end: Option<u64>,
    /// Decode with this encoding instead of the chain's own.
    pub value_encoding: Option<ValueEncoding>,
}

/// Options for a write stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteStreamOptions {
    /// Reject encoded blocks larger than this many bytes.
    pub max_block_size: Option<usize>,
}

/// Options for a replication session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateOptions {
    /// Keep the session open after the initial sync.
    pub live: bool,
    pub upload: bool,
    pub download: bool,
}

impl Default for ReplicateOptions {
    fn default() -> Self {
        Self {
            live: false,
            upload: true,
            download: true,
        }
    }
}

/// Result of an integrity audit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub valid: u64,
    pub invalid: u64,
}

/// A connected replication peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: u64,
    /// Whether this side initiated the session.
    pub initiator: bool,
    pub remote_address: Option<String>,
}
