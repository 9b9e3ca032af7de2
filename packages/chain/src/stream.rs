//! Values returned by a chain's synchronous operations.
//!
//! Adapters pass these through untouched; only chains construct them.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{Block, ChainError, Peer, ReplicateOptions, ValueEncoding};

/// A stream of blocks read from a chain.
pub struct ReadStream {
    rx: mpsc::UnboundedReceiver<Result<Block, ChainError>>,
}

impl ReadStream {
    /// Create a stream fed by `rx`. The stream ends when every sender is dropped.
    pub fn new(rx: mpsc::UnboundedReceiver<Result<Block, ChainError>>) -> Self {
        Self { rx }
    }

    /// Receive the next block, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Result<Block, ChainError>> {
        self.rx.recv().await
    }

    /// Receive the next block if one is already buffered.
    pub fn try_next(&mut self) -> Option<Result<Block, ChainError>> {
        self.rx.try_recv().ok()
    }

    /// Drain every buffered block.
    pub async fn collect(mut self) -> Result<Vec<Block>, ChainError> {
        let mut blocks = Vec::new();
        while let Some(block) = self.next().await {
            blocks.push(block?);
        }
        Ok(blocks)
    }
}

impl fmt::Debug for ReadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadStream").finish_non_exhaustive()
    }
}

type Sink = Box<dyn FnMut(Block) -> Result<u64, ChainError> + Send>;

/// A sink that appends each written block to a chain.
pub struct WriteStream {
    sink: Sink,
    written: u64,
}

impl WriteStream {
    /// Create a stream that hands every block to `sink`, which returns the
    /// sequence number the block was stored at.
    pub fn new(sink: impl FnMut(Block) -> Result<u64, ChainError> + Send + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            written: 0,
        }
    }

    /// Append one block, returning its sequence number.
    pub fn write(&mut self, block: impl Into<Block>) -> Result<u64, ChainError> {
        let seq = (self.sink)(block.into())?;
        self.written += 1;
        Ok(seq)
    }

    /// Number of blocks written through this stream.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl fmt::Debug for WriteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteStream")
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

/// A replication session with one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replication {
    peer: Peer,
    options: ReplicateOptions,
}

impl Replication {
    pub fn new(peer: Peer, options: ReplicateOptions) -> Self {
        Self { peer, options }
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    pub fn is_initiator(&self) -> bool {
        self.peer.initiator
    }

    pub fn options(&self) -> &ReplicateOptions {
        &self.options
    }
}

/// Callback for messages arriving on an extension.
pub type MessageHandler = Arc<dyn Fn(&Bytes, &Peer) + Send + Sync>;

/// Handlers supplied when registering an extension.
#[derive(Clone, Default)]
pub struct ExtensionHandlers {
    /// Encoding of extension messages.
    pub encoding: ValueEncoding,
    pub on_message: Option<MessageHandler>,
}

impl fmt::Debug for ExtensionHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionHandlers")
            .field("encoding", &self.encoding)
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}

/// A registered replication extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    id: u32,
    name: String,
}

impl Extension {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
