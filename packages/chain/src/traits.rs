//! The chain traits: properties, callback convention, promise convention.

use std::fmt;
use std::sync::Arc;

use crate::{
    AsRequest, AuditReport, Batch, Block, ChainError, DownloadRange, Events, Extension,
    ExtensionHandlers, GetOptions, Key, Peer, ReadStream, ReadStreamOptions, ReplicateOptions,
    Replication, Request, RequestHandle, SeekOptions, SeekPosition, UpdateOptions, ValueEncoding,
    WriteStream, WriteStreamOptions,
};

/// Completion callback of a callback-convention operation.
///
/// Invoked exactly once with the operation's result.
pub type Callback<T> = Box<dyn FnOnce(Result<T, ChainError>) + Send + 'static>;

/// The calling convention a chain natively speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convention {
    /// Asynchronous operations take a completion callback.
    Callbacks,
    /// Asynchronous operations return a `Request`.
    Promises,
}

impl Convention {
    pub fn supports_promises(&self) -> bool {
        matches!(self, Convention::Promises)
    }
}

/// Descriptive properties of a chain.
///
/// Every accessor reads current state; nothing is cached.
pub trait ChainInfo {
    /// The identity key. `None` until the chain is ready.
    fn key(&self) -> Option<Key>;

    /// The discovery key derived from the identity key.
    fn discovery_key(&self) -> Option<Key>;

    /// Number of blocks.
    fn len(&self) -> u64;

    /// Total stored size of all blocks, in bytes.
    fn byte_length(&self) -> u64;

    fn writable(&self) -> bool;

    fn sparse(&self) -> bool;

    fn peers(&self) -> Vec<Peer>;

    fn value_encoding(&self) -> ValueEncoding;

    fn weak(&self) -> bool;

    fn lazy(&self) -> bool;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A chain whose asynchronous operations complete through callbacks.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn CallbackChain>`.
pub trait CallbackChain: ChainInfo + Events + fmt::Debug + Send + Sync {
    // Async operations

    fn ready(&self, cb: Callback<()>);

    fn close(&self, cb: Callback<()>);

    /// Read block `index`. The returned handle cancels the read.
    fn get(&self, index: u64, options: GetOptions, cb: Callback<Block>) -> RequestHandle;

    /// Append a batch. Completes with the sequence number of its first block.
    fn append(&self, batch: Batch, cb: Callback<u64>);

    fn update(&self, options: UpdateOptions, cb: Callback<()>);

    fn seek(&self, byte_offset: u64, options: SeekOptions, cb: Callback<SeekPosition>);

    /// Download a range. The returned handle undownloads it.
    fn download(&self, range: DownloadRange, cb: Callback<()>) -> RequestHandle;

    /// Check whether blocks `[start, end)` are stored locally.
    /// `end` of `None` checks the single block `start`.
    fn has(&self, start: u64, end: Option<u64>, cb: Callback<bool>);

    fn audit(&self, cb: Callback<AuditReport>);

    fn destroy_storage(&self, cb: Callback<()>);

    // Sync operations

    fn create_read_stream(&self, options: ReadStreamOptions) -> ReadStream;

    fn create_write_stream(&self, options: WriteStreamOptions) -> WriteStream;

    fn undownload(&self, handle: RequestHandle);

    fn cancel(&self, handle: RequestHandle);

    fn replicate(&self, is_initiator: bool, options: ReplicateOptions) -> Replication;

    fn register_extension(&self, name: &str, handlers: ExtensionHandlers) -> Extension;

    fn set_uploading(&self, uploading: bool);

    fn set_downloading(&self, downloading: bool);

    /// The chain this one adapts, if it is an adapter.
    fn wrapped(&self) -> Option<Unichain> {
        None
    }
}

/// A chain whose asynchronous operations return in-flight `Request`s.
///
/// Requests from `get` and `download` carry the handle that cancels them.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn PromiseChain>`.
pub trait PromiseChain: ChainInfo + Events + fmt::Debug + Send + Sync {
    // Async operations

    fn ready(&self) -> Request<()>;

    fn close(&self) -> Request<()>;

    fn get(&self, index: u64, options: GetOptions) -> Request<Block>;

    fn append(&self, batch: Batch) -> Request<u64>;

    fn update(&self, options: UpdateOptions) -> Request<()>;

    fn seek(&self, byte_offset: u64, options: SeekOptions) -> Request<SeekPosition>;

    fn download(&self, range: DownloadRange) -> Request<()>;

    fn has(&self, start: u64, end: Option<u64>) -> Request<bool>;

    fn audit(&self) -> Request<AuditReport>;

    fn destroy_storage(&self) -> Request<()>;

    // Sync operations

    fn create_read_stream(&self, options: ReadStreamOptions) -> ReadStream;

    fn create_write_stream(&self, options: WriteStreamOptions) -> WriteStream;

    /// Undownload the range named by a download request or its handle.
    fn undownload(&self, request: &dyn AsRequest);

    /// Cancel the operation named by a request or its handle.
    fn cancel(&self, request: &dyn AsRequest);

    fn replicate(&self, is_initiator: bool, options: ReplicateOptions) -> Replication;

    fn register_extension(&self, name: &str, handlers: ExtensionHandlers) -> Extension;

    fn set_uploading(&self, uploading: bool);

    fn set_downloading(&self, downloading: bool);

    /// The chain this one adapts, if it is an adapter.
    fn wrapped(&self) -> Option<Unichain> {
        None
    }
}

/// A shared chain in either convention.
///
/// The variant is the convention tag: it records whether the chain natively
/// returns requests or takes callbacks.
#[derive(Clone)]
pub enum Unichain {
    Callbacks(Arc<dyn CallbackChain>),
    Promises(Arc<dyn PromiseChain>),
}

impl Unichain {
    /// Wrap a concrete callback chain.
    pub fn from_callbacks<C: CallbackChain + 'static>(chain: Arc<C>) -> Self {
        Unichain::Callbacks(chain)
    }

    /// Wrap a concrete promise chain.
    pub fn from_promises<C: PromiseChain + 'static>(chain: Arc<C>) -> Self {
        Unichain::Promises(chain)
    }

    pub fn convention(&self) -> Convention {
        match self {
            Unichain::Callbacks(_) => Convention::Callbacks,
            Unichain::Promises(_) => Convention::Promises,
        }
    }

    pub fn supports_promises(&self) -> bool {
        self.convention().supports_promises()
    }

    /// The chain this one adapts, if it is an adapter.
    pub fn wrapped(&self) -> Option<Unichain> {
        match self {
            Unichain::Callbacks(c) => c.wrapped(),
            Unichain::Promises(p) => p.wrapped(),
        }
    }

    pub fn as_callbacks(&self) -> Option<&Arc<dyn CallbackChain>> {
        match self {
            Unichain::Callbacks(c) => Some(c),
            Unichain::Promises(_) => None,
        }
    }

    pub fn as_promises(&self) -> Option<&Arc<dyn PromiseChain>> {
        match self {
            Unichain::Promises(p) => Some(p),
            Unichain::Callbacks(_) => None,
        }
    }

    /// Check whether both handles refer to the same chain instance.
    pub fn ptr_eq(&self, other: &Unichain) -> bool {
        self.addr() == other.addr()
    }

    fn addr(&self) -> *const () {
        match self {
            Unichain::Callbacks(c) => Arc::as_ptr(c) as *const (),
            Unichain::Promises(p) => Arc::as_ptr(p) as *const (),
        }
    }
}

impl From<Arc<dyn CallbackChain>> for Unichain {
    fn from(chain: Arc<dyn CallbackChain>) -> Self {
        Unichain::Callbacks(chain)
    }
}

impl From<Arc<dyn PromiseChain>> for Unichain {
    fn from(chain: Arc<dyn PromiseChain>) -> Self {
        Unichain::Promises(chain)
    }
}

impl fmt::Debug for Unichain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unichain::Callbacks(c) => fmt::Debug::fmt(c, f),
            Unichain::Promises(p) => fmt::Debug::fmt(p, f),
        }
    }
}
