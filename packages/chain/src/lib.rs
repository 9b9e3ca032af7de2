//! Unichain: the chain contract
//!
//! This is the narrow waist between an append-only chain and everything that
//! talks to it. Nothing here stores data; it names what a chain looks like:
//! - `ChainInfo`: live descriptive properties (key, length, flags, peers)
//! - `Events`: subscribe/unsubscribe by event name
//! - `CallbackChain`: asynchronous operations completed through a callback
//! - `PromiseChain`: the same operations returning an in-flight `Request`
//! - `Unichain`: a handle over either convention, tagged by `Convention`
//!
//! # Example
//!
//! ```rust
//! use unichain_chain::{Block, ValueEncoding};
//!
//! let bytes = ValueEncoding::Utf8.encode(&Block::from("hello")).unwrap();
//! let block = ValueEncoding::Utf8.decode(&bytes).unwrap();
//! assert_eq!(block.as_text(), Some("hello"));
//! ```

pub use bytes::Bytes;

mod block;
mod error;
mod event;
mod options;
mod request;
mod stream;
mod traits;

pub use block::{Batch, Block, ValueEncoding};
pub use error::ChainError;
pub use event::{names, Event, EventEmitter, Events, Listener};
pub use options::{
    AuditReport, DownloadRange, GetOptions, Key, Peer, ReadStreamOptions, ReplicateOptions,
    SeekOptions, SeekPosition, UpdateOptions, WriteStreamOptions,
};
pub use request::{pending, AsRequest, Completer, Delivery, Request, RequestHandle, Unobserved};
pub use stream::{Extension, ExtensionHandlers, MessageHandler, ReadStream, Replication, WriteStream};
pub use traits::{Callback, CallbackChain, ChainInfo, Convention, PromiseChain, Unichain};
