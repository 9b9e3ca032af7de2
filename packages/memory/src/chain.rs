//! The memory chain itself.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use uuid::Uuid;

use unichain_chain::{
    AuditReport, Batch, Block, Callback, CallbackChain, ChainError, ChainInfo, DownloadRange,
    Event, EventEmitter, Events, Extension, ExtensionHandlers, GetOptions, Key, Listener, Peer,
    ReadStream, ReadStreamOptions, ReplicateOptions, Replication, RequestHandle, SeekOptions,
    SeekPosition, UpdateOptions, ValueEncoding, WriteStream, WriteStreamOptions,
};

use crate::waiter::{settle, Settle, Waiter};
use crate::ChainOptions;

/// An append-only chain held entirely in memory.
///
/// Cloning yields another handle to the same chain.
///
/// Operations that cannot complete yet (a `get` past the end with `wait`, a
/// `download` of blocks not yet appended, an `update`, a `seek` past the end)
/// are parked and completed by later appends. Parked `get` and `download`
/// operations can be cancelled through their `RequestHandle`; closing the
/// chain fails everything still parked with `ChainError::Closed`.
///
/// [`MemoryChain::fail_storage`] simulates a broken backing store: from then
/// on every asynchronous operation fails with `ChainError::Storage`.
#[derive(Clone)]
pub struct MemoryChain {
    shared: Arc<Shared>,
}

struct Shared {
    options: ChainOptions,
    events: EventEmitter,
    state: Mutex<State>,
    next_handle: AtomicU64,
}

struct State {
    opened: bool,
    closed: bool,
    storage_failure: Option<String>,
    key: Option<Key>,
    discovery_key: Option<Key>,
    blocks: Vec<Bytes>,
    byte_length: u64,
    peers: Vec<Peer>,
    next_peer: u64,
    uploading: bool,
    downloading: bool,
    waiters: Vec<Waiter>,
    extensions: Vec<(String, ExtensionHandlers)>,
    cancellations: Vec<RequestHandle>,
}

impl MemoryChain {
    pub fn new(options: ChainOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                options,
                events: EventEmitter::new(),
                state: Mutex::new(State {
                    opened: false,
                    closed: false,
                    storage_failure: None,
                    key: None,
                    discovery_key: None,
                    blocks: Vec::new(),
                    byte_length: 0,
                    peers: Vec::new(),
                    next_peer: 1,
                    uploading: true,
                    downloading: true,
                    waiters: Vec::new(),
                    extensions: Vec::new(),
                    cancellations: Vec::new(),
                }),
                next_handle: AtomicU64::new(1),
            }),
        }
    }

    /// A writable chain with the given value encoding.
    pub fn with_encoding(encoding: ValueEncoding) -> Self {
        Self::new(ChainOptions::default().value_encoding(encoding))
    }

    /// Emit an event to this chain's listeners. Returns whether any listener ran.
    pub fn emit(&self, event: &Event) -> bool {
        self.shared.events.emit(event)
    }

    /// Every handle passed to `cancel` or `undownload`, in call order.
    pub fn cancellations(&self) -> Vec<RequestHandle> {
        self.shared.state.lock().cancellations.clone()
    }

    /// Number of operations parked waiting for more data.
    pub fn pending_operations(&self) -> usize {
        self.shared.state.lock().waiters.len()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.state.lock().opened
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    pub fn is_uploading(&self) -> bool {
        self.shared.state.lock().uploading
    }

    pub fn is_downloading(&self) -> bool {
        self.shared.state.lock().downloading
    }

    /// Make the backing store fail. Every later asynchronous operation,
    /// `close` and `destroy_storage` included, completes with
    /// `ChainError::Storage(message)`.
    pub fn fail_storage(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "memory chain storage failing");
        self.shared.state.lock().storage_failure = Some(message);
    }

    /// Drop a replication peer. Returns whether it was connected.
    pub fn disconnect(&self, peer_id: u64) -> bool {
        let removed = {
            let mut state = self.shared.state.lock();
            state
                .peers
                .iter()
                .position(|p| p.id == peer_id)
                .map(|pos| state.peers.remove(pos))
        };
        match removed {
            Some(peer) => {
                self.shared.events.emit(&Event::PeerRemove(peer));
                true
            }
            None => false,
        }
    }

    /// Hand an incoming extension message to the registered handler.
    /// Returns whether a handler received it.
    pub fn receive_extension_message(&self, name: &str, message: Bytes, peer: &Peer) -> bool {
        let handler = {
            let state = self.shared.state.lock();
            state
                .extensions
                .iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, handlers)| handlers.on_message.clone())
        };
        match handler {
            Some(on_message) => {
                on_message(&message, peer);
                true
            }
            None => false,
        }
    }

    fn next_handle(&self) -> RequestHandle {
        RequestHandle::new(self.shared.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    /// Settle `cb` right away if the chain is closed or its storage is
    /// failing, otherwise hand it to `op` under the state lock. `op` returns the settlement, or `None` once it has
    /// parked the callback.
    fn run<T: Send + 'static>(
        &self,
        cb: Callback<T>,
        op: impl FnOnce(&mut State, Callback<T>) -> Option<Settle>,
    ) {
        self.shared.open();
        let settled = {
            let mut state = self.shared.state.lock();
            match state.failure() {
                Some(error) => Some(settle(cb, Err(error))),
                None => op(&mut *state, cb),
            }
        };
        if let Some(settled) = settled {
            settled();
        }
    }

    fn abort(&self, handle: RequestHandle) {
        let settled = {
            let mut state = self.shared.state.lock();
            state.cancellations.push(handle);
            state
                .waiters
                .iter()
                .position(|w| w.handle() == Some(handle))
                .map(|pos| state.waiters.remove(pos).fail(ChainError::Cancelled))
        };
        tracing::debug!(handle = handle.id(), found = settled.is_some(), "cancelling request");
        if let Some(settled) = settled {
            settled();
        }
    }
}

impl Shared {
    /// Open the chain on first use. Emits `ready` exactly once.
    fn open(&self) {
        let opened = {
            let mut state = self.state.lock();
            if state.opened || state.closed {
                false
            } else {
                let key = self.options.key.unwrap_or_else(generate_key);
                state.key = Some(key);
                state.discovery_key = Some(discovery_key(&key));
                state.opened = true;
                true
            }
        };
        if opened {
            tracing::debug!(encoding = %self.options.value_encoding, "memory chain ready");
            self.events.emit(&Event::Ready);
        }
    }

    fn append_batch(&self, batch: Batch) -> Result<u64, ChainError> {
        let (seq, woken) = {
            let mut state = self.state.lock();
            if let Some(error) = state.failure() {
                return Err(error);
            }
            if !self.options.writable {
                return Err(ChainError::NotWritable);
            }
            let encoded = batch
                .iter()
                .map(|block| self.options.value_encoding.encode(block))
                .collect::<Result<Vec<_>, _>>()?;
            let seq = state.len();
            for bytes in encoded {
                state.byte_length += bytes.len() as u64;
                state.blocks.push(bytes);
            }
            (seq, state.wake())
        };
        if !batch.is_empty() {
            tracing::trace!(seq, blocks = batch.len(), "appended");
            self.events.emit(&Event::Append);
        }
        for settled in woken {
            settled();
        }
        Ok(seq)
    }
}

impl State {
    fn len(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Why an operation cannot run right now.
    fn failure(&self) -> Option<ChainError> {
        if self.closed {
            return Some(ChainError::Closed);
        }
        self.storage_failure.clone().map(ChainError::Storage)
    }

    fn read(&self, index: u64, encoding: ValueEncoding) -> Option<Result<Block, ChainError>> {
        self.blocks
            .get(index as usize)
            .map(|bytes| encoding.decode(bytes))
    }

    fn locate(&self, offset: u64) -> Result<SeekPosition, ChainError> {
        let mut start = 0u64;
        for (index, block) in self.blocks.iter().enumerate() {
            let end = start + block.len() as u64;
            if offset < end {
                return Ok(SeekPosition {
                    index: index as u64,
                    relative_offset: offset - start,
                });
            }
            start = end;
        }
        Err(ChainError::ByteOffsetOutOfBounds {
            offset,
            byte_length: self.byte_length,
        })
    }

    /// Complete every parked operation the current length satisfies.
    fn wake(&mut self) -> Vec<Settle> {
        let mut settled = Vec::new();
        for waiter in std::mem::take(&mut self.waiters) {
            match self.try_settle(waiter) {
                Ok(s) => settled.push(s),
                Err(waiter) => self.waiters.push(waiter),
            }
        }
        settled
    }

    fn try_settle(&self, waiter: Waiter) -> Result<Settle, Waiter> {
        let len = self.len();
        match waiter {
            Waiter::Get {
                index,
                encoding,
                cb,
                ..
            } if index < len => {
                let result = self
                    .read(index, encoding)
                    .unwrap_or(Err(ChainError::OutOfBounds { index, length: len }));
                Ok(settle(cb, result))
            }
            Waiter::Download { end, cb, .. } if end <= len => Ok(settle(cb, Ok(()))),
            Waiter::Update { min_length, cb } if min_length <= len => Ok(settle(cb, Ok(()))),
            Waiter::Seek { byte_offset, cb } if byte_offset < self.byte_length => {
                Ok(settle(cb, self.locate(byte_offset)))
            }
            waiter => Err(waiter),
        }
    }
}

impl ChainInfo for MemoryChain {
    fn key(&self) -> Option<Key> {
        self.shared.state.lock().key
    }

    fn discovery_key(&self) -> Option<Key> {
        self.shared.state.lock().discovery_key
    }

    fn len(&self) -> u64 {
        self.shared.state.lock().len()
    }

    fn byte_length(&self) -> u64 {
        self.shared.state.lock().byte_length
    }

    fn writable(&self) -> bool {
        self.shared.options.writable
    }

    fn sparse(&self) -> bool {
        self.shared.options.sparse
    }

    fn peers(&self) -> Vec<Peer> {
        self.shared.state.lock().peers.clone()
    }

    fn value_encoding(&self) -> ValueEncoding {
        self.shared.options.value_encoding
    }

    fn weak(&self) -> bool {
        self.shared.options.weak
    }

    fn lazy(&self) -> bool {
        self.shared.options.lazy
    }
}

impl Events for MemoryChain {
    fn on(&self, event: &str, listener: Listener) {
        self.shared.events.on(event, listener);
    }

    fn remove_listener(&self, event: &str, listener: &Listener) {
        self.shared.events.remove_listener(event, listener);
    }

    fn listener_count(&self, event: &str) -> usize {
        self.shared.events.listener_count(event)
    }
}

impl CallbackChain for MemoryChain {
    fn ready(&self, cb: Callback<()>) {
        self.run(cb, |_, cb| Some(settle(cb, Ok(()))));
    }

    fn close(&self, cb: Callback<()>) {
        let failed = {
            let mut state = self.shared.state.lock();
            if let Some(message) = state.storage_failure.clone() {
                drop(state);
                return cb(Err(ChainError::Storage(message)));
            }
            if state.closed {
                None
            } else {
                state.closed = true;
                Some(
                    std::mem::take(&mut state.waiters)
                        .into_iter()
                        .map(|w| w.fail(ChainError::Closed))
                        .collect::<Vec<_>>(),
                )
            }
        };
        if let Some(failed) = failed {
            tracing::debug!(parked = failed.len(), "memory chain closed");
            self.shared.events.emit(&Event::Close);
            for settled in failed {
                settled();
            }
        }
        cb(Ok(()));
    }

    fn get(&self, index: u64, options: GetOptions, cb: Callback<Block>) -> RequestHandle {
        let handle = self.next_handle();
        let encoding = options
            .value_encoding
            .unwrap_or(self.shared.options.value_encoding);
        self.run(cb, |state, cb| match state.read(index, encoding) {
            Some(result) => Some(settle(cb, result)),
            None if !options.wait => {
                let length = state.len();
                Some(settle(cb, Err(ChainError::OutOfBounds { index, length })))
            }
            None => {
                state.waiters.push(Waiter::Get {
                    handle,
                    index,
                    encoding,
                    cb,
                });
                None
            }
        });
        handle
    }

    fn append(&self, batch: Batch, cb: Callback<u64>) {
        self.shared.open();
        cb(self.shared.append_batch(batch));
    }

    fn update(&self, options: UpdateOptions, cb: Callback<()>) {
        self.run(cb, |state, cb| {
            let len = state.len();
            let min_length = options.min_length.unwrap_or(len + 1);
            if options.if_available || min_length <= len {
                return Some(settle(cb, Ok(())));
            }
            state.waiters.push(Waiter::Update { min_length, cb });
            None
        });
    }

    fn seek(&self, byte_offset: u64, options: SeekOptions, cb: Callback<SeekPosition>) {
        self.run(cb, |state, cb| {
            if byte_offset < state.byte_length || !options.wait {
                return Some(settle(cb, state.locate(byte_offset)));
            }
            state.waiters.push(Waiter::Seek { byte_offset, cb });
            None
        });
    }

    fn download(&self, range: DownloadRange, cb: Callback<()>) -> RequestHandle {
        let handle = self.next_handle();
        tracing::trace!(start = range.start, end = ?range.end, handle = handle.id(), "download");
        self.run(cb, |state, cb| {
            let end = range.end.unwrap_or_else(|| state.len());
            if end <= state.len() {
                return Some(settle(cb, Ok(())));
            }
            state.waiters.push(Waiter::Download { handle, end, cb });
            None
        });
        handle
    }

    fn has(&self, start: u64, end: Option<u64>, cb: Callback<bool>) {
        self.run(cb, |state, cb| {
            let end = end.unwrap_or(start.saturating_add(1));
            Some(settle(cb, Ok(start <= end && end <= state.len())))
        });
    }

    fn audit(&self, cb: Callback<AuditReport>) {
        let encoding = self.shared.options.value_encoding;
        self.run(cb, |state, cb| {
            let valid = state
                .blocks
                .iter()
                .filter(|bytes| encoding.decode(bytes).is_ok())
                .count() as u64;
            let report = AuditReport {
                valid,
                invalid: state.len() - valid,
            };
            Some(settle(cb, Ok(report)))
        });
    }

    fn destroy_storage(&self, cb: Callback<()>) {
        let failure = {
            let mut state = self.shared.state.lock();
            let failure = state.failure();
            if failure.is_none() {
                state.blocks.clear();
                state.byte_length = 0;
            }
            failure
        };
        match failure {
            Some(error) => cb(Err(error)),
            None => {
                tracing::debug!("memory chain storage destroyed");
                cb(Ok(()));
            }
        }
    }

    fn create_read_stream(&self, options: ReadStreamOptions) -> ReadStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let encoding = options
            .value_encoding
            .unwrap_or(self.shared.options.value_encoding);
        let state = self.shared.state.lock();
        if state.closed {
            let _ = tx.send(Err(ChainError::Closed));
        } else {
            let end = options.end.unwrap_or(state.len()).min(state.len());
            for index in options.start..end {
                if let Some(block) = state.read(index, encoding) {
                    let _ = tx.send(block);
                }
            }
        }
        ReadStream::new(rx)
    }

    fn create_write_stream(&self, options: WriteStreamOptions) -> WriteStream {
        let shared = Arc::clone(&self.shared);
        WriteStream::new(move |block| {
            if let Some(max) = options.max_block_size {
                let size = shared.options.value_encoding.encode(&block)?.len();
                if size > max {
                    return Err(ChainError::BlockTooLarge { size, max });
                }
            }
            shared.open();
            shared.append_batch(Batch::from(block))
        })
    }

    fn undownload(&self, handle: RequestHandle) {
        self.abort(handle);
    }

    fn cancel(&self, handle: RequestHandle) {
        self.abort(handle);
    }

    fn replicate(&self, is_initiator: bool, options: ReplicateOptions) -> Replication {
        let peer = {
            let mut state = self.shared.state.lock();
            let peer = Peer {
                id: state.next_peer,
                initiator: is_initiator,
                remote_address: None,
            };
            state.next_peer += 1;
            state.peers.push(peer.clone());
            peer
        };
        tracing::debug!(peer = peer.id, initiator = is_initiator, "replication session opened");
        self.shared.events.emit(&Event::PeerAdd(peer.clone()));
        Replication::new(peer, options)
    }

    fn register_extension(&self, name: &str, handlers: ExtensionHandlers) -> Extension {
        let mut state = self.shared.state.lock();
        let id = match state.extensions.iter().position(|(n, _)| n == name) {
            Some(pos) => {
                state.extensions[pos].1 = handlers;
                pos
            }
            None => {
                state.extensions.push((name.to_string(), handlers));
                state.extensions.len() - 1
            }
        };
        Extension::new(id as u32, name)
    }

    fn set_uploading(&self, uploading: bool) {
        self.shared.state.lock().uploading = uploading;
    }

    fn set_downloading(&self, downloading: bool) {
        self.shared.state.lock().downloading = downloading;
    }
}

impl fmt::Debug for MemoryChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("MemoryChain")
            .field("key", &state.key.map(hex::encode))
            .field("length", &state.len())
            .field("byte_length", &state.byte_length)
            .field("value_encoding", &self.shared.options.value_encoding)
            .field("writable", &self.shared.options.writable)
            .field("peers", &state.peers.len())
            .field("closed", &state.closed)
            .finish()
    }
}

fn generate_key() -> Key {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    key[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    key
}

fn discovery_key(key: &Key) -> Key {
    let mut hasher = Sha256::new();
    hasher.update(b"unichain");
    hasher.update(key);
    hasher.finalize().into()
}
