//! Callback chain to promise chain adapter.
//!
//! Every asynchronous operation creates a linked completer/request pair, hands
//! the completer to the wrapped chain as its callback, and returns the
//! request. `get` and `download` also attach the chain's request handle, so
//! the returned request can later be passed to `cancel` or `undownload`.
//!
//! Requests for fire-and-continue operations (`ready`, `close`, `append`,
//! `update`, `download`, `destroy_storage`) are quiet: if the caller drops
//! one, a failure is discarded. Reads and queries report theirs.

use std::sync::Arc;

use tracing::{debug, trace};
use unichain_chain::{
    AsRequest, AuditReport, Batch, Block, Callback, CallbackChain, DownloadRange, Extension,
    ExtensionHandlers, GetOptions, PromiseChain, ReadStream, ReadStreamOptions, ReplicateOptions,
    Replication, Request, RequestHandle, SeekOptions, SeekPosition, Unichain, UpdateOptions,
    WriteStream, WriteStreamOptions,
};

use crate::operation::Operation;
use crate::wrapper::{delegate_base, ChainWrapper};

/// A promise-convention view of a callback chain.
pub struct CallbackToPromise {
    base: ChainWrapper<dyn CallbackChain>,
}

impl CallbackToPromise {
    pub fn new(chain: Arc<dyn CallbackChain>) -> Self {
        debug!(chain = ?chain, "exposing callback chain as promises");
        Self {
            base: ChainWrapper::new(chain),
        }
    }

    /// The wrapped callback chain.
    pub fn inner(&self) -> &Arc<dyn CallbackChain> {
        self.base.chain()
    }

    fn chain(&self) -> &dyn CallbackChain {
        self.base.chain().as_ref()
    }

    fn call<T: Send + 'static>(
        &self,
        operation: Operation,
        f: impl FnOnce(&dyn CallbackChain, Callback<T>),
    ) -> Request<T> {
        let (completer, request) = operation.pending();
        f(self.chain(), completer.into_callback());
        request
    }

    fn resolve(&self, request: &dyn AsRequest, operation: &str) -> Option<RequestHandle> {
        let handle = request.request_handle();
        match handle {
            Some(handle) => trace!(operation, handle = handle.id(), "forwarding request handle"),
            None => debug!(operation, "request carries no handle, nothing to forward"),
        }
        handle
    }
}

delegate_base!(CallbackToPromise);

impl PromiseChain for CallbackToPromise {
    fn ready(&self) -> Request<()> {
        self.call(Operation::Ready, |chain, cb| chain.ready(cb))
    }

    fn close(&self) -> Request<()> {
        self.call(Operation::Close, |chain, cb| chain.close(cb))
    }

    fn get(&self, index: u64, options: GetOptions) -> Request<Block> {
        let (completer, request) = Operation::Get.pending();
        let handle = self.chain().get(index, options, completer.into_callback());
        request.with_handle(handle)
    }

    fn append(&self, batch: Batch) -> Request<u64> {
        self.call(Operation::Append, |chain, cb| chain.append(batch, cb))
    }

    fn update(&self, options: UpdateOptions) -> Request<()> {
        self.call(Operation::Update, |chain, cb| chain.update(options, cb))
    }

    fn seek(&self, byte_offset: u64, options: SeekOptions) -> Request<SeekPosition> {
        self.call(Operation::Seek, |chain, cb| chain.seek(byte_offset, options, cb))
    }

    fn download(&self, range: DownloadRange) -> Request<()> {
        let (completer, request) = Operation::Download.pending();
        let handle = self.chain().download(range, completer.into_callback());
        request.with_handle(handle)
    }

    fn has(&self, start: u64, end: Option<u64>) -> Request<bool> {
        self.call(Operation::Has, |chain, cb| chain.has(start, end, cb))
    }

    fn audit(&self) -> Request<AuditReport> {
        self.call(Operation::Audit, |chain, cb| chain.audit(cb))
    }

    fn destroy_storage(&self) -> Request<()> {
        self.call(Operation::DestroyStorage, |chain, cb| chain.destroy_storage(cb))
    }

    fn create_read_stream(&self, options: ReadStreamOptions) -> ReadStream {
        self.chain().create_read_stream(options)
    }

    fn create_write_stream(&self, options: WriteStreamOptions) -> WriteStream {
        self.chain().create_write_stream(options)
    }

    fn undownload(&self, request: &dyn AsRequest) {
        if let Some(handle) = self.resolve(request, "undownload") {
            self.chain().undownload(handle);
        }
    }

    fn cancel(&self, request: &dyn AsRequest) {
        if let Some(handle) = self.resolve(request, "cancel") {
            self.chain().cancel(handle);
        }
    }

    fn replicate(&self, is_initiator: bool, options: ReplicateOptions) -> Replication {
        self.chain().replicate(is_initiator, options)
    }

    fn register_extension(&self, name: &str, handlers: ExtensionHandlers) -> Extension {
        self.chain().register_extension(name, handlers)
    }

    fn set_uploading(&self, uploading: bool) {
        self.chain().set_uploading(uploading);
    }

    fn set_downloading(&self, downloading: bool) {
        self.chain().set_downloading(downloading);
    }

    fn wrapped(&self) -> Option<Unichain> {
        Some(Unichain::Callbacks(Arc::clone(self.inner())))
    }
}
