//! Promise chain to callback chain adapter.
//!
//! The `CallbackChain` implementation always takes a callback. The `*_with`
//! methods leave the choice to the caller: given a callback they behave like
//! the trait methods, without one they hand back the wrapped chain's request.
//!
//! Callbacks run inline on whichever thread completes the wrapped request,
//! in the order the wrapped chain completes its operations.

use std::sync::Arc;

use tracing::{debug, trace};
use unichain_chain::{
    AuditReport, Batch, Block, Callback, CallbackChain, DownloadRange, Extension,
    ExtensionHandlers, GetOptions, PromiseChain, ReadStream, ReadStreamOptions, ReplicateOptions,
    Replication, Request, RequestHandle, SeekOptions, SeekPosition, Unichain, Unobserved,
    UpdateOptions, WriteStream, WriteStreamOptions,
};

use crate::maybe::{maybe, maybe_quiet};
use crate::operation::Operation;
use crate::wrapper::{delegate_base, ChainWrapper};

/// A callback-convention view of a promise chain.
pub struct PromiseToCallback {
    base: ChainWrapper<dyn PromiseChain>,
}

fn deliver<T: Send + 'static>(
    operation: Operation,
    cb: Option<Callback<T>>,
    request: Request<T>,
) -> Option<Request<T>> {
    match operation.unobserved() {
        Unobserved::Silent => maybe_quiet(cb, request),
        Unobserved::Report => maybe(cb, request),
    }
}

/// The handle a callback caller gets back for a promise request.
///
/// Chains that do not hand out handles get the default handle, which
/// cancels nothing.
fn handle_of<T>(operation: Operation, request: &Request<T>) -> RequestHandle {
    request.handle().unwrap_or_else(|| {
        trace!(operation = operation.name(), "request has no handle");
        RequestHandle::default()
    })
}

impl PromiseToCallback {
    pub fn new(chain: Arc<dyn PromiseChain>) -> Self {
        debug!(chain = ?chain, "exposing promise chain as callbacks");
        Self {
            base: ChainWrapper::new(chain),
        }
    }

    /// The wrapped promise chain.
    pub fn inner(&self) -> &Arc<dyn PromiseChain> {
        self.base.chain()
    }

    fn chain(&self) -> &dyn PromiseChain {
        self.base.chain().as_ref()
    }

    pub fn ready_with(&self, cb: Option<Callback<()>>) -> Option<Request<()>> {
        deliver(Operation::Ready, cb, self.chain().ready())
    }

    pub fn close_with(&self, cb: Option<Callback<()>>) -> Option<Request<()>> {
        deliver(Operation::Close, cb, self.chain().close())
    }

    pub fn get_with(
        &self,
        index: u64,
        options: GetOptions,
        cb: Option<Callback<Block>>,
    ) -> Option<Request<Block>> {
        deliver(Operation::Get, cb, self.chain().get(index, options))
    }

    pub fn append_with(&self, batch: Batch, cb: Option<Callback<u64>>) -> Option<Request<u64>> {
        deliver(Operation::Append, cb, self.chain().append(batch))
    }

    pub fn update_with(
        &self,
        options: UpdateOptions,
        cb: Option<Callback<()>>,
    ) -> Option<Request<()>> {
        deliver(Operation::Update, cb, self.chain().update(options))
    }

    pub fn seek_with(
        &self,
        byte_offset: u64,
        options: SeekOptions,
        cb: Option<Callback<SeekPosition>>,
    ) -> Option<Request<SeekPosition>> {
        deliver(Operation::Seek, cb, self.chain().seek(byte_offset, options))
    }

    pub fn download_with(
        &self,
        range: DownloadRange,
        cb: Option<Callback<()>>,
    ) -> Option<Request<()>> {
        deliver(Operation::Download, cb, self.chain().download(range))
    }

    pub fn has_with(
        &self,
        start: u64,
        end: Option<u64>,
        cb: Option<Callback<bool>>,
    ) -> Option<Request<bool>> {
        deliver(Operation::Has, cb, self.chain().has(start, end))
    }

    pub fn audit_with(&self, cb: Option<Callback<AuditReport>>) -> Option<Request<AuditReport>> {
        deliver(Operation::Audit, cb, self.chain().audit())
    }

    pub fn destroy_storage_with(&self, cb: Option<Callback<()>>) -> Option<Request<()>> {
        deliver(Operation::DestroyStorage, cb, self.chain().destroy_storage())
    }
}

delegate_base!(PromiseToCallback);

impl CallbackChain for PromiseToCallback {
    fn ready(&self, cb: Callback<()>) {
        let _ = self.ready_with(Some(cb));
    }

    fn close(&self, cb: Callback<()>) {
        let _ = self.close_with(Some(cb));
    }

    fn get(&self, index: u64, options: GetOptions, cb: Callback<Block>) -> RequestHandle {
        let request = self.chain().get(index, options);
        let handle = handle_of(Operation::Get, &request);
        let _ = deliver(Operation::Get, Some(cb), request);
        handle
    }

    fn append(&self, batch: Batch, cb: Callback<u64>) {
        let _ = self.append_with(batch, Some(cb));
    }

    fn update(&self, options: UpdateOptions, cb: Callback<()>) {
        let _ = self.update_with(options, Some(cb));
    }

    fn seek(&self, byte_offset: u64, options: SeekOptions, cb: Callback<SeekPosition>) {
        let _ = self.seek_with(byte_offset, options, Some(cb));
    }

    fn download(&self, range: DownloadRange, cb: Callback<()>) -> RequestHandle {
        let request = self.chain().download(range);
        let handle = handle_of(Operation::Download, &request);
        let _ = deliver(Operation::Download, Some(cb), request);
        handle
    }

    fn has(&self, start: u64, end: Option<u64>, cb: Callback<bool>) {
        let _ = self.has_with(start, end, Some(cb));
    }

    fn audit(&self, cb: Callback<AuditReport>) {
        let _ = self.audit_with(Some(cb));
    }

    fn destroy_storage(&self, cb: Callback<()>) {
        let _ = self.destroy_storage_with(Some(cb));
    }

    fn create_read_stream(&self, options: ReadStreamOptions) -> ReadStream {
        self.chain().create_read_stream(options)
    }

    fn create_write_stream(&self, options: WriteStreamOptions) -> WriteStream {
        self.chain().create_write_stream(options)
    }

    fn undownload(&self, handle: RequestHandle) {
        self.chain().undownload(&handle);
    }

    fn cancel(&self, handle: RequestHandle) {
        self.chain().cancel(&handle);
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
        Some(Unichain::Promises(Arc::clone(self.inner())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::sync::oneshot;
    use unichain_chain::{ChainError, ChainInfo, ValueEncoding};
    use unichain_memory::MemoryChain;

    use crate::testing::{capture_logs, lines_with};
    use crate::CallbackToPromise;

    type Received<T> = oneshot::Receiver<Result<T, ChainError>>;

    fn callback<T: Send + 'static>() -> (Callback<T>, Received<T>) {
        let (tx, rx) = oneshot::channel();
        let cb: Callback<T> = Box::new(move |result| {
            let _ = tx.send(result);
        });
        (cb, rx)
    }

    /// A memory chain seen through both adapters: promises first, then back
    /// to callbacks.
    fn round_trip() -> (Arc<MemoryChain>, PromiseToCallback) {
        let memory = Arc::new(MemoryChain::with_encoding(ValueEncoding::Utf8));
        let promises: Arc<dyn PromiseChain> = Arc::new(CallbackToPromise::new(memory.clone()));
        (memory, PromiseToCallback::new(promises))
    }

    #[tokio::test]
    async fn callbacks_receive_results() {
        let (_memory, callbacks) = round_trip();

        let (cb, rx) = callback();
        callbacks.append(Batch::new(vec!["x".into(), "yz".into()]), cb);
        assert_eq!(rx.await.unwrap(), Ok(0));

        let (cb, rx) = callback();
        callbacks.get(1, GetOptions::default(), cb);
        assert_eq!(rx.await.unwrap(), Ok(Block::Text("yz".into())));

        let (cb, rx) = callback();
        callbacks.has(0, Some(2), cb);
        assert_eq!(rx.await.unwrap(), Ok(true));

        let (cb, rx) = callback();
        callbacks.seek(1, SeekOptions::default(), cb);
        assert_eq!(
            rx.await.unwrap(),
            Ok(SeekPosition {
                index: 1,
                relative_offset: 0
            })
        );

        let (cb, rx) = callback();
        callbacks.audit(cb);
        assert_eq!(rx.await.unwrap().unwrap().valid, 2);
    }

    #[tokio::test]
    async fn callbacks_receive_errors() {
        let (_memory, callbacks) = round_trip();

        let (cb, rx) = callback();
        callbacks.get(3, GetOptions::no_wait(), cb);
        assert_eq!(
            rx.await.unwrap(),
            Err(ChainError::OutOfBounds {
                index: 3,
                length: 0
            })
        );

        let (cb, rx) = callback();
        callbacks.close(cb);
        assert_eq!(rx.await.unwrap(), Ok(()));

        let (cb, rx) = callback();
        callbacks.ready(cb);
        assert_eq!(rx.await.unwrap(), Err(ChainError::Closed));
    }

    #[test]
    fn parked_callbacks_fire_in_completion_order() {
        let (memory, callbacks) = round_trip();
        let order = Arc::new(Mutex::new(Vec::new()));
        for index in 0..16u64 {
            let order = Arc::clone(&order);
            callbacks.get(
                index,
                GetOptions::default(),
                Box::new(move |result: Result<Block, ChainError>| {
                    order.lock().push((index, result));
                }),
            );
        }
        assert_eq!(memory.pending_operations(), 16);

        let blocks = (0..16).map(|i| Block::Text(i.to_string())).collect();
        let (cb, mut rx) = callback();
        callbacks.append(Batch::new(blocks), cb);
        assert_eq!(rx.try_recv().unwrap(), Ok(0));

        let expected: Vec<_> = (0..16u64)
            .map(|i| (i, Ok(Block::Text(i.to_string()))))
            .collect();
        assert_eq!(*order.lock(), expected);
    }

    #[test]
    fn closed_chain_errors_reach_every_callback() {
        let (memory, callbacks) = round_trip();

        let (cb, mut rx) = callback();
        callbacks.append("a".into(), cb);
        assert_eq!(rx.try_recv().unwrap(), Ok(0));
        let (cb, mut rx) = callback();
        callbacks.seek(9, SeekOptions { wait: false }, cb);
        assert_eq!(
            rx.try_recv().unwrap(),
            Err(ChainError::ByteOffsetOutOfBounds {
                offset: 9,
                byte_length: 1
            })
        );

        let (cb, mut rx) = callback();
        callbacks.close(cb);
        assert_eq!(rx.try_recv().unwrap(), Ok(()));
        assert!(memory.is_closed());

        let (cb, mut rx) = callback();
        callbacks.update(UpdateOptions::default(), cb);
        assert_eq!(rx.try_recv().unwrap(), Err(ChainError::Closed));
        let (cb, mut rx) = callback();
        callbacks.seek(0, SeekOptions::default(), cb);
        assert_eq!(rx.try_recv().unwrap(), Err(ChainError::Closed));
        let (cb, mut rx) = callback();
        callbacks.download(DownloadRange::new(0, 1), cb);
        assert_eq!(rx.try_recv().unwrap(), Err(ChainError::Closed));
        let (cb, mut rx) = callback();
        callbacks.has(0, None, cb);
        assert_eq!(rx.try_recv().unwrap(), Err(ChainError::Closed));
        let (cb, mut rx) = callback();
        callbacks.audit(cb);
        assert_eq!(rx.try_recv().unwrap(), Err(ChainError::Closed));
        let (cb, mut rx) = callback();
        callbacks.destroy_storage(cb);
        assert_eq!(rx.try_recv().unwrap(), Err(ChainError::Closed));
    }

    #[test]
    fn storage_errors_reach_close_and_destroy_callbacks() {
        let (memory, callbacks) = round_trip();
        memory.fail_storage("disk gone");
        let broken = Err(ChainError::Storage("disk gone".to_string()));

        let (cb, mut rx) = callback();
        callbacks.destroy_storage(cb);
        assert_eq!(rx.try_recv().unwrap(), broken);
        let (cb, mut rx) = callback();
        callbacks.close(cb);
        assert_eq!(rx.try_recv().unwrap(), broken);
    }

    #[test]
    fn dropped_requests_follow_the_unobserved_policy() {
        let (memory, callbacks) = round_trip();

        let logs = capture_logs(|| {
            drop(callbacks.get_with(0, GetOptions::default(), None));
            drop(callbacks.download_with(DownloadRange::new(0, 2), None));
            memory.close(Box::new(|_| {}));
        });

        let reported = lines_with(&logs, "unobserved chain failure");
        assert_eq!(reported.len(), 1, "{logs:#?}");
        assert!(reported[0].contains("get"));
        let discarded = lines_with(&logs, "discarding unobserved failure");
        assert_eq!(discarded.len(), 1, "{logs:#?}");
        assert!(discarded[0].contains("download"));
    }

    #[tokio::test]
    async fn without_a_callback_the_request_is_returned() {
        let (memory, callbacks) = round_trip();

        let request = callbacks.append_with("hello".into(), None).unwrap();
        assert!(request.is_quiet());
        assert_eq!(request.await, Ok(0));

        let request = callbacks.get_with(0, GetOptions::default(), None).unwrap();
        assert!(!request.is_quiet());
        assert_eq!(request.await, Ok(Block::Text("hello".into())));

        assert!(callbacks.has_with(0, None, None).unwrap().await.unwrap());
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn with_a_callback_nothing_is_returned() {
        let (_memory, callbacks) = round_trip();
        let (cb, rx) = callback();
        assert!(callbacks.ready_with(Some(cb)).is_none());
        assert_eq!(rx.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn get_returns_a_handle_that_cancels() {
        let (memory, callbacks) = round_trip();

        let (cb, rx) = callback();
        let handle = callbacks.get(5, GetOptions::default(), cb);
        assert_ne!(handle, RequestHandle::default());

        callbacks.cancel(handle);
        assert_eq!(memory.cancellations(), vec![handle]);
        assert_eq!(rx.await.unwrap(), Err(ChainError::Cancelled));
    }

    #[tokio::test]
    async fn download_handle_undownloads() {
        let (memory, callbacks) = round_trip();

        let (cb, rx) = callback();
        let handle = callbacks.download(DownloadRange::new(0, 3), cb);
        callbacks.undownload(handle);

        assert_eq!(memory.cancellations(), vec![handle]);
        assert_eq!(rx.await.unwrap(), Err(ChainError::Cancelled));
    }

    #[tokio::test]
    async fn request_without_handle_maps_to_default() {
        let (_memory, callbacks) = round_trip();
        let request = callbacks.audit_with(None).unwrap();
        assert_eq!(handle_of(Operation::Audit, &request), RequestHandle::default());
        assert!(request.await.is_ok());
    }

    #[test]
    fn wrapped_is_the_promise_chain() {
        let (_memory, callbacks) = round_trip();
        let inner = Unichain::Promises(Arc::clone(callbacks.inner()));
        assert!(callbacks.wrapped().unwrap().ptr_eq(&inner));
        assert_eq!(callbacks.value_encoding(), ValueEncoding::Utf8);
    }
}
