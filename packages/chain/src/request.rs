//! In-flight requests: the future side of a chain operation.
//!
//! A `Request<T>` is created together with a `Completer<T>` by [`pending`].
//! The operation is already running when the request is handed out; awaiting
//! only waits for its completion signal. Dropping a request does not stop the
//! operation.
//!
//! Requests for cancellable operations (`get`, `download`) carry the
//! `RequestHandle` the chain issued, so the request itself can be passed to
//! `cancel` / `undownload`.
//!
//! # Unobserved failures
//!
//! When a result arrives after its request was dropped, nobody will ever see
//! it. A failure delivered that way is reported through `tracing` at `warn`
//! unless the request was marked quiet, in which case it is discarded.
//!
//! # Callbacks
//!
//! [`Request::on_settle`] trades the future for a callback. The completer
//! then calls it inline, on whatever thread completes the operation, so
//! callbacks run in completion order and no executor is involved.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::{Callback, ChainError};

/// Opaque token naming a cancellable operation.
///
/// The default handle (id 0) names no operation; chains ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestHandle(u64);

impl RequestHandle {
    pub fn new(id: u64) -> Self {
        RequestHandle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Anything that can name an in-flight cancellable operation.
pub trait AsRequest {
    /// The handle to forward to the chain, if there is one.
    fn request_handle(&self) -> Option<RequestHandle>;
}

impl AsRequest for RequestHandle {
    fn request_handle(&self) -> Option<RequestHandle> {
        Some(*self)
    }
}

impl<T> AsRequest for Request<T> {
    fn request_handle(&self) -> Option<RequestHandle> {
        self.handle
    }
}

/// What happens to a failure nobody is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unobserved {
    /// Discard it.
    Silent,
    /// Log it at `warn`.
    Report,
}

/// Outcome of [`Completer::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The request was still alive and received the result.
    Delivered,
    /// The request was gone; the result (or a quiet failure) was dropped.
    Discarded,
    /// The request was gone and the failure was logged.
    Reported,
}

/// Callback parked by `Request::on_settle`, shared with the completer.
type Hook<T> = Arc<Mutex<Option<Callback<T>>>>;

/// Create a linked completer/request pair for `operation`.
pub fn pending<T>(operation: &'static str, unobserved: Unobserved) -> (Completer<T>, Request<T>) {
    let (tx, rx) = oneshot::channel();
    let hook: Hook<T> = Arc::new(Mutex::new(None));
    let quiet = Arc::new(AtomicBool::new(unobserved == Unobserved::Silent));
    let completer = Completer {
        tx: Some(tx),
        hook: Arc::clone(&hook),
        quiet: Arc::clone(&quiet),
        operation,
    };
    let request = Request {
        rx,
        hook,
        handle: None,
        quiet,
    };
    (completer, request)
}

/// The producing half of a request.
///
/// Dropping a completer without completing it settles the request with
/// `ChainError::Abandoned`.
pub struct Completer<T> {
    tx: Option<oneshot::Sender<Result<T, ChainError>>>,
    hook: Hook<T>,
    quiet: Arc<AtomicBool>,
    operation: &'static str,
}

impl<T> Completer<T> {
    /// Deliver the result to the request, or to its callback if one was
    /// attached with `on_settle`.
    pub fn complete(mut self, result: Result<T, ChainError>) -> Delivery {
        let Some(tx) = self.tx.take() else {
            return Delivery::Discarded;
        };
        // The hook lock orders this against `on_settle`.
        let mut hook = self.hook.lock();
        if let Some(cb) = hook.take() {
            drop(hook);
            cb(result);
            return Delivery::Delivered;
        }
        let sent = tx.send(result);
        drop(hook);

        match sent {
            Ok(()) => Delivery::Delivered,
            Err(Ok(_)) => Delivery::Discarded,
            Err(Err(error)) => {
                if self.quiet.load(Ordering::Acquire) {
                    tracing::trace!(operation = self.operation, %error, "discarding unobserved failure");
                    Delivery::Discarded
                } else {
                    tracing::warn!(operation = self.operation, %error, "unobserved chain failure");
                    Delivery::Reported
                }
            }
        }
    }

    /// Whether the request, or a callback attached to it, is still waiting
    /// for the result.
    pub fn is_observed(&self) -> bool {
        self.hook.lock().is_some() || self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        // Already completed.
        if self.tx.take().is_none() {
            return;
        }
        let cb = self.hook.lock().take();
        if let Some(cb) = cb {
            cb(Err(ChainError::Abandoned));
        }
    }
}

impl<T: Send + 'static> Completer<T> {
    /// Turn this completer into a completion callback for a callback chain.
    pub fn into_callback(self) -> Callback<T> {
        Box::new(move |result| {
            self.complete(result);
        })
    }
}

/// A pending chain operation.
///
/// Resolves to the operation's result. If the chain drops its completion
/// callback without calling it, resolves to `ChainError::Abandoned`.
#[must_use = "the operation runs regardless; dropping the request loses its result"]
pub struct Request<T> {
    rx: oneshot::Receiver<Result<T, ChainError>>,
    hook: Hook<T>,
    handle: Option<RequestHandle>,
    quiet: Arc<AtomicBool>,
}

impl<T> Request<T> {
    /// A request that is already settled.
    pub fn settled(operation: &'static str, result: Result<T, ChainError>) -> Self {
        let (completer, request) = pending(operation, Unobserved::Silent);
        completer.complete(result);
        request
    }

    /// Attach the chain's handle for this operation.
    pub fn with_handle(mut self, handle: RequestHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// The chain's handle for this operation, if it is cancellable.
    pub fn handle(&self) -> Option<RequestHandle> {
        self.handle
    }

    /// Discard the failure silently if this request is dropped unawaited.
    pub fn quiet(self) -> Self {
        self.quiet.store(true, Ordering::Release);
        self
    }

    /// Whether an unawaited failure would be discarded silently.
    pub fn is_quiet(&self) -> bool {
        self.quiet.load(Ordering::Acquire)
    }

    /// Hand the result to `cb` instead of awaiting it.
    ///
    /// If the operation has already settled, `cb` runs before this returns.
    /// Otherwise the completer runs it inline when the chain completes the
    /// operation.
    pub fn on_settle(mut self, cb: Callback<T>) {
        let mut hook = self.hook.lock();
        let result = match self.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Closed) => Err(ChainError::Abandoned),
            Err(TryRecvError::Empty) => {
                *hook = Some(cb);
                return;
            }
        };
        drop(hook);
        cb(result);
    }
}

impl<T> Future for Request<T> {
    type Output = Result<T, ChainError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ChainError::Abandoned)))
    }
}

impl<T> std::fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("handle", &self.handle)
            .field("quiet", &self.is_quiet())
            .finish()
    }
}
