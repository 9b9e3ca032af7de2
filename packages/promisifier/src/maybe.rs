//! Caller's-choice completion.
//!
//! A promise-convention operation can be consumed two ways: await the
//! `Request`, or hand over a callback. `maybe` takes whichever the caller
//! picked. A request has a single consumer, so when a callback is supplied
//! it is attached to the request and no request is returned. The callback
//! runs inline when the operation settles, in the order the chain completes
//! its operations.

use unichain_chain::{Callback, Request};

/// Deliver `request` to `cb` if given, otherwise hand the request back.
pub fn maybe<T: Send + 'static>(cb: Option<Callback<T>>, request: Request<T>) -> Option<Request<T>> {
    match cb {
        Some(cb) => {
            request.on_settle(cb);
            None
        }
        None => Some(request),
    }
}

/// Like `maybe`, but a request handed back uncollected does not report a
/// failure when dropped.
///
/// Used for fire-and-continue operations, where the caller routinely ignores
/// the result.
pub fn maybe_quiet<T: Send + 'static>(
    cb: Option<Callback<T>>,
    request: Request<T>,
) -> Option<Request<T>> {
    maybe(cb, request.quiet())
}
