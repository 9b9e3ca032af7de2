//! Operations parked until the chain grows.

use unichain_chain::{Block, Callback, ChainError, RequestHandle, SeekPosition, ValueEncoding};

/// A deferred callback invocation, run after the state lock is released.
pub(crate) type Settle = Box<dyn FnOnce() + Send>;

pub(crate) fn settle<T: Send + 'static>(cb: Callback<T>, result: Result<T, ChainError>) -> Settle {
    Box::new(move || cb(result))
}

pub(crate) enum Waiter {
    Get {
        handle: RequestHandle,
        index: u64,
        encoding: ValueEncoding,
        cb: Callback<Block>,
    },
    Download {
        handle: RequestHandle,
        end: u64,
        cb: Callback<()>,
    },
    Update {
        min_length: u64,
        cb: Callback<()>,
    },
    Seek {
        byte_offset: u64,
        cb: Callback<SeekPosition>,
    },
}

impl Waiter {
    /// The handle that cancels this waiter, for cancellable operations.
    pub(crate) fn handle(&self) -> Option<RequestHandle> {
        match self {
            Waiter::Get { handle, .. } | Waiter::Download { handle, .. } => Some(*handle),
            Waiter::Update { .. } | Waiter::Seek { .. } => None,
        }
    }

    pub(crate) fn fail(self, error: ChainError) -> Settle {
        match self {
            Waiter::Get { cb, .. } => settle(cb, Err(error)),
            Waiter::Download { cb, .. } => settle(cb, Err(error)),
            Waiter::Update { cb, .. } => settle(cb, Err(error)),
            Waiter::Seek { cb, .. } => settle(cb, Err(error)),
        }
    }
}
